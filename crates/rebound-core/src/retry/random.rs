//! Random sources for jittered delays
//!
//! Every jittered strategy draws from a [`RandomSource`] so that tests can pin
//! the sequence of values and get reproducible delays.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Largest `f64` strictly below one.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON;

/// A generator of values in `[0, 1)`
pub trait RandomSource: Send + Sync {
    /// Return the next value in `[0, 1)`
    fn next_f64(&self) -> f64;
}

/// Thread-local RNG from the `rand` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Always returns the same value, clamped into `[0, 1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        clamp_unit(self.0)
    }
}

/// Replays a list of values, wrapping around at the end
///
/// An empty list behaves like `FixedRandom(0.0)`.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    values: Vec<f64>,
    next: AtomicUsize,
}

impl SequenceRandom {
    /// Create a source replaying `values` in order
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            next: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.values.len();
        clamp_unit(self.values[index])
    }
}

impl<T: RandomSource + ?Sized> RandomSource for std::sync::Arc<T> {
    fn next_f64(&self) -> f64 {
        (**self).next_f64()
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, BELOW_ONE)
}

/// Random integer between `min` and `max`, both inclusive
///
/// `min` is rounded down and `max` rounded up. If `max < min` the result is
/// `floor(min)`.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{random_between, FixedRandom};
///
/// assert_eq!(random_between(300.0, 500.0, &FixedRandom(0.0)), 300);
/// assert_eq!(random_between(300.0, 500.0, &FixedRandom(0.9999)), 500);
/// assert_eq!(random_between(500.0, 300.0, &FixedRandom(0.5)), 500);
/// ```
pub fn random_between(min: f64, max: f64, random: &dyn RandomSource) -> i64 {
    let floor_min = min.floor();
    let ceil_max = max.ceil();

    if ceil_max < floor_min {
        return floor_min as i64;
    }

    ((random.next_f64() * (ceil_max - floor_min + 1.0)).floor() + floor_min) as i64
}
