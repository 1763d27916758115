//! Value-or-derivation configuration fields
//!
//! Every configurable quantity is either a literal or a function of the scope
//! visible at the stage where the field is resolved. Numeric results are
//! rounded half-up and then checked against a [`Floor`] policy.

use std::fmt;
use std::sync::Arc;

/// A configuration entry: a literal value or a derivation of scope `S`.
///
/// Fields resolved before any scope exists use `S = ()`.
pub enum ValueOr<T, S = ()> {
    /// A literal value
    Value(T),
    /// A function of the scope visible at the field's stage
    Derive(Arc<dyn Fn(&S) -> T + Send + Sync>),
}

impl<T, S> ValueOr<T, S> {
    /// Wrap a literal value
    pub fn value(value: T) -> Self {
        ValueOr::Value(value)
    }

    /// Wrap a derivation function
    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        ValueOr::Derive(Arc::new(f))
    }

    /// Resolve against the given scope
    pub fn resolve(&self, scope: &S) -> T
    where
        T: Clone,
    {
        match self {
            ValueOr::Value(value) => value.clone(),
            ValueOr::Derive(f) => f(scope),
        }
    }

    /// Whether this entry is a derivation function
    pub fn is_derived(&self) -> bool {
        matches!(self, ValueOr::Derive(_))
    }
}

impl<T: Clone, S> Clone for ValueOr<T, S> {
    fn clone(&self) -> Self {
        match self {
            ValueOr::Value(value) => ValueOr::Value(value.clone()),
            ValueOr::Derive(f) => ValueOr::Derive(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug, S> fmt::Debug for ValueOr<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOr::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ValueOr::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

impl<T, S> From<T> for ValueOr<T, S> {
    fn from(value: T) -> Self {
        ValueOr::Value(value)
    }
}

/// What happens to a rounded number that falls below a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Floor {
    /// Keep the rounded value as is
    None,
    /// Values below zero become zero
    Zero,
    /// Values below the threshold become unset, so the caller applies its default
    Unset(i64),
}

/// Round to the nearest integer, halves towards positive infinity
///
/// `1.5` rounds to `2` and `-1.5` rounds to `-1`. Out-of-range values saturate.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Resolve a numeric entry, round it and apply the floor policy
///
/// Returns `None` when the entry is not configured, resolves to a non-finite
/// number, or falls under a [`Floor::Unset`] threshold.
pub fn resolve_number<S>(setting: Option<&ValueOr<f64, S>>, scope: &S, floor: Floor) -> Option<i64> {
    let raw = setting?.resolve(scope);
    if !raw.is_finite() {
        return None;
    }

    let rounded = round_half_up(raw);
    match floor {
        Floor::None => Some(rounded),
        Floor::Zero => Some(rounded.max(0)),
        Floor::Unset(min) if rounded < min => None,
        Floor::Unset(_) => Some(rounded),
    }
}
