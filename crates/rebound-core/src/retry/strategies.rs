//! Backoff delay strategies
//!
//! Each strategy maps an attempt number, a base interval and the previous
//! delay to a non-negative delay in milliseconds. Jittered strategies draw
//! from a [`RandomSource`], so a fixed source makes every strategy
//! deterministic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::random::{random_between, RandomSource};
use super::resolve::round_half_up;

/// Inputs shared by every strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayInput {
    /// 1-based attempt number
    pub attempt: i64,
    /// Base interval in milliseconds
    pub interval: i64,
    /// Delay used by the previous attempt, if any
    pub previous_delay: Option<i64>,
}

/// Constant delay: `interval`
pub fn interval_delay(input: &DelayInput) -> i64 {
    input.interval.max(0)
}

/// Linear growth: `interval * attempt`
pub fn incremental_delay(input: &DelayInput) -> i64 {
    input.interval.saturating_mul(input.attempt).max(0)
}

/// Doubling growth: `interval * 2^(attempt - 1)`
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{exponential_delay, DelayInput};
///
/// let input = DelayInput { attempt: 3, interval: 100, previous_delay: None };
/// assert_eq!(exponential_delay(&input), 400);
/// ```
pub fn exponential_delay(input: &DelayInput) -> i64 {
    let exponent = input
        .attempt
        .saturating_sub(1)
        .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    round_half_up(input.interval as f64 * 2f64.powi(exponent)).max(0)
}

/// Uniform in `[0, exponential]`
pub fn full_jitter_delay(input: &DelayInput, random: &dyn RandomSource) -> i64 {
    random_between(0.0, exponential_delay(input) as f64, random)
}

/// Half of the exponential delay plus a uniform share of the other half
pub fn equal_jitter_delay(input: &DelayInput, random: &dyn RandomSource) -> i64 {
    let half = round_half_up(exponential_delay(input) as f64 / 2.0);
    half.saturating_add(random_between(0.0, half as f64, random))
}

/// Uniform in `[interval, previous_delay * 3]`, full jitter on the first attempt
pub fn decorrelated_jitter_delay(input: &DelayInput, random: &dyn RandomSource) -> i64 {
    match input.previous_delay {
        Some(previous) => random_between(
            input.interval as f64,
            previous.saturating_mul(3) as f64,
            random,
        )
        .max(0),
        None => full_jitter_delay(input, random),
    }
}

/// Named backoff strategy, selectable from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffStrategy {
    /// Constant delay
    Interval,
    /// Linear growth
    Incremental,
    /// Doubling growth without jitter
    Exponential,
    /// Uniform in `[0, exponential]`
    #[default]
    FullJitter,
    /// Half exponential plus jitter on the other half
    EqualJitter,
    /// Uniform between the interval and three times the previous delay
    DecorrelatedJitter,
}

impl BackoffStrategy {
    /// All strategies, in declaration order
    pub const ALL: [BackoffStrategy; 6] = [
        BackoffStrategy::Interval,
        BackoffStrategy::Incremental,
        BackoffStrategy::Exponential,
        BackoffStrategy::FullJitter,
        BackoffStrategy::EqualJitter,
        BackoffStrategy::DecorrelatedJitter,
    ];

    /// Compute the delay for the given inputs
    pub fn delay(self, input: &DelayInput, random: &dyn RandomSource) -> i64 {
        match self {
            BackoffStrategy::Interval => interval_delay(input),
            BackoffStrategy::Incremental => incremental_delay(input),
            BackoffStrategy::Exponential => exponential_delay(input),
            BackoffStrategy::FullJitter => full_jitter_delay(input, random),
            BackoffStrategy::EqualJitter => equal_jitter_delay(input, random),
            BackoffStrategy::DecorrelatedJitter => decorrelated_jitter_delay(input, random),
        }
    }

    /// The settings name of this strategy
    pub fn as_str(self) -> &'static str {
        match self {
            BackoffStrategy::Interval => "interval",
            BackoffStrategy::Incremental => "incremental",
            BackoffStrategy::Exponential => "exponential",
            BackoffStrategy::FullJitter => "full-jitter",
            BackoffStrategy::EqualJitter => "equal-jitter",
            BackoffStrategy::DecorrelatedJitter => "decorrelated-jitter",
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackoffStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        BackoffStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| {
                crate::Error::invalid_config(format!(
                    "unknown backoff strategy '{}' (expected one of: {})",
                    s,
                    BackoffStrategy::ALL.map(BackoffStrategy::as_str).join(", ")
                ))
            })
    }
}
