//! Retry decision engine
//!
//! This module decides, for a single failed attempt, whether the operation
//! should be retried and after how long. Nothing in here sleeps or performs
//! I/O except the async drivers in [`driver`].
//!
//! # Features
//!
//! - Value-or-derivation configuration fields resolved in three stages
//!   (minimal, delay, full) so each derivation only sees earlier results
//! - Interchangeable backoff strategies with an injectable random source
//! - Two engines: [`retry_attempt`] (attempt scope builder) and
//!   [`retry_backoff_decision`] (flat backoff decision used for HTTP)
//! - Aborted decisions hand back the caller's original error, untouched
//! - Optional hooks fired once per decision, plus `tracing` events
//!
//! # Example
//!
//! ```rust
//! use rebound_core::retry::{retry_attempt, FixedRandom, RetryAttemptConfig, RetryConfig};
//!
//! let config = RetryConfig::<(), std::io::Error>::new()
//!     .with_max_attempts(3)
//!     .with_random(FixedRandom(0.0));
//!
//! let scope = retry_attempt(
//!     RetryAttemptConfig::new(std::io::Error::other("boom"), 2).with_config(config),
//! )
//! .unwrap();
//! assert_eq!(scope.attempt, 2);
//! assert_eq!(scope.interval, 500);
//! ```

mod attempt;
mod backoff;
mod clock;
mod decision;
mod driver;
mod events;
mod headers;
mod http;
mod random;
mod resolve;
mod strategies;

pub use attempt::{
    decide_attempt, retry_attempt, DelayScope, MinimalScope, RetryAttemptConfig, RetryConfig,
    RetryScope, DEFAULT_INTERVAL_MS, DEFAULT_MAX_ATTEMPTS,
};
pub use backoff::{
    decide_backoff, retry_backoff_decision, BackoffAttempt, BackoffConfig, BackoffInput,
    BackoffScope, PartialBackoffScope, DEFAULT_BASE_INTERVAL_RANGE_MS, DEFAULT_MAX_RETRIES,
};
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use decision::{AbortReason, Decision};
pub use driver::{retry_backoff, retry_http_request, retry_pattern, RetryPattern};
pub use events::{emit, hook, RetryHook, TracingHooks};
pub use headers::{
    parse_keep_alive_timeout, parse_key_values, parse_retry_after, DAY_AS_MILLISECOND,
    HOUR_AS_MILLISECOND, MINUTE_AS_MILLISECOND, SECOND_AS_MILLISECOND,
};
pub use http::{
    http_delay, http_should_not_retry, http_should_retry, HttpFailure, HttpRetryPolicy,
    DEFAULT_MAX_OPERATION_TIME_MS, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_HTTP_CODES,
    DEFAULT_RETRY_METHODS,
};
pub use random::{random_between, FixedRandom, RandomSource, SequenceRandom, ThreadRandom};
pub use resolve::{resolve_number, round_half_up, Floor, ValueOr};
pub use strategies::{
    decorrelated_jitter_delay, equal_jitter_delay, exponential_delay, full_jitter_delay,
    incremental_delay, interval_delay, BackoffStrategy, DelayInput,
};

#[cfg(test)]
mod tests;
