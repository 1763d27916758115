//! Attempt scope builder
//!
//! Builds the scope of one failed attempt in three stages. Each stage has its
//! own record type, so a derivation function can only read fields resolved
//! in an earlier stage:
//!
//! 1. [`MinimalScope`]: error, attempt, max attempts, context, previous delay,
//!    start time and elapsed time
//! 2. [`DelayScope`]: adds interval and max time
//! 3. [`RetryScope`]: adds delay, min/max/first delay
//!
//! The decision is taken last, after every field is resolved, so an invalid
//! attempt still runs every derivation function.

use std::fmt;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::decision::{exceeds_max_time, AbortReason, Decision};
use super::events::{emit, RetryHook};
use super::random::{RandomSource, ThreadRandom};
use super::resolve::{resolve_number, Floor, ValueOr};
use super::strategies::{BackoffStrategy, DelayInput};

/// Attempts allowed when `max_attempts` is not configured
pub const DEFAULT_MAX_ATTEMPTS: i64 = 3;

/// Base interval in milliseconds when `interval` is not configured
pub const DEFAULT_INTERVAL_MS: i64 = 500;

/// Fields visible to `interval` and `max_time` derivations
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalScope<C, E> {
    pub error: E,
    pub attempt: i64,
    pub max_attempts: i64,
    pub context: Option<C>,
    pub previous_delay: Option<i64>,
    /// Epoch milliseconds of the first attempt
    pub start_time: Option<i64>,
    /// Milliseconds since `start_time`
    pub elapsed_time: Option<i64>,
}

/// Fields visible to `delay`, `min_delay`, `max_delay` and `first_delay` derivations
#[derive(Debug, Clone, PartialEq)]
pub struct DelayScope<C, E> {
    pub error: E,
    pub attempt: i64,
    pub max_attempts: i64,
    pub context: Option<C>,
    pub previous_delay: Option<i64>,
    pub start_time: Option<i64>,
    pub elapsed_time: Option<i64>,
    pub interval: i64,
    pub max_time: Option<i64>,
}

/// The fully resolved scope of one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct RetryScope<C, E> {
    pub error: E,
    pub attempt: i64,
    pub max_attempts: i64,
    pub context: Option<C>,
    pub previous_delay: Option<i64>,
    pub start_time: Option<i64>,
    pub elapsed_time: Option<i64>,
    pub interval: i64,
    pub max_time: Option<i64>,
    /// Final delay in milliseconds, after min/max/first delay were applied
    pub delay: i64,
    pub min_delay: i64,
    pub max_delay: Option<i64>,
    pub first_delay: Option<i64>,
}

impl<C, E> DelayScope<C, E> {
    fn delay_input(&self) -> DelayInput {
        DelayInput {
            attempt: self.attempt,
            interval: self.interval,
            previous_delay: self.previous_delay,
        }
    }
}

/// Reusable retry configuration
///
/// Every numeric field is either a literal or a derivation of the scope
/// visible at its stage. Unset fields fall back to their defaults.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{BackoffStrategy, RetryConfig};
///
/// let config = RetryConfig::<(), std::io::Error>::new()
///     .with_max_attempts(5)
///     .with_interval(200)
///     .with_strategy(BackoffStrategy::EqualJitter)
///     .with_max_delay_fn(|scope| (scope.interval * 10) as f64)
///     .with_should_retry_fn(|scope| scope.error.kind() != std::io::ErrorKind::NotFound);
/// ```
pub struct RetryConfig<C, E> {
    pub(crate) context: Option<ValueOr<C>>,
    pub(crate) max_attempts: Option<ValueOr<f64>>,
    pub(crate) interval: Option<ValueOr<f64, MinimalScope<C, E>>>,
    pub(crate) max_time: Option<ValueOr<f64, MinimalScope<C, E>>>,
    pub(crate) delay: Option<ValueOr<f64, DelayScope<C, E>>>,
    pub(crate) min_delay: Option<ValueOr<f64, DelayScope<C, E>>>,
    pub(crate) max_delay: Option<ValueOr<f64, DelayScope<C, E>>>,
    pub(crate) first_delay: Option<ValueOr<f64, DelayScope<C, E>>>,
    pub(crate) should_retry: Option<ValueOr<bool, RetryScope<C, E>>>,
    pub(crate) strategy: BackoffStrategy,
    pub(crate) on_retry: Option<RetryHook<RetryScope<C, E>>>,
    pub(crate) on_retry_error: Option<RetryHook<RetryScope<C, E>>>,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<C, E> Default for RetryConfig<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone, E> Clone for RetryConfig<C, E> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            max_attempts: self.max_attempts.clone(),
            interval: self.interval.clone(),
            max_time: self.max_time.clone(),
            delay: self.delay.clone(),
            min_delay: self.min_delay.clone(),
            max_delay: self.max_delay.clone(),
            first_delay: self.first_delay.clone(),
            should_retry: self.should_retry.clone(),
            strategy: self.strategy,
            on_retry: self.on_retry.clone(),
            on_retry_error: self.on_retry_error.clone(),
            random: Arc::clone(&self.random),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C, E> fmt::Debug for RetryConfig<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .field("max_time", &self.max_time)
            .field("delay", &self.delay)
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .field("first_delay", &self.first_delay)
            .field("should_retry", &self.should_retry)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl<C, E> RetryConfig<C, E> {
    /// Create a configuration where every field uses its default
    pub fn new() -> Self {
        Self {
            context: None,
            max_attempts: None,
            interval: None,
            max_time: None,
            delay: None,
            min_delay: None,
            max_delay: None,
            first_delay: None,
            should_retry: None,
            strategy: BackoffStrategy::default(),
            on_retry: None,
            on_retry_error: None,
            random: Arc::new(ThreadRandom),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set opaque data passed to every derivation function
    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(ValueOr::value(context));
        self
    }

    /// Produce the context lazily for each attempt
    pub fn with_context_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.context = Some(ValueOr::derive(move |_: &()| f()));
        self
    }

    /// Set the maximum number of attempts; values below one use the default
    pub fn with_max_attempts(mut self, max_attempts: impl Into<f64>) -> Self {
        self.max_attempts = Some(ValueOr::value(max_attempts.into()));
        self
    }

    /// Compute the maximum number of attempts for each attempt
    pub fn with_max_attempts_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.max_attempts = Some(ValueOr::derive(move |_: &()| f()));
        self
    }

    /// Set the base interval in milliseconds; negative values become zero
    pub fn with_interval(mut self, interval: impl Into<f64>) -> Self {
        self.interval = Some(ValueOr::value(interval.into()));
        self
    }

    /// Derive the base interval from the minimal scope
    pub fn with_interval_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&MinimalScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.interval = Some(ValueOr::derive(f));
        self
    }

    /// Set the time budget in milliseconds; negative values unset it
    pub fn with_max_time(mut self, max_time: impl Into<f64>) -> Self {
        self.max_time = Some(ValueOr::value(max_time.into()));
        self
    }

    /// Derive the time budget from the minimal scope
    pub fn with_max_time_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&MinimalScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.max_time = Some(ValueOr::derive(f));
        self
    }

    /// Override the strategy-computed delay; negative values become zero
    pub fn with_delay(mut self, delay: impl Into<f64>) -> Self {
        self.delay = Some(ValueOr::value(delay.into()));
        self
    }

    /// Derive the delay from the delay scope
    pub fn with_delay_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&DelayScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.delay = Some(ValueOr::derive(f));
        self
    }

    /// Raise the delay to at least this many milliseconds
    pub fn with_min_delay(mut self, min_delay: impl Into<f64>) -> Self {
        self.min_delay = Some(ValueOr::value(min_delay.into()));
        self
    }

    /// Derive the minimum delay from the delay scope
    pub fn with_min_delay_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&DelayScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.min_delay = Some(ValueOr::derive(f));
        self
    }

    /// Cap the delay at this many milliseconds; wins over the minimum
    pub fn with_max_delay(mut self, max_delay: impl Into<f64>) -> Self {
        self.max_delay = Some(ValueOr::value(max_delay.into()));
        self
    }

    /// Derive the maximum delay from the delay scope
    pub fn with_max_delay_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&DelayScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.max_delay = Some(ValueOr::derive(f));
        self
    }

    /// Use this delay for attempt 1, ignoring min and max delay
    pub fn with_first_delay(mut self, first_delay: impl Into<f64>) -> Self {
        self.first_delay = Some(ValueOr::value(first_delay.into()));
        self
    }

    /// Derive the first-attempt delay from the delay scope
    pub fn with_first_delay_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&DelayScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.first_delay = Some(ValueOr::derive(f));
        self
    }

    /// Allow or veto every retry
    pub fn with_should_retry(mut self, should_retry: bool) -> Self {
        self.should_retry = Some(ValueOr::value(should_retry));
        self
    }

    /// Decide from the full scope whether to retry
    pub fn with_should_retry_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryScope<C, E>) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(ValueOr::derive(f));
        self
    }

    /// Set the strategy used when no explicit delay is configured
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Called with the final scope when the attempt will be retried
    pub fn with_on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryScope<C, E>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Called with the final scope when retrying stops
    pub fn with_on_retry_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryScope<C, E>) + Send + Sync + 'static,
    {
        self.on_retry_error = Some(Arc::new(f));
        self
    }

    /// Replace the random source used by jittered strategies
    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Arc::new(random);
        self
    }

    /// Replace the clock used for elapsed time
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the clock with a shared one
    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configured backoff strategy
    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// The clock used for elapsed time
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

/// An error produced eagerly or on demand
enum Deferred<E> {
    Value(E),
    Thunk(Box<dyn FnOnce() -> E + Send>),
}

impl<E> Deferred<E> {
    fn into_value(self) -> E {
        match self {
            Deferred::Value(error) => error,
            Deferred::Thunk(f) => f(),
        }
    }
}

/// Input for one decision: the failed attempt plus the reusable configuration
pub struct RetryAttemptConfig<C, E> {
    error: Deferred<E>,
    attempt: ValueOr<f64>,
    previous_delay: Option<i64>,
    start_time: Option<i64>,
    config: RetryConfig<C, E>,
}

impl<C, E> RetryAttemptConfig<C, E> {
    /// Describe attempt number `attempt` (1-based) that failed with `error`
    pub fn new(error: E, attempt: impl Into<f64>) -> Self {
        Self {
            error: Deferred::Value(error),
            attempt: ValueOr::value(attempt.into()),
            previous_delay: None,
            start_time: None,
            config: RetryConfig::new(),
        }
    }

    /// Like [`RetryAttemptConfig::new`], producing the error only when the scope is built
    pub fn from_fn<F>(error: F, attempt: impl Into<f64>) -> Self
    where
        F: FnOnce() -> E + Send + 'static,
    {
        Self {
            error: Deferred::Thunk(Box::new(error)),
            attempt: ValueOr::value(attempt.into()),
            previous_delay: None,
            start_time: None,
            config: RetryConfig::new(),
        }
    }

    /// Compute the attempt number when the scope is built
    pub fn with_attempt_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.attempt = ValueOr::derive(move |_: &()| f());
        self
    }

    /// Delay used by the previous attempt; negative values are ignored
    pub fn with_previous_delay(mut self, previous_delay: i64) -> Self {
        self.previous_delay = Some(previous_delay);
        self
    }

    /// Epoch milliseconds of the first attempt; negative values are ignored
    pub fn with_start_time(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Use the given reusable configuration
    pub fn with_config(mut self, config: RetryConfig<C, E>) -> Self {
        self.config = config;
        self
    }
}

/// Build the scope for one failed attempt and decide whether to retry
///
/// Returns the scope when the attempt should be retried after `scope.delay`
/// milliseconds, or the original error, untouched, when retrying must stop.
/// `on_retry` or `on_retry_error` fires once before returning.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{retry_attempt, RetryAttemptConfig, RetryConfig};
///
/// let config = RetryConfig::<(), &str>::new().with_max_attempts(2).with_delay(100);
///
/// let scope = retry_attempt(RetryAttemptConfig::new("timeout", 1).with_config(config.clone()));
/// assert_eq!(scope.unwrap().delay, 100);
///
/// let error = retry_attempt(RetryAttemptConfig::new("timeout", 3).with_config(config));
/// assert_eq!(error.unwrap_err(), "timeout");
/// ```
pub fn retry_attempt<C: Clone, E>(config: RetryAttemptConfig<C, E>) -> Result<RetryScope<C, E>, E> {
    match decide_attempt(config) {
        Decision::Continue(scope) => Ok(scope),
        Decision::Abort { scope, .. } => Err(scope.error),
    }
}

/// Build the scope for one failed attempt and return the decision as data
///
/// Fires the same hooks as [`retry_attempt`].
pub fn decide_attempt<C: Clone, E>(input: RetryAttemptConfig<C, E>) -> Decision<RetryScope<C, E>> {
    let RetryAttemptConfig {
        error,
        attempt,
        previous_delay,
        start_time,
        config,
    } = input;

    let minimal = minimal_scope(&config, error, &attempt, previous_delay, start_time);
    let delay_scope = delay_scope(&config, minimal);
    let scope = retry_scope(&config, delay_scope);

    let should_retry = config
        .should_retry
        .as_ref()
        .map_or(true, |setting| setting.resolve(&scope));

    match abort_reason(&scope, should_retry) {
        Some(reason) => {
            tracing::debug!(
                attempt = scope.attempt,
                max_attempts = scope.max_attempts,
                delay_ms = scope.delay,
                reason = %reason,
                "retry aborted"
            );
            emit(config.on_retry_error.as_ref(), &scope);
            Decision::Abort { scope, reason }
        }
        None => {
            tracing::debug!(
                attempt = scope.attempt,
                max_attempts = scope.max_attempts,
                delay_ms = scope.delay,
                "retry scheduled"
            );
            emit(config.on_retry.as_ref(), &scope);
            Decision::Continue(scope)
        }
    }
}

fn minimal_scope<C: Clone, E>(
    config: &RetryConfig<C, E>,
    error: Deferred<E>,
    attempt: &ValueOr<f64>,
    previous_delay: Option<i64>,
    start_time: Option<i64>,
) -> MinimalScope<C, E> {
    let start_time = start_time.filter(|start| *start >= 0);

    MinimalScope {
        error: error.into_value(),
        attempt: resolve_number(Some(attempt), &(), Floor::None).unwrap_or(0),
        max_attempts: resolve_number(config.max_attempts.as_ref(), &(), Floor::Unset(1))
            .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        context: config.context.as_ref().map(|context| context.resolve(&())),
        previous_delay: previous_delay.filter(|delay| *delay >= 0),
        start_time,
        elapsed_time: start_time.map(|start| config.clock.now_millis().saturating_sub(start)),
    }
}

fn delay_scope<C, E>(config: &RetryConfig<C, E>, scope: MinimalScope<C, E>) -> DelayScope<C, E> {
    let interval = resolve_number(config.interval.as_ref(), &scope, Floor::Zero)
        .unwrap_or(DEFAULT_INTERVAL_MS);
    let max_time = resolve_number(config.max_time.as_ref(), &scope, Floor::Unset(0));

    DelayScope {
        error: scope.error,
        attempt: scope.attempt,
        max_attempts: scope.max_attempts,
        context: scope.context,
        previous_delay: scope.previous_delay,
        start_time: scope.start_time,
        elapsed_time: scope.elapsed_time,
        interval,
        max_time,
    }
}

fn retry_scope<C, E>(config: &RetryConfig<C, E>, scope: DelayScope<C, E>) -> RetryScope<C, E> {
    let raw_delay = resolve_number(config.delay.as_ref(), &scope, Floor::Zero).unwrap_or_else(|| {
        config
            .strategy
            .delay(&scope.delay_input(), config.random.as_ref())
    });
    let min_delay = resolve_number(config.min_delay.as_ref(), &scope, Floor::Unset(0)).unwrap_or(0);
    let max_delay = resolve_number(config.max_delay.as_ref(), &scope, Floor::Unset(0));
    let first_delay = resolve_number(config.first_delay.as_ref(), &scope, Floor::Unset(0));

    let mut delay = raw_delay.max(min_delay);
    if let Some(max_delay) = max_delay {
        delay = delay.min(max_delay);
    }
    if let (Some(first_delay), 1) = (first_delay, scope.attempt) {
        delay = first_delay;
    }

    RetryScope {
        error: scope.error,
        attempt: scope.attempt,
        max_attempts: scope.max_attempts,
        context: scope.context,
        previous_delay: scope.previous_delay,
        start_time: scope.start_time,
        elapsed_time: scope.elapsed_time,
        interval: scope.interval,
        max_time: scope.max_time,
        delay,
        min_delay,
        max_delay,
        first_delay,
    }
}

fn abort_reason<C, E>(scope: &RetryScope<C, E>, should_retry: bool) -> Option<AbortReason> {
    if scope.attempt < 1 {
        Some(AbortReason::InvalidAttempt)
    } else if scope.attempt > scope.max_attempts {
        Some(AbortReason::Exhausted)
    } else if !should_retry {
        Some(AbortReason::Vetoed)
    } else if exceeds_max_time(scope.elapsed_time, scope.delay, scope.max_time) {
        Some(AbortReason::TimeBudgetExceeded)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::clock::FixedClock;
    use crate::retry::random::FixedRandom;

    fn config() -> RetryConfig<(), &'static str> {
        RetryConfig::new()
            .with_random(FixedRandom(0.0))
            .with_clock(FixedClock(10_000))
    }

    fn attempt(n: i64) -> RetryAttemptConfig<(), &'static str> {
        RetryAttemptConfig::new("error", n as f64).with_config(config())
    }

    #[test]
    fn test_default_scope() {
        let scope = retry_attempt(attempt(1)).unwrap();
        assert_eq!(
            scope,
            RetryScope {
                error: "error",
                attempt: 1,
                max_attempts: 3,
                context: None,
                previous_delay: None,
                start_time: None,
                elapsed_time: None,
                interval: 500,
                max_time: None,
                delay: 0,
                min_delay: 0,
                max_delay: None,
                first_delay: None,
            }
        );
    }

    #[test]
    fn test_attempt_is_rounded() {
        let scope = retry_attempt(RetryAttemptConfig::new("error", 1.6).with_config(config())).unwrap();
        assert_eq!(scope.attempt, 2);
    }

    #[test]
    fn test_attempt_fn() {
        let scope = retry_attempt(attempt(1).with_attempt_fn(|| 3.0)).unwrap();
        assert_eq!(scope.attempt, 3);
    }

    #[test]
    fn test_attempt_over_max_aborts() {
        assert_eq!(retry_attempt(attempt(4)).unwrap_err(), "error");
        let decision = decide_attempt(attempt(4));
        assert_eq!(decision.abort_reason(), Some(AbortReason::Exhausted));
    }

    #[test]
    fn test_attempt_below_one_aborts() {
        assert_eq!(retry_attempt(attempt(0)).unwrap_err(), "error");
        assert_eq!(retry_attempt(attempt(-1)).unwrap_err(), "error");
        let decision = decide_attempt(attempt(0));
        assert_eq!(decision.abort_reason(), Some(AbortReason::InvalidAttempt));
    }

    #[test]
    fn test_invalid_attempt_still_resolves_every_field() {
        let decision = decide_attempt(
            RetryAttemptConfig::new("error", 0)
                .with_config(config().with_interval_fn(|scope| (scope.attempt + 100) as f64)),
        );
        let scope = decision.scope();
        assert_eq!(scope.interval, 100);
        assert!(!decision.is_continue());
    }

    #[test]
    fn test_error_thunk() {
        let scope = retry_attempt(
            RetryAttemptConfig::from_fn(|| "lazy", 1).with_config(config()),
        )
        .unwrap();
        assert_eq!(scope.error, "lazy");
    }

    #[test]
    fn test_max_attempts_below_one_uses_default() {
        let scope = retry_attempt(attempt(3).with_config(config().with_max_attempts(0))).unwrap();
        assert_eq!(scope.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_max_attempts_fn() {
        let scope = retry_attempt(attempt(5).with_config(config().with_max_attempts_fn(|| 5.4))).unwrap();
        assert_eq!(scope.max_attempts, 5);
    }

    #[test]
    fn test_context_passthrough() {
        let config = RetryConfig::<&'static str, &'static str>::new()
            .with_random(FixedRandom(0.0))
            .with_context("ctx")
            .with_interval_fn(|scope| if scope.context == Some("ctx") { 10.0 } else { 0.0 });
        let scope = retry_attempt(RetryAttemptConfig::new("error", 1).with_config(config)).unwrap();
        assert_eq!(scope.context, Some("ctx"));
        assert_eq!(scope.interval, 10);
    }

    #[test]
    fn test_negative_previous_delay_and_start_time_are_ignored() {
        let scope = retry_attempt(attempt(1).with_previous_delay(-1).with_start_time(-1)).unwrap();
        assert_eq!(scope.previous_delay, None);
        assert_eq!(scope.start_time, None);
        assert_eq!(scope.elapsed_time, None);
    }

    #[test]
    fn test_elapsed_time_from_start_time() {
        let scope = retry_attempt(attempt(1).with_start_time(9_000)).unwrap();
        assert_eq!(scope.start_time, Some(9_000));
        assert_eq!(scope.elapsed_time, Some(1_000));
    }

    #[test]
    fn test_negative_interval_is_zero() {
        let scope = retry_attempt(attempt(1).with_config(config().with_interval(-5))).unwrap();
        assert_eq!(scope.interval, 0);
    }

    #[test]
    fn test_negative_max_time_is_unset() {
        let scope = retry_attempt(attempt(1).with_config(config().with_max_time(-5))).unwrap();
        assert_eq!(scope.max_time, None);
    }

    #[test]
    fn test_negative_delay_is_zero() {
        let scope = retry_attempt(attempt(1).with_config(config().with_delay(-5))).unwrap();
        assert_eq!(scope.delay, 0);
    }

    #[test]
    fn test_negative_min_max_first_delay() {
        let scope = retry_attempt(
            attempt(1).with_config(
                config()
                    .with_delay(10)
                    .with_min_delay(-1)
                    .with_max_delay(-1)
                    .with_first_delay(-1),
            ),
        )
        .unwrap();
        assert_eq!(scope.min_delay, 0);
        assert_eq!(scope.max_delay, None);
        assert_eq!(scope.first_delay, None);
        assert_eq!(scope.delay, 10);
    }

    #[test]
    fn test_delay_raised_to_min_delay() {
        let scope = retry_attempt(attempt(2).with_config(config().with_delay(1).with_min_delay(50))).unwrap();
        assert_eq!(scope.delay, 50);
    }

    #[test]
    fn test_delay_precedence() {
        let precedence = config()
            .with_first_delay(1)
            .with_min_delay(5)
            .with_max_delay(3)
            .with_delay(10);

        let first = retry_attempt(attempt(1).with_config(precedence.clone())).unwrap();
        assert_eq!(first.delay, 1);

        let second = retry_attempt(attempt(2).with_config(precedence)).unwrap();
        assert_eq!(second.delay, 3);
    }

    #[test]
    fn test_delay_fn_sees_delay_scope() {
        let scope = retry_attempt(
            attempt(2).with_config(
                config()
                    .with_interval(40)
                    .with_delay_fn(|scope| (scope.interval * scope.attempt) as f64),
            ),
        )
        .unwrap();
        assert_eq!(scope.delay, 80);
    }

    #[test]
    fn test_should_retry_false_aborts() {
        let decision = decide_attempt(attempt(1).with_config(config().with_should_retry(false)));
        assert_eq!(decision.abort_reason(), Some(AbortReason::Vetoed));
    }

    #[test]
    fn test_should_retry_fn_sees_full_scope() {
        let config = config().with_delay(100).with_should_retry_fn(|scope| scope.delay < 100);
        assert_eq!(retry_attempt(attempt(1).with_config(config)).unwrap_err(), "error");
    }

    #[test]
    fn test_elapsed_time_exceeding_max_time_aborts() {
        let decision = decide_attempt(
            attempt(1)
                .with_start_time(9_999)
                .with_config(config().with_delay(1).with_max_time(1)),
        );
        assert_eq!(decision.abort_reason(), Some(AbortReason::TimeBudgetExceeded));
    }

    #[test]
    fn test_elapsed_time_within_max_time_continues() {
        let decision = decide_attempt(
            attempt(1)
                .with_start_time(10_000)
                .with_config(config().with_delay(1).with_max_time(1)),
        );
        assert!(decision.is_continue());
    }

    #[test]
    fn test_strategy_is_used_for_default_delay() {
        let scope = retry_attempt(
            attempt(3).with_config(config().with_strategy(BackoffStrategy::Exponential)),
        )
        .unwrap();
        assert_eq!(scope.delay, 2_000);
    }

    #[test]
    fn test_config_debug_hides_functions() {
        let rendered = format!("{:?}", config().with_delay_fn(|_| 1.0));
        assert!(rendered.contains("Derive(..)"));
    }
}
