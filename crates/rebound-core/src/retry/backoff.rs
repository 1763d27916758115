//! Flat backoff decision function
//!
//! A single-pass variant of the attempt builder with its own defaults: five
//! retries, a random base interval between 300 and 500 ms, and a pure
//! exponential delay without jitter. It adds a `should_not_retry` veto, which
//! the HTTP layer uses for its time budget.

use std::fmt;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::decision::{exceeds_max_time, AbortReason, Decision};
use super::events::{emit, RetryHook};
use super::random::{random_between, RandomSource, ThreadRandom};
use super::resolve::{resolve_number, Floor, ValueOr};
use super::strategies::{exponential_delay, DelayInput};

/// Retries allowed when `max_retries` is not configured
pub const DEFAULT_MAX_RETRIES: i64 = 5;

/// Inclusive range of the random base interval, in milliseconds
pub const DEFAULT_BASE_INTERVAL_RANGE_MS: (i64, i64) = (300, 500);

/// What `count`, `max_retries`, `base_interval` and `max_time` derivations see
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffInput<C, E> {
    pub context: Option<C>,
    pub error: E,
}

/// What `delay` and `max_delay` derivations see
#[derive(Debug, Clone, PartialEq)]
pub struct PartialBackoffScope<C, E> {
    pub context: Option<C>,
    pub error: E,
    /// 1-based retry number
    pub count: i64,
    pub max_retries: i64,
    pub base_interval: i64,
    pub start_time: Option<i64>,
    pub elapsed_time: Option<i64>,
    pub max_time: Option<i64>,
}

/// The fully resolved scope of one backoff decision
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffScope<C, E> {
    pub context: Option<C>,
    pub error: E,
    pub count: i64,
    pub max_retries: i64,
    pub base_interval: i64,
    pub start_time: Option<i64>,
    pub elapsed_time: Option<i64>,
    pub max_time: Option<i64>,
    /// Final delay in milliseconds, capped at `max_delay`
    pub delay: i64,
    pub max_delay: Option<i64>,
}

/// Reusable configuration for [`retry_backoff_decision`]
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::BackoffConfig;
///
/// let config = BackoffConfig::<(), std::io::Error>::new()
///     .with_max_retries(3)
///     .with_base_interval(250)
///     .with_max_delay(2_000);
/// ```
pub struct BackoffConfig<C, E> {
    pub(crate) context: Option<ValueOr<C>>,
    pub(crate) max_retries: Option<ValueOr<f64, BackoffInput<C, E>>>,
    pub(crate) base_interval: Option<ValueOr<f64, BackoffInput<C, E>>>,
    pub(crate) max_time: Option<ValueOr<f64, BackoffInput<C, E>>>,
    pub(crate) delay: Option<ValueOr<f64, PartialBackoffScope<C, E>>>,
    pub(crate) max_delay: Option<ValueOr<f64, PartialBackoffScope<C, E>>>,
    pub(crate) should_retry: Option<ValueOr<bool, BackoffScope<C, E>>>,
    pub(crate) should_not_retry: Option<ValueOr<bool, BackoffScope<C, E>>>,
    pub(crate) tap: Option<RetryHook<BackoffScope<C, E>>>,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<C, E> Default for BackoffConfig<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone, E> Clone for BackoffConfig<C, E> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            max_retries: self.max_retries.clone(),
            base_interval: self.base_interval.clone(),
            max_time: self.max_time.clone(),
            delay: self.delay.clone(),
            max_delay: self.max_delay.clone(),
            should_retry: self.should_retry.clone(),
            should_not_retry: self.should_not_retry.clone(),
            tap: self.tap.clone(),
            random: Arc::clone(&self.random),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C, E> fmt::Debug for BackoffConfig<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffConfig")
            .field("max_retries", &self.max_retries)
            .field("base_interval", &self.base_interval)
            .field("max_time", &self.max_time)
            .field("delay", &self.delay)
            .field("max_delay", &self.max_delay)
            .field("should_retry", &self.should_retry)
            .field("should_not_retry", &self.should_not_retry)
            .finish_non_exhaustive()
    }
}

impl<C, E> BackoffConfig<C, E> {
    /// Create a configuration where every field uses its default
    pub fn new() -> Self {
        Self {
            context: None,
            max_retries: None,
            base_interval: None,
            max_time: None,
            delay: None,
            max_delay: None,
            should_retry: None,
            should_not_retry: None,
            tap: None,
            random: Arc::new(ThreadRandom),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set opaque data passed to every derivation function
    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(ValueOr::value(context));
        self
    }

    /// Set the retry budget; values below one use the default
    pub fn with_max_retries(mut self, max_retries: impl Into<f64>) -> Self {
        self.max_retries = Some(ValueOr::value(max_retries.into()));
        self
    }

    /// Derive the retry budget from the error and context
    pub fn with_max_retries_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&BackoffInput<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.max_retries = Some(ValueOr::derive(f));
        self
    }

    /// Set the base interval in milliseconds; negative values become zero
    pub fn with_base_interval(mut self, base_interval: impl Into<f64>) -> Self {
        self.base_interval = Some(ValueOr::value(base_interval.into()));
        self
    }

    /// Derive the base interval from the error and context
    pub fn with_base_interval_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&BackoffInput<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.base_interval = Some(ValueOr::derive(f));
        self
    }

    /// Set the time budget in milliseconds; negative values unset it
    pub fn with_max_time(mut self, max_time: impl Into<f64>) -> Self {
        self.max_time = Some(ValueOr::value(max_time.into()));
        self
    }

    /// Derive the time budget from the error and context
    pub fn with_max_time_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&BackoffInput<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.max_time = Some(ValueOr::derive(f));
        self
    }

    /// Override the exponential delay; negative values become zero
    pub fn with_delay(mut self, delay: impl Into<f64>) -> Self {
        self.delay = Some(ValueOr::value(delay.into()));
        self
    }

    /// Derive the delay from the partial scope
    pub fn with_delay_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&PartialBackoffScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.delay = Some(ValueOr::derive(f));
        self
    }

    /// Cap the delay at this many milliseconds
    pub fn with_max_delay(mut self, max_delay: impl Into<f64>) -> Self {
        self.max_delay = Some(ValueOr::value(max_delay.into()));
        self
    }

    /// Derive the delay cap from the partial scope
    pub fn with_max_delay_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&PartialBackoffScope<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.max_delay = Some(ValueOr::derive(f));
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
        F: Fn(&BackoffScope<C, E>) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(ValueOr::derive(f));
        self
    }

    /// Veto every retry when `true`
    pub fn with_should_not_retry(mut self, should_not_retry: bool) -> Self {
        self.should_not_retry = Some(ValueOr::value(should_not_retry));
        self
    }

    /// Decide from the full scope whether to veto the retry
    pub fn with_should_not_retry_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&BackoffScope<C, E>) -> bool + Send + Sync + 'static,
    {
        self.should_not_retry = Some(ValueOr::derive(f));
        self
    }

    /// Called with the final scope when the retry goes ahead
    pub fn with_tap<F>(mut self, f: F) -> Self
    where
        F: Fn(&BackoffScope<C, E>) + Send + Sync + 'static,
    {
        self.tap = Some(Arc::new(f));
        self
    }

    /// Replace the random source used for the default base interval
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

    /// The clock used for elapsed time
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// A handle to the clock, for derivations that need the current time
    pub fn shared_clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}

/// Input for one backoff decision
pub struct BackoffAttempt<C, E> {
    error: E,
    count: ValueOr<f64, BackoffInput<C, E>>,
    start_time: Option<i64>,
    config: BackoffConfig<C, E>,
}

impl<C, E> BackoffAttempt<C, E> {
    /// Describe retry number `count` (1-based) after a failure with `error`
    pub fn new(error: E, count: impl Into<f64>) -> Self {
        Self {
            error,
            count: ValueOr::value(count.into()),
            start_time: None,
            config: BackoffConfig::new(),
        }
    }

    /// Derive the retry number from the error and context
    pub fn with_count_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&BackoffInput<C, E>) -> f64 + Send + Sync + 'static,
    {
        self.count = ValueOr::derive(f);
        self
    }

    /// Epoch milliseconds of the first attempt; negative values are ignored
    pub fn with_start_time(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Use the given reusable configuration
    pub fn with_config(mut self, config: BackoffConfig<C, E>) -> Self {
        self.config = config;
        self
    }
}

/// Decide whether to back off and retry
///
/// Returns the scope when the retry goes ahead after `scope.delay`
/// milliseconds, or the original error when it must stop. `tap` fires only
/// when the retry goes ahead.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{retry_backoff_decision, BackoffAttempt, BackoffConfig, FixedRandom};
///
/// let config = BackoffConfig::<(), &str>::new().with_random(FixedRandom(0.0));
///
/// let scope = retry_backoff_decision(BackoffAttempt::new("503", 3).with_config(config.clone()));
/// assert_eq!(scope.unwrap().delay, 1200);
///
/// let error = retry_backoff_decision(BackoffAttempt::new("503", 6).with_config(config));
/// assert_eq!(error.unwrap_err(), "503");
/// ```
pub fn retry_backoff_decision<C: Clone, E>(attempt: BackoffAttempt<C, E>) -> Result<BackoffScope<C, E>, E> {
    match decide_backoff(attempt) {
        Decision::Continue(scope) => Ok(scope),
        Decision::Abort { scope, .. } => Err(scope.error),
    }
}

/// Decide whether to back off and return the decision as data
pub fn decide_backoff<C: Clone, E>(attempt: BackoffAttempt<C, E>) -> Decision<BackoffScope<C, E>> {
    let BackoffAttempt {
        error,
        count,
        start_time,
        config,
    } = attempt;

    let partial = partial_scope(&config, error, &count, start_time);
    let scope = full_scope(&config, partial);

    let should_retry = config
        .should_retry
        .as_ref()
        .map_or(true, |setting| setting.resolve(&scope));
    let should_not_retry = config
        .should_not_retry
        .as_ref()
        .map_or(false, |setting| setting.resolve(&scope));

    match abort_reason(&scope, should_retry, should_not_retry) {
        Some(reason) => {
            tracing::debug!(
                count = scope.count,
                max_retries = scope.max_retries,
                delay_ms = scope.delay,
                reason = %reason,
                "backoff aborted"
            );
            Decision::Abort { scope, reason }
        }
        None => {
            tracing::trace!(
                count = scope.count,
                max_retries = scope.max_retries,
                delay_ms = scope.delay,
                "backoff scheduled"
            );
            emit(config.tap.as_ref(), &scope);
            Decision::Continue(scope)
        }
    }
}

fn partial_scope<C: Clone, E>(
    config: &BackoffConfig<C, E>,
    error: E,
    count: &ValueOr<f64, BackoffInput<C, E>>,
    start_time: Option<i64>,
) -> PartialBackoffScope<C, E> {
    let input = BackoffInput {
        context: config.context.as_ref().map(|context| context.resolve(&())),
        error,
    };

    let count = resolve_number(Some(count), &input, Floor::None).unwrap_or(0);
    let max_retries = resolve_number(config.max_retries.as_ref(), &input, Floor::Unset(1))
        .unwrap_or(DEFAULT_MAX_RETRIES);
    let base_interval = resolve_number(config.base_interval.as_ref(), &input, Floor::Zero)
        .unwrap_or_else(|| {
            let (min, max) = DEFAULT_BASE_INTERVAL_RANGE_MS;
            random_between(min as f64, max as f64, config.random.as_ref())
        });
    let max_time = resolve_number(config.max_time.as_ref(), &input, Floor::Unset(0));
    let start_time = start_time.filter(|start| *start >= 0);

    PartialBackoffScope {
        context: input.context,
        error: input.error,
        count,
        max_retries,
        base_interval,
        start_time,
        elapsed_time: start_time.map(|start| config.clock.now_millis().saturating_sub(start)),
        max_time,
    }
}

fn full_scope<C, E>(config: &BackoffConfig<C, E>, partial: PartialBackoffScope<C, E>) -> BackoffScope<C, E> {
    let raw_delay = resolve_number(config.delay.as_ref(), &partial, Floor::Zero).unwrap_or_else(|| {
        exponential_delay(&DelayInput {
            attempt: partial.count,
            interval: partial.base_interval,
            previous_delay: None,
        })
    });
    let max_delay = resolve_number(config.max_delay.as_ref(), &partial, Floor::Unset(0));
    let delay = max_delay.map_or(raw_delay, |max_delay| raw_delay.min(max_delay));

    BackoffScope {
        context: partial.context,
        error: partial.error,
        count: partial.count,
        max_retries: partial.max_retries,
        base_interval: partial.base_interval,
        start_time: partial.start_time,
        elapsed_time: partial.elapsed_time,
        max_time: partial.max_time,
        delay,
        max_delay,
    }
}

fn abort_reason<C, E>(
    scope: &BackoffScope<C, E>,
    should_retry: bool,
    should_not_retry: bool,
) -> Option<AbortReason> {
    if scope.count < 1 {
        Some(AbortReason::InvalidAttempt)
    } else if scope.count > scope.max_retries {
        Some(AbortReason::Exhausted)
    } else if !should_retry || should_not_retry {
        Some(AbortReason::Vetoed)
    } else if exceeds_max_time(scope.elapsed_time, scope.delay, scope.max_time) {
        Some(AbortReason::TimeBudgetExceeded)
    } else {
        None
    }
}
