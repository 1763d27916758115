//! Async retry drivers
//!
//! Run an operation, and after each failure ask a decision engine whether to
//! retry and how long to wait. The wait is a `tokio` timer, so dropping the
//! returned future cancels any pending retry.

use std::future::Future;
use std::time::Duration;

use super::attempt::{retry_attempt, RetryAttemptConfig, RetryConfig, RetryScope};
use super::backoff::{retry_backoff_decision, BackoffAttempt, BackoffConfig};
use super::http::{HttpFailure, HttpRetryPolicy};

type SuccessHook<C, E, T> = Box<dyn Fn(Option<&RetryScope<C, E>>, &T) + Send + Sync>;

/// Retry an operation using the attempt scope builder
///
/// # Example
///
/// ```rust,no_run
/// use rebound_core::retry::{retry_pattern, RetryConfig, TracingHooks};
///
/// async fn example() {
///     let hooks = TracingHooks::new("fetch");
///     let config = RetryConfig::<(), std::io::Error>::new()
///         .with_max_attempts(5)
///         .with_on_retry(hooks.on_retry());
///
///     let result = retry_pattern(&config, || async {
///         Ok::<_, std::io::Error>("payload")
///     })
///     .await;
/// }
/// ```
pub async fn retry_pattern<C, E, T, F, Fut>(config: &RetryConfig<C, E>, op: F) -> Result<T, E>
where
    C: Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryPattern::new(config.clone()).execute(op).await
}

/// A retry driver built on [`RetryConfig`] with an optional success hook
///
/// The start time is captured once when [`RetryPattern::execute`] begins, and
/// the delay of each retry is passed on to the next decision as its previous
/// delay.
pub struct RetryPattern<C, E, T> {
    config: RetryConfig<C, E>,
    on_success: Option<SuccessHook<C, E, T>>,
}

impl<C: Clone, E, T> RetryPattern<C, E, T> {
    /// Create a driver for the given configuration
    pub fn new(config: RetryConfig<C, E>) -> Self {
        Self {
            config,
            on_success: None,
        }
    }

    /// Called with the scope of the last retry (`None` if the first try
    /// succeeded) and the successful value
    pub fn with_on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&RetryScope<C, E>>, &T) + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Run `op` until it succeeds or the engine gives up
    ///
    /// Returns the operation's value, or its last error untouched.
    pub async fn execute<F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start_time = self.config.clock().now_millis();
        let mut previous_delay: Option<i64> = None;
        let mut last_scope: Option<RetryScope<C, E>> = None;
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => {
                    if let Some(on_success) = &self.on_success {
                        on_success(last_scope.as_ref(), &value);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    attempt = attempt.saturating_add(1);

                    let mut input = RetryAttemptConfig::new(error, attempt)
                        .with_start_time(start_time)
                        .with_config(self.config.clone());
                    if let Some(delay) = previous_delay {
                        input = input.with_previous_delay(delay);
                    }

                    let scope = retry_attempt(input)?;
                    previous_delay = Some(scope.delay);
                    sleep_ms(scope.delay).await;
                    last_scope = Some(scope);
                }
            }
        }
    }
}

/// Retry an operation using the flat backoff decision function
///
/// # Example
///
/// ```rust,no_run
/// use rebound_core::retry::{retry_backoff, BackoffConfig};
///
/// async fn example() {
///     let config = BackoffConfig::<(), std::io::Error>::new().with_max_retries(3);
///
///     let result = retry_backoff(&config, || async {
///         Ok::<_, std::io::Error>(42)
///     })
///     .await;
/// }
/// ```
pub async fn retry_backoff<C, E, T, F, Fut>(config: &BackoffConfig<C, E>, mut op: F) -> Result<T, E>
where
    C: Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start_time = config.clock().now_millis();
    let mut count: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                count = count.saturating_add(1);
                let scope = retry_backoff_decision(
                    BackoffAttempt::new(error, count)
                        .with_start_time(start_time)
                        .with_config(config.clone()),
                )?;
                sleep_ms(scope.delay).await;
            }
        }
    }
}

/// Retry an HTTP request with the default HTTP policy under the caller's settings
///
/// Fields set on `config` win over the policy defaults.
pub async fn retry_http_request<C, E, T, F, Fut>(config: &BackoffConfig<C, E>, op: F) -> Result<T, E>
where
    C: Clone + 'static,
    E: HttpFailure + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let config = HttpRetryPolicy::default().layer(config.clone());
    retry_backoff(&config, op).await
}

async fn sleep_ms(delay: i64) {
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }
}
