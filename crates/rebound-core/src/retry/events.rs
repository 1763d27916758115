//! Decision hooks and tracing-backed hook implementations
//!
//! Hooks are plain callbacks invoked synchronously with the final scope,
//! exactly once per decision. They observe decisions but never change them.

use std::fmt::Display;
use std::sync::Arc;

use super::attempt::RetryScope;
use super::backoff::BackoffScope;

/// A callback receiving the final scope of a decision
pub type RetryHook<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Wrap a closure as a [`RetryHook`]
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{emit, hook, RetryHook};
///
/// let on_delay: RetryHook<i64> = hook(|delay: &i64| println!("retrying in {delay}ms"));
/// emit(Some(&on_delay), &250);
/// ```
pub fn hook<S, F>(f: F) -> RetryHook<S>
where
    F: Fn(&S) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Invoke the hook, if one is configured
pub fn emit<S>(hook: Option<&RetryHook<S>>, scope: &S) {
    if let Some(hook) = hook {
        hook(scope);
    }
}

/// Hooks that log decisions using the `tracing` crate
///
/// # Log Levels
///
/// - `on_retry`: WARN
/// - `on_retry_error`: ERROR
/// - `tap`: DEBUG
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{RetryConfig, TracingHooks};
///
/// let hooks = TracingHooks::new("download");
/// let config = RetryConfig::<(), std::io::Error>::new()
///     .with_on_retry(hooks.on_retry())
///     .with_on_retry_error(hooks.on_retry_error());
/// ```
#[derive(Debug, Clone)]
pub struct TracingHooks {
    /// Name of the operation being retried (for log context)
    operation: Arc<str>,
}

impl TracingHooks {
    /// Create hooks tagged with an operation name
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Arc::from(operation.into()),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Hook for decisions that will retry
    pub fn on_retry<C, E>(&self) -> impl Fn(&RetryScope<C, E>) + Send + Sync + 'static
    where
        C: 'static,
        E: Display + 'static,
    {
        let operation = Arc::clone(&self.operation);
        move |scope: &RetryScope<C, E>| {
            tracing::warn!(
                operation = %operation,
                attempt = scope.attempt,
                max_attempts = scope.max_attempts,
                delay_ms = scope.delay,
                error = %scope.error,
                "attempt failed, will retry"
            );
        }
    }

    /// Hook for decisions that give up
    pub fn on_retry_error<C, E>(&self) -> impl Fn(&RetryScope<C, E>) + Send + Sync + 'static
    where
        C: 'static,
        E: Display + 'static,
    {
        let operation = Arc::clone(&self.operation);
        move |scope: &RetryScope<C, E>| {
            tracing::error!(
                operation = %operation,
                attempt = scope.attempt,
                max_attempts = scope.max_attempts,
                elapsed_ms = ?scope.elapsed_time,
                error = %scope.error,
                "giving up on retries"
            );
        }
    }

    /// Hook for backoff decisions that will retry
    pub fn tap<C, E>(&self) -> impl Fn(&BackoffScope<C, E>) + Send + Sync + 'static
    where
        C: 'static,
        E: Display + 'static,
    {
        let operation = Arc::clone(&self.operation);
        move |scope: &BackoffScope<C, E>| {
            tracing::debug!(
                operation = %operation,
                count = scope.count,
                max_retries = scope.max_retries,
                base_interval_ms = scope.base_interval,
                delay_ms = scope.delay,
                error = %scope.error,
                "backing off"
            );
        }
    }
}

impl Default for TracingHooks {
    fn default() -> Self {
        Self::new("retry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_emit_invokes_hook_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let on_event: RetryHook<i64> = hook(move |value: &i64| {
            counter.fetch_add(*value as u32, Ordering::SeqCst);
        });

        emit(Some(&on_event), &1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_without_hook_is_noop() {
        emit::<i64>(None, &1);
    }

    #[test]
    fn test_tracing_hooks_operation() {
        assert_eq!(TracingHooks::new("download").operation(), "download");
        assert_eq!(TracingHooks::default().operation(), "retry");
    }

    #[test]
    fn test_tracing_hooks_can_be_called() {
        let hooks = TracingHooks::new("test");
        let scope = RetryScope {
            error: "boom",
            attempt: 1,
            max_attempts: 3,
            context: None::<()>,
            previous_delay: None,
            start_time: None,
            elapsed_time: None,
            interval: 500,
            max_time: None,
            delay: 250,
            min_delay: 0,
            max_delay: None,
            first_delay: None,
        };
        let on_retry = hooks.on_retry::<(), &'static str>();
        let on_retry_error = hooks.on_retry_error::<(), &'static str>();
        on_retry(&scope);
        on_retry_error(&scope);
    }
}
