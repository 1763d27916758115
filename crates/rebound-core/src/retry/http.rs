//! HTTP retry defaults
//!
//! Retry a failed request up to three times with an exponential delay, as
//! long as the failure is a network error or one of the retryable status
//! codes. A `Retry-After` header replaces the computed delay, and the whole
//! sequence must finish within the `Keep-Alive` timeout or 100 seconds,
//! whichever is lower.

use serde::{Deserialize, Serialize};

use super::backoff::{BackoffConfig, BackoffScope, PartialBackoffScope};
use super::clock::Clock;
use super::headers::{parse_keep_alive_timeout, parse_retry_after, SECOND_AS_MILLISECOND};
use super::resolve::ValueOr;
use super::strategies::{exponential_delay, DelayInput};

/// Retries allowed for an HTTP request
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Status codes worth retrying
pub const DEFAULT_RETRY_HTTP_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Methods retried by default
pub const DEFAULT_RETRY_METHODS: [&str; 1] = ["GET"];

/// Upper bound on the total time spent retrying one request
pub const DEFAULT_MAX_OPERATION_TIME_MS: i64 = 100 * SECOND_AS_MILLISECOND;

/// A failed HTTP exchange
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::HttpFailure;
///
/// struct Response {
///     status: u16,
///     retry_after: Option<String>,
/// }
///
/// impl HttpFailure for Response {
///     fn status(&self) -> u16 {
///         self.status
///     }
///
///     fn header(&self, name: &str) -> Option<&str> {
///         if name.eq_ignore_ascii_case("retry-after") {
///             self.retry_after.as_deref()
///         } else {
///             None
///         }
///     }
/// }
/// ```
pub trait HttpFailure {
    /// Response status code, `0` when no response was received
    fn status(&self) -> u16;

    /// Raw value of a response header
    fn header(&self, name: &str) -> Option<&str>;

    /// Whether the request failed before a response arrived
    fn is_network_error(&self) -> bool {
        self.status() == 0
    }
}

/// Whether the failure is a network error or has a retryable status
pub fn http_should_retry<E: HttpFailure + ?Sized>(error: &E) -> bool {
    error.is_network_error() || DEFAULT_RETRY_HTTP_CODES.contains(&error.status())
}

/// The `Retry-After` delay if present, otherwise `base_interval * 2^(count - 1)`
pub fn http_delay<C, E: HttpFailure>(scope: &PartialBackoffScope<C, E>, clock: &dyn Clock) -> i64 {
    parse_retry_after(scope.error.header("Retry-After"), clock.now_millis()).unwrap_or_else(|| {
        exponential_delay(&DelayInput {
            attempt: scope.count,
            interval: scope.base_interval,
            previous_delay: None,
        })
    })
}

/// Whether the next retry would end after the operation time budget
///
/// The budget is the `Keep-Alive` timeout or `max_operation_time_ms`,
/// whichever is lower. Without a start time the elapsed time counts as zero.
pub fn http_should_not_retry<C, E: HttpFailure>(scope: &BackoffScope<C, E>, max_operation_time_ms: i64) -> bool {
    let keep_alive = parse_keep_alive_timeout(scope.error.header("Keep-Alive"));
    let max_total = max_total_time(keep_alive, max_operation_time_ms);
    scope.elapsed_time.unwrap_or(0).saturating_add(scope.delay) > max_total
}

fn max_total_time(keep_alive: Option<i64>, max_operation_time_ms: i64) -> i64 {
    keep_alive.map_or(max_operation_time_ms, |timeout| timeout.min(max_operation_time_ms))
}

/// HTTP retry policy, loadable from settings
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::HttpRetryPolicy;
///
/// let policy = HttpRetryPolicy::default();
/// assert!(policy.allows_method("get"));
/// assert!(!policy.allows_method("POST"));
/// assert_eq!(policy.max_total_time(Some(5_000)), 5_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpRetryPolicy {
    /// Methods that may be retried
    pub methods: Vec<String>,

    /// Status codes that may be retried
    pub status_codes: Vec<u16>,

    /// Retries allowed per request
    pub max_retries: u32,

    /// Upper bound on the total retry time in milliseconds
    pub max_operation_time_ms: i64,
}

impl Default for HttpRetryPolicy {
    fn default() -> Self {
        Self {
            methods: DEFAULT_RETRY_METHODS.iter().map(|m| m.to_string()).collect(),
            status_codes: DEFAULT_RETRY_HTTP_CODES.to_vec(),
            max_retries: DEFAULT_RETRY_COUNT,
            max_operation_time_ms: DEFAULT_MAX_OPERATION_TIME_MS,
        }
    }
}

impl HttpRetryPolicy {
    /// Whether the failure is a network error or has one of this policy's status codes
    pub fn should_retry<E: HttpFailure + ?Sized>(&self, error: &E) -> bool {
        error.is_network_error() || self.status_codes.contains(&error.status())
    }

    /// Whether requests with this method may be retried
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.iter().any(|allowed| allowed.eq_ignore_ascii_case(method))
    }

    /// Total time budget given an optional `Keep-Alive` timeout
    pub fn max_total_time(&self, keep_alive: Option<i64>) -> i64 {
        max_total_time(keep_alive, self.max_operation_time_ms)
    }

    /// A backoff configuration with this policy's defaults
    pub fn backoff_config<C, E>(&self) -> BackoffConfig<C, E>
    where
        C: 'static,
        E: HttpFailure + 'static,
    {
        self.layer(BackoffConfig::new())
    }

    /// Fill every field the caller left unset with this policy's defaults
    ///
    /// Sets `max_retries`, `delay`, `should_retry` and `should_not_retry`.
    pub fn layer<C, E>(&self, mut config: BackoffConfig<C, E>) -> BackoffConfig<C, E>
    where
        C: 'static,
        E: HttpFailure + 'static,
    {
        if config.max_retries.is_none() {
            config.max_retries = Some(ValueOr::value(f64::from(self.max_retries)));
        }

        if config.delay.is_none() {
            let clock = config.shared_clock();
            config.delay = Some(ValueOr::derive(move |scope: &PartialBackoffScope<C, E>| {
                http_delay(scope, clock.as_ref()) as f64
            }));
        }

        if config.should_retry.is_none() {
            let policy = self.clone();
            config.should_retry = Some(ValueOr::derive(move |scope: &BackoffScope<C, E>| {
                policy.should_retry(&scope.error)
            }));
        }

        if config.should_not_retry.is_none() {
            let max_operation_time_ms = self.max_operation_time_ms;
            config.should_not_retry = Some(ValueOr::derive(move |scope: &BackoffScope<C, E>| {
                http_should_not_retry(scope, max_operation_time_ms)
            }));
        }

        config
    }

    /// Like [`HttpRetryPolicy::layer`], and never retry methods outside the allow-list
    pub fn layer_for_method<C, E>(&self, config: BackoffConfig<C, E>, method: &str) -> BackoffConfig<C, E>
    where
        C: 'static,
        E: HttpFailure + 'static,
    {
        let mut config = self.layer(config);
        if !self.allows_method(method) {
            tracing::debug!(method = %method, "method not retryable");
            config.should_retry = Some(ValueOr::value(false));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::backoff::{decide_backoff, retry_backoff_decision, BackoffAttempt};
    use crate::retry::clock::FixedClock;
    use crate::retry::decision::AbortReason;
    use crate::retry::random::FixedRandom;

    // Sun, 1 Jan 2023 12:00:00 GMT
    const NOW: i64 = 1_672_574_400_000;

    #[derive(Debug, Clone, PartialEq)]
    struct Failure {
        status: u16,
        retry_after: Option<&'static str>,
        keep_alive: Option<&'static str>,
    }

    impl Failure {
        fn with_status(status: u16) -> Self {
            Self {
                status,
                retry_after: None,
                keep_alive: None,
            }
        }
    }

    impl HttpFailure for Failure {
        fn status(&self) -> u16 {
            self.status
        }

        fn header(&self, name: &str) -> Option<&str> {
            match name {
                "Retry-After" => self.retry_after,
                "Keep-Alive" => self.keep_alive,
                _ => None,
            }
        }
    }

    fn config() -> BackoffConfig<(), Failure> {
        HttpRetryPolicy::default().layer(
            BackoffConfig::new()
                .with_random(FixedRandom(0.0))
                .with_clock(FixedClock(NOW)),
        )
    }

    #[test]
    fn test_http_should_retry_codes() {
        for code in DEFAULT_RETRY_HTTP_CODES {
            assert!(http_should_retry(&Failure::with_status(code)));
        }
        assert!(!http_should_retry(&Failure::with_status(400)));
        assert!(!http_should_retry(&Failure::with_status(404)));
    }

    #[test]
    fn test_http_should_retry_network_error() {
        assert!(http_should_retry(&Failure::with_status(0)));
    }

    #[test]
    fn test_policy_allows_method() {
        let policy = HttpRetryPolicy::default();
        assert!(policy.allows_method("GET"));
        assert!(policy.allows_method("get"));
        assert!(!policy.allows_method("POST"));
    }

    #[test]
    fn test_max_total_time() {
        let policy = HttpRetryPolicy::default();
        assert_eq!(policy.max_total_time(None), 100_000);
        assert_eq!(policy.max_total_time(Some(5_000)), 5_000);
        assert_eq!(policy.max_total_time(Some(500_000)), 100_000);
    }

    #[test]
    fn test_layered_defaults_delay_sequence() {
        let delays: Vec<i64> = (1..=3)
            .map(|count| {
                retry_backoff_decision(BackoffAttempt::new(Failure::with_status(500), count).with_config(config()))
                    .unwrap()
                    .delay
            })
            .collect();
        assert_eq!(delays, vec![300, 600, 1200]);

        let error = retry_backoff_decision(BackoffAttempt::new(Failure::with_status(500), 4).with_config(config()))
            .unwrap_err();
        assert_eq!(error, Failure::with_status(500));
    }

    #[test]
    fn test_non_retryable_status_aborts() {
        let decision = decide_backoff(BackoffAttempt::new(Failure::with_status(404), 1).with_config(config()));
        assert_eq!(decision.abort_reason(), Some(AbortReason::Vetoed));
    }

    #[test]
    fn test_retry_after_replaces_delay() {
        let failure = Failure {
            retry_after: Some("2"),
            ..Failure::with_status(503)
        };
        let scope = retry_backoff_decision(BackoffAttempt::new(failure, 1).with_config(config())).unwrap();
        assert_eq!(scope.delay, 2_000);

        let dated = Failure {
            retry_after: Some("Sun, 1 Jan 2023 12:00:30 GMT"),
            ..Failure::with_status(429)
        };
        let scope = retry_backoff_decision(BackoffAttempt::new(dated, 1).with_config(config())).unwrap();
        assert_eq!(scope.delay, 30_000);
    }

    #[test]
    fn test_keep_alive_limits_total_time() {
        let failure = Failure {
            keep_alive: Some("timeout=1, max=100"),
            ..Failure::with_status(500)
        };
        let attempt = BackoffAttempt::new(failure, 2).with_start_time(NOW - 500);
        let decision = decide_backoff(attempt.with_config(config()));
        assert_eq!(decision.abort_reason(), Some(AbortReason::Vetoed));
    }

    #[test]
    fn test_operation_time_ceiling() {
        let failure = Failure {
            retry_after: Some("101"),
            ..Failure::with_status(503)
        };
        let decision = decide_backoff(BackoffAttempt::new(failure, 1).with_config(config()));
        assert_eq!(decision.abort_reason(), Some(AbortReason::Vetoed));
    }

    #[test]
    fn test_caller_overrides_win() {
        let config: BackoffConfig<(), Failure> = HttpRetryPolicy::default().layer(
            BackoffConfig::new()
                .with_random(FixedRandom(0.0))
                .with_clock(FixedClock(NOW))
                .with_max_retries(1)
                .with_delay(7),
        );
        let scope = retry_backoff_decision(BackoffAttempt::new(Failure::with_status(500), 1).with_config(config.clone()))
            .unwrap();
        assert_eq!(scope.delay, 7);
        assert!(retry_backoff_decision(BackoffAttempt::new(Failure::with_status(500), 2).with_config(config)).is_err());
    }

    #[test]
    fn test_layer_for_method_blocks_post() {
        let policy = HttpRetryPolicy::default();
        let post: BackoffConfig<(), Failure> = policy.layer_for_method(BackoffConfig::new().with_random(FixedRandom(0.0)), "POST");
        assert!(retry_backoff_decision(BackoffAttempt::new(Failure::with_status(503), 1).with_config(post)).is_err());

        let get: BackoffConfig<(), Failure> = policy.layer_for_method(BackoffConfig::new().with_random(FixedRandom(0.0)), "GET");
        assert!(retry_backoff_decision(BackoffAttempt::new(Failure::with_status(503), 1).with_config(get)).is_ok());
    }

    #[test]
    fn test_policy_serde_kebab_case() {
        let policy: HttpRetryPolicy =
            serde_yaml_ng::from_str("max-retries: 2\nstatus-codes: [503]\n").unwrap();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.status_codes, vec![503]);
        assert_eq!(policy.methods, vec!["GET".to_string()]);
        assert_eq!(policy.max_operation_time_ms, DEFAULT_MAX_OPERATION_TIME_MS);
    }
}
