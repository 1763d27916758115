//! Scenario tests for the retry engines
//!
//! These tests run both decision engines through complete retry sequences
//! with pinned random sources and clocks.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::retry::{
    decide_attempt, decide_backoff, retry_attempt, retry_backoff_decision, AbortReason,
    BackoffAttempt, BackoffConfig, BackoffStrategy, FixedClock, FixedRandom, RetryAttemptConfig,
    RetryConfig, SequenceRandom,
};

const NOW: i64 = 1_700_000_000_000;

/// An error type that is neither `Clone` nor `PartialEq`
#[derive(Debug)]
struct OperationError {
    id: u32,
}

fn pattern_delays(config: &RetryConfig<(), &'static str>, attempts: i64) -> Vec<i64> {
    (1..=attempts)
        .map(|attempt| {
            retry_attempt(RetryAttemptConfig::new("error", attempt as f64).with_config(config.clone()))
                .unwrap()
                .delay
        })
        .collect()
}

// ============================================================================
// Attempt scope builder
// ============================================================================

#[test]
fn test_full_jitter_midpoint_schedule() {
    let config = RetryConfig::new().with_random(FixedRandom(0.5));
    assert_eq!(pattern_delays(&config, 3), vec![250, 500, 1000]);
}

#[test]
fn test_full_jitter_upper_bound_schedule() {
    let config = RetryConfig::new().with_random(FixedRandom(0.9999));
    assert_eq!(pattern_delays(&config, 3), vec![500, 1000, 2000]);
}

#[test]
fn test_exponential_strategy_doubles_each_attempt() {
    let config = RetryConfig::new()
        .with_strategy(BackoffStrategy::Exponential)
        .with_interval(120)
        .with_max_attempts(8);
    let delays = pattern_delays(&config, 8);
    for pair in delays.windows(2) {
        assert_eq!(pair[1], 2 * pair[0]);
    }
}

#[test]
fn test_every_strategy_through_builder() {
    let expected = [
        (BackoffStrategy::Interval, 100),
        (BackoffStrategy::Incremental, 300),
        (BackoffStrategy::Exponential, 400),
        (BackoffStrategy::FullJitter, 0),
        (BackoffStrategy::EqualJitter, 200),
        (BackoffStrategy::DecorrelatedJitter, 100),
    ];

    for (strategy, delay) in expected {
        let config = RetryConfig::<(), &str>::new()
            .with_random(FixedRandom(0.0))
            .with_interval(100)
            .with_strategy(strategy);
        let scope = retry_attempt(
            RetryAttemptConfig::new("error", 3)
                .with_previous_delay(200)
                .with_config(config),
        )
        .unwrap();
        assert_eq!(scope.delay, delay, "strategy {strategy}");
    }
}

#[test]
fn test_identical_inputs_give_identical_delays() {
    let run = || {
        let config = RetryConfig::<(), &str>::new()
            .with_random(SequenceRandom::new(vec![0.1, 0.7, 0.3]))
            .with_max_attempts(3);
        pattern_delays(&config, 3)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_original_error_is_returned_on_abort() {
    let config = RetryConfig::<(), OperationError>::new().with_max_attempts(1);
    let error = retry_attempt(RetryAttemptConfig::new(OperationError { id: 42 }, 2).with_config(config))
        .unwrap_err();
    assert_eq!(error.id, 42);
}

#[test]
fn test_attempt_over_max_aborts_whatever_else_is_set() {
    let config = RetryConfig::<(), &str>::new()
        .with_should_retry(true)
        .with_delay(0)
        .with_max_time(1_000_000)
        .with_max_attempts(2);
    for attempt in 3..10 {
        let decision = decide_attempt(RetryAttemptConfig::new("error", attempt).with_config(config.clone()));
        assert_eq!(decision.abort_reason(), Some(AbortReason::Exhausted));
    }
}

#[test]
fn test_elapsed_time_budget_abort() {
    let config = RetryConfig::<(), &str>::new()
        .with_clock(FixedClock(NOW))
        .with_delay(1)
        .with_max_time(1);
    let decision = decide_attempt(
        RetryAttemptConfig::new("error", 1)
            .with_start_time(NOW - 1)
            .with_config(config),
    );
    assert_eq!(decision.abort_reason(), Some(AbortReason::TimeBudgetExceeded));
}

#[test]
fn test_hooks_fire_once_per_decision() {
    let retries = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));
    let retries_clone = retries.clone();
    let failures_clone = failures.clone();

    let config = RetryConfig::<(), &str>::new()
        .with_random(FixedRandom(0.0))
        .with_on_retry(move |_| {
            retries_clone.fetch_add(1, Ordering::SeqCst);
        })
        .with_on_retry_error(move |_| {
            failures_clone.fetch_add(1, Ordering::SeqCst);
        });

    for attempt in 1..=4 {
        let _ = retry_attempt(RetryAttemptConfig::new("error", attempt).with_config(config.clone()));
    }

    assert_eq!(retries.load(Ordering::SeqCst), 3);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[test]
fn test_hook_sees_final_delay() {
    let seen = Arc::new(AtomicU32::new(0));
    let seen_clone = seen.clone();
    let config = RetryConfig::<(), &str>::new()
        .with_delay(10)
        .with_max_delay(4)
        .with_on_retry(move |scope| {
            seen_clone.store(scope.delay as u32, Ordering::SeqCst);
        });

    retry_attempt(RetryAttemptConfig::new("error", 2).with_config(config)).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 4);
}

#[test]
fn test_invalid_attempt_runs_every_derivation() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = |calls: &Arc<AtomicU32>| {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    };
    let (a, b, c, d) = (counter(&calls), counter(&calls), counter(&calls), counter(&calls));

    let config = RetryConfig::<(), &str>::new()
        .with_interval_fn(move |_| {
            a();
            100.0
        })
        .with_delay_fn(move |_| {
            b();
            10.0
        })
        .with_max_delay_fn(move |_| {
            c();
            50.0
        })
        .with_should_retry_fn(move |_| {
            d();
            true
        });

    let decision = decide_attempt(RetryAttemptConfig::new("error", 0).with_config(config));
    assert_eq!(decision.abort_reason(), Some(AbortReason::InvalidAttempt));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

// ============================================================================
// Backoff decision function
// ============================================================================

#[test]
fn test_backoff_schedule_with_lowest_base() {
    let config = BackoffConfig::<(), &str>::new().with_random(FixedRandom(0.0));
    let delays: Vec<i64> = (1..=5)
        .map(|count| {
            retry_backoff_decision(BackoffAttempt::new("error", count).with_config(config.clone()))
                .unwrap()
                .delay
        })
        .collect();
    assert_eq!(delays, vec![300, 600, 1200, 2400, 4800]);

    let decision = decide_backoff(BackoffAttempt::new("error", 6).with_config(config));
    assert_eq!(decision.abort_reason(), Some(AbortReason::Exhausted));
}

#[test]
fn test_backoff_schedule_with_highest_base() {
    let config = BackoffConfig::<(), &str>::new().with_random(FixedRandom(0.999));
    let scope = retry_backoff_decision(BackoffAttempt::new("error", 2).with_config(config)).unwrap();
    assert_eq!(scope.base_interval, 500);
    assert_eq!(scope.delay, 1000);
}

#[test]
fn test_backoff_returns_original_error() {
    let config = BackoffConfig::<(), OperationError>::new().with_should_not_retry(true);
    let error = retry_backoff_decision(BackoffAttempt::new(OperationError { id: 7 }, 1).with_config(config))
        .unwrap_err();
    assert_eq!(error.id, 7);
}

#[test]
fn test_backoff_elapsed_time_budget() {
    let config = BackoffConfig::<(), &str>::new()
        .with_clock(FixedClock(NOW))
        .with_delay(1)
        .with_max_time(1);
    let decision = decide_backoff(
        BackoffAttempt::new("error", 1)
            .with_start_time(NOW - 1)
            .with_config(config),
    );
    assert_eq!(decision.abort_reason(), Some(AbortReason::TimeBudgetExceeded));
}

#[test]
fn test_engines_keep_their_own_defaults() {
    let pattern = retry_attempt(
        RetryAttemptConfig::<(), &str>::new("error", 1)
            .with_config(RetryConfig::new().with_random(FixedRandom(0.0))),
    )
    .unwrap();
    let backoff = retry_backoff_decision(
        BackoffAttempt::<(), &str>::new("error", 1)
            .with_config(BackoffConfig::new().with_random(FixedRandom(0.0))),
    )
    .unwrap();

    assert_eq!(pattern.max_attempts, 3);
    assert_eq!(pattern.interval, 500);
    assert_eq!(backoff.max_retries, 5);
    assert_eq!(backoff.base_interval, 300);
}
