//! Simulate command

use std::sync::Arc;

use anyhow::Result;
use camino::Utf8Path;
use owo_colors::OwoColorize;
use rebound_core::retry::{
    decide_attempt, decide_backoff, AbortReason, BackoffAttempt, BackoffConfig, Clock, FixedRandom,
    ManualClock, RetryAttemptConfig, RetryConfig, SystemClock,
};
use rebound_core::types::RetrySettings;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::{load_settings, pattern_config, SimulatedFailure};
use crate::cli::{Engine, SimulateArgs};
use crate::output;

/// One failed attempt and what the engine decided for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub attempt: i64,
    pub delay_ms: i64,
    pub elapsed_ms: i64,
    pub retry: bool,
    pub decision: String,
}

impl Step {
    fn new(attempt: i64, delay_ms: i64, elapsed_ms: Option<i64>, reason: Option<AbortReason>) -> Self {
        Self {
            attempt,
            delay_ms,
            elapsed_ms: elapsed_ms.unwrap_or(0),
            retry: reason.is_none(),
            decision: reason.map_or_else(|| "retry".to_string(), |reason| reason.to_string()),
        }
    }
}

#[derive(Tabled)]
struct StepRow {
    attempt: i64,
    #[tabled(rename = "delay (ms)")]
    delay: i64,
    #[tabled(rename = "elapsed (ms)")]
    elapsed: i64,
    decision: String,
}

pub fn run(args: SimulateArgs, config: Option<&Utf8Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let steps = schedule(&args, &settings, SystemClock.now_millis());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    if steps.is_empty() {
        output::warning("Nothing to simulate, --limit is 0");
        return Ok(());
    }

    let total_delay: i64 = steps.iter().filter(|step| step.retry).map(|step| step.delay_ms).sum();
    let retries = steps.iter().filter(|step| step.retry).count();

    let rows: Vec<StepRow> = steps
        .into_iter()
        .map(|step| StepRow {
            attempt: step.attempt,
            delay: step.delay_ms,
            elapsed: step.elapsed_ms,
            decision: if step.retry {
                step.decision.green().to_string()
            } else {
                step.decision.red().to_string()
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    output::info(&format!("{} retries, {} ms spent waiting", retries, total_delay));
    Ok(())
}

/// Feed repeated failures to the selected engine until it gives up or `args.limit` is hit
///
/// Time is simulated: the clock starts at `now` and moves forward by each
/// delay, so time budgets apply as they would in a real run.
pub fn schedule(args: &SimulateArgs, settings: &RetrySettings, now: i64) -> Vec<Step> {
    let clock = Arc::new(ManualClock::new(now));
    let failure = SimulatedFailure::new(args.status)
        .with_header("Retry-After", args.retry_after.as_deref())
        .with_header("Keep-Alive", args.keep_alive.as_deref());

    match args.engine {
        Engine::Pattern => {
            let mut config =
                pattern_config::<(), SimulatedFailure>(settings, args.operation.as_deref(), args.strategy)
                    .with_clock(Arc::clone(&clock));
            if let Some(random) = args.random {
                config = config.with_random(FixedRandom(random));
            }
            pattern_schedule(&config, &failure, &clock, now, args.limit)
        }
        Engine::Backoff => {
            let mut config =
                settings.backoff.to_config::<(), SimulatedFailure>().with_clock(Arc::clone(&clock));
            if let Some(random) = args.random {
                config = config.with_random(FixedRandom(random));
            }
            backoff_schedule(&config, &failure, &clock, now, args.limit)
        }
        Engine::Http => {
            // The clock must be set before layering, the HTTP delay reads it
            let mut config = BackoffConfig::<(), SimulatedFailure>::new().with_clock(Arc::clone(&clock));
            if let Some(random) = args.random {
                config = config.with_random(FixedRandom(random));
            }
            let config = settings.http.layer(config);
            backoff_schedule(&config, &failure, &clock, now, args.limit)
        }
    }
}

fn pattern_schedule(
    config: &RetryConfig<(), SimulatedFailure>,
    failure: &SimulatedFailure,
    clock: &ManualClock,
    start_time: i64,
    limit: u32,
) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut previous_delay = None;

    for attempt in 1..=limit {
        let mut input = RetryAttemptConfig::new(failure.clone(), attempt)
            .with_start_time(start_time)
            .with_config(config.clone());
        if let Some(delay) = previous_delay {
            input = input.with_previous_delay(delay);
        }

        let decision = decide_attempt(input);
        let scope = decision.scope();
        steps.push(Step::new(scope.attempt, scope.delay, scope.elapsed_time, decision.abort_reason()));

        if !decision.is_continue() {
            break;
        }
        previous_delay = Some(scope.delay);
        clock.advance(scope.delay);
    }

    steps
}

fn backoff_schedule(
    config: &BackoffConfig<(), SimulatedFailure>,
    failure: &SimulatedFailure,
    clock: &ManualClock,
    start_time: i64,
    limit: u32,
) -> Vec<Step> {
    let mut steps = Vec::new();

    for count in 1..=limit {
        let decision = decide_backoff(
            BackoffAttempt::new(failure.clone(), count)
                .with_start_time(start_time)
                .with_config(config.clone()),
        );
        let scope = decision.scope();
        steps.push(Step::new(scope.count, scope.delay, scope.elapsed_time, decision.abort_reason()));

        if !decision.is_continue() {
            break;
        }
        clock.advance(scope.delay);
    }

    steps
}
