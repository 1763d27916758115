//! Run command

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use camino::Utf8Path;
use rebound_core::retry::{
    retry_backoff, retry_http_request, BackoffConfig, FixedRandom, RetryPattern, TracingHooks,
};
use rebound_core::types::RetrySettings;

use super::{load_settings, pattern_config, SimulatedFailure};
use crate::cli::{Engine, RunArgs};
use crate::output;

pub async fn run(args: RunArgs, config: Option<&Utf8Path>) -> Result<()> {
    let settings = load_settings(config)?;

    output::header("Synthetic operation");
    output::kv("engine", &format!("{:?}", args.engine).to_lowercase());
    output::kv("failures", &args.failures.to_string());

    let started = Instant::now();
    let call = execute(&args, &settings)
        .await
        .context("Operation failed after retries")?;

    output::success(&format!(
        "Succeeded on call {} after {} ms",
        call,
        started.elapsed().as_millis()
    ));
    Ok(())
}

/// Retry an operation that fails `args.failures` times, returning the call that succeeded
pub async fn execute(args: &RunArgs, settings: &RetrySettings) -> Result<u32, SimulatedFailure> {
    let hooks = TracingHooks::new(args.operation.as_deref().unwrap_or("synthetic"));
    let calls = Arc::new(AtomicU32::new(0));

    let op = {
        let calls = Arc::clone(&calls);
        let failures = args.failures;
        let status = args.status;
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call <= failures {
                    Err(SimulatedFailure::new(status))
                } else {
                    Ok(call)
                }
            }
        }
    };

    match args.engine {
        Engine::Pattern => {
            let mut config =
                pattern_config::<(), SimulatedFailure>(settings, args.operation.as_deref(), args.strategy)
                    .with_on_retry(hooks.on_retry())
                    .with_on_retry_error(hooks.on_retry_error());
            if let Some(random) = args.random {
                config = config.with_random(FixedRandom(random));
            }

            RetryPattern::new(config)
                .with_on_success(|scope, call| {
                    if let Some(scope) = scope {
                        tracing::info!(attempt = scope.attempt, call = *call, "recovered after retry");
                    }
                })
                .execute(op)
                .await
        }
        Engine::Backoff => {
            let mut config =
                settings.backoff.to_config::<(), SimulatedFailure>().with_tap(hooks.tap());
            if let Some(random) = args.random {
                config = config.with_random(FixedRandom(random));
            }
            retry_backoff(&config, op).await
        }
        Engine::Http => {
            let mut config = BackoffConfig::<(), SimulatedFailure>::new().with_tap(hooks.tap());
            if let Some(random) = args.random {
                config = config.with_random(FixedRandom(random));
            }
            let config = settings.http.layer_for_method(config, &args.method);
            retry_http_request(&config, op).await
        }
    }
}
