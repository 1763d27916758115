//! Header command

use anyhow::{anyhow, Result};
use chrono::DateTime;
use rebound_core::retry::{parse_keep_alive_timeout, parse_key_values, parse_retry_after, Clock, SystemClock};

use crate::cli::{HeaderCommands, KeepAliveArgs, RetryAfterArgs};
use crate::output;

pub fn run(cmd: HeaderCommands) -> Result<()> {
    match cmd {
        HeaderCommands::RetryAfter(args) => retry_after(args),
        HeaderCommands::KeepAlive(args) => keep_alive(args),
    }
}

fn retry_after(args: RetryAfterArgs) -> Result<()> {
    let now = match &args.now {
        Some(now) => parse_now(now)?,
        None => SystemClock.now_millis(),
    };

    match parse_retry_after(Some(&args.value), now) {
        Some(delay) => output::kv("delay", &format!("{} ms", delay)),
        None => output::warning(&format!("No delay in Retry-After value '{}'", args.value)),
    }
    Ok(())
}

fn keep_alive(args: KeepAliveArgs) -> Result<()> {
    let mut params: Vec<(String, String)> = parse_key_values(&args.value, ',', '=').into_iter().collect();
    params.sort();
    for (key, value) in &params {
        output::kv(key, value);
    }

    match parse_keep_alive_timeout(Some(&args.value)) {
        Some(timeout) => output::kv("timeout", &format!("{} ms", timeout)),
        None => output::warning(&format!("No timeout in Keep-Alive value '{}'", args.value)),
    }
    Ok(())
}

fn parse_now(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|now| now.timestamp_millis())
        .map_err(|e| anyhow!("Invalid --now value '{}': {}", value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_now() {
        assert_eq!(parse_now("2023-01-01T12:00:00Z").unwrap(), 1_672_574_400_000);
        assert_eq!(parse_now("2023-01-01T13:00:00+01:00").unwrap(), 1_672_574_400_000);
    }

    #[test]
    fn test_parse_now_rejects_http_date() {
        assert!(parse_now("Sun, 01 Jan 2023 12:00:00 GMT").is_err());
    }

    #[test]
    fn test_retry_after_with_reference_time() {
        let args = RetryAfterArgs {
            value: "Sun, 01 Jan 2023 12:00:05 GMT".to_string(),
            now: Some("2023-01-01T12:00:00Z".to_string()),
        };
        assert!(retry_after(args).is_ok());
    }

    #[test]
    fn test_retry_after_bad_reference_time() {
        let args = RetryAfterArgs {
            value: "5".to_string(),
            now: Some("yesterday".to_string()),
        };
        assert!(retry_after(args).is_err());
    }
}
