//! `Retry-After` and `Keep-Alive` header parsing

use std::collections::HashMap;

use chrono::DateTime;

use super::resolve::round_half_up;

pub const SECOND_AS_MILLISECOND: i64 = 1_000;
pub const MINUTE_AS_MILLISECOND: i64 = 60 * SECOND_AS_MILLISECOND;
pub const HOUR_AS_MILLISECOND: i64 = 60 * MINUTE_AS_MILLISECOND;
pub const DAY_AS_MILLISECOND: i64 = 24 * HOUR_AS_MILLISECOND;

/// Milliseconds to wait according to a `Retry-After` header value
///
/// The value is either a number of seconds or an HTTP date. Dates only count
/// when they are strictly after `now_ms`. Missing, blank or unparseable values
/// return `None`.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::parse_retry_after;
///
/// // Sun, 1 Jan 2023 12:00:00 GMT
/// let now = 1_672_574_400_000;
/// assert_eq!(parse_retry_after(Some("1"), now), Some(1_000));
/// assert_eq!(parse_retry_after(Some("Sun, 1 Jan 2023 12:01:00 GMT"), now), Some(60_000));
/// assert_eq!(parse_retry_after(Some("Sun, 1 Jan 2023 12:00:00 GMT"), now), None);
/// assert_eq!(parse_retry_after(None, now), None);
/// ```
pub fn parse_retry_after(value: Option<&str>, now_ms: i64) -> Option<i64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }

    parse_seconds(value).or_else(|| parse_future_date(value, now_ms))
}

fn parse_seconds(value: &str) -> Option<i64> {
    let seconds: f64 = value.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(round_half_up(seconds * SECOND_AS_MILLISECOND as f64))
}

fn parse_future_date(value: &str, now_ms: i64) -> Option<i64> {
    let date = DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()?;
    let remaining = date.timestamp_millis().saturating_sub(now_ms);
    (remaining > 0).then_some(remaining)
}

/// Milliseconds of the `timeout` parameter of a `Keep-Alive` header value
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::parse_keep_alive_timeout;
///
/// assert_eq!(parse_keep_alive_timeout(Some("timeout=1, max=1")), Some(1_000));
/// assert_eq!(parse_keep_alive_timeout(Some("timeout=bad")), None);
/// assert_eq!(parse_keep_alive_timeout(None), None);
/// ```
pub fn parse_keep_alive_timeout(value: Option<&str>) -> Option<i64> {
    let params = parse_key_values(value?, ',', '=');
    parse_seconds(params.get("timeout")?)
}

/// Split `key=value` pairs into a map
///
/// Pairs are separated by `pair_sep` and keys from values by `kv_sep`. Keys
/// and values are trimmed; entries that are not exactly one key and one
/// value are skipped.
pub fn parse_key_values(value: &str, pair_sep: char, kv_sep: char) -> HashMap<String, String> {
    value
        .split(pair_sep)
        .filter_map(|pair| {
            let parts: Vec<&str> = pair.split(kv_sep).map(str::trim).collect();
            match parts.as_slice() {
                [key, value] => Some((key.to_string(), value.to_string())),
                _ => None,
            }
        })
        .collect()
}
