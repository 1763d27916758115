//! Decision outcome shared by both engines

use std::fmt;

/// Why an attempt will not be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The attempt number is below one
    InvalidAttempt,
    /// The attempt number is above the configured maximum
    Exhausted,
    /// `should_retry` returned false or `should_not_retry` returned true
    Vetoed,
    /// Elapsed time plus the next delay exceeds the time budget
    TimeBudgetExceeded,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbortReason::InvalidAttempt => "invalid attempt",
            AbortReason::Exhausted => "attempts exhausted",
            AbortReason::Vetoed => "retry vetoed",
            AbortReason::TimeBudgetExceeded => "time budget exceeded",
        };
        f.write_str(text)
    }
}

/// Result of deciding one failed attempt
///
/// Both variants carry the fully resolved scope, so callers can inspect
/// the delay that would have been used even when the decision aborts.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<S> {
    /// Retry after `scope.delay` milliseconds
    Continue(S),
    /// Stop retrying
    Abort { scope: S, reason: AbortReason },
}

impl<S> Decision<S> {
    /// The resolved scope, whatever the outcome
    pub fn scope(&self) -> &S {
        match self {
            Decision::Continue(scope) => scope,
            Decision::Abort { scope, .. } => scope,
        }
    }

    /// Consume the decision and return its scope
    pub fn into_scope(self) -> S {
        match self {
            Decision::Continue(scope) => scope,
            Decision::Abort { scope, .. } => scope,
        }
    }

    /// Whether the attempt should be retried
    pub fn is_continue(&self) -> bool {
        matches!(self, Decision::Continue(_))
    }

    /// The abort reason, if the decision aborted
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            Decision::Continue(_) => None,
            Decision::Abort { reason, .. } => Some(*reason),
        }
    }
}

/// Whether `elapsed + delay` overruns `max_time`
///
/// Only applies when both the elapsed time and the budget are known.
pub(crate) fn exceeds_max_time(elapsed: Option<i64>, delay: i64, max_time: Option<i64>) -> bool {
    match (elapsed, max_time) {
        (Some(elapsed), Some(max_time)) => elapsed.saturating_add(delay) > max_time,
        _ => false,
    }
}
