//! # rebound-core
//!
//! Core library for Rebound providing:
//! - Per-attempt retry decisions built from value-or-derivation configuration
//! - Backoff strategies (interval, incremental, exponential and jittered variants)
//! - The flat backoff decision function used by HTTP retries
//! - `Retry-After` and `Keep-Alive` header parsing
//! - Async retry drivers and a hierarchical settings loader

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::SettingsLoader;
pub use error::{Error, Result};
pub use retry::{retry_attempt, retry_backoff_decision, BackoffScope, RetryScope};
pub use types::RetrySettings;
