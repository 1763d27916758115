//! Retry settings types
//!
//! Serializable counterparts of the engine configurations. Settings hold
//! literal values only; derivation functions are added in code on top of the
//! configuration they produce.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::retry::{
    BackoffConfig, BackoffStrategy, HttpRetryPolicy, RetryConfig, DEFAULT_INTERVAL_MS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_RETRIES,
};

/// Complete retry settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetrySettings {
    /// Attempt scope builder settings
    #[serde(default)]
    pub pattern: PatternSettings,

    /// Per-operation overrides of `pattern`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub operations: HashMap<String, PatternSettings>,

    /// Backoff decision function settings
    #[serde(default)]
    pub backoff: BackoffSettings,

    /// HTTP retry policy
    #[serde(default)]
    pub http: HttpRetryPolicy,
}

impl RetrySettings {
    /// Pattern settings for an operation, falling back to the default section
    pub fn pattern_for(&self, operation: &str) -> &PatternSettings {
        self.operations.get(operation).unwrap_or(&self.pattern)
    }
}

/// Settings for the attempt scope builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternSettings {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base interval in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Strategy computing the delay
    #[serde(default)]
    pub strategy: BackoffStrategy,

    /// Time budget for the whole sequence in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_ms: Option<u64>,

    /// Lower bound on each delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delay_ms: Option<u64>,

    /// Upper bound on each delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    /// Delay of the first retry in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_delay_ms: Option<u64>,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval(),
            strategy: BackoffStrategy::default(),
            max_time_ms: None,
            min_delay_ms: None,
            max_delay_ms: None,
            first_delay_ms: None,
        }
    }
}

impl PatternSettings {
    /// Build an engine configuration from these settings
    pub fn to_config<C, E>(&self) -> RetryConfig<C, E> {
        let mut config = RetryConfig::new()
            .with_max_attempts(self.max_attempts)
            .with_interval(self.interval_ms as f64)
            .with_strategy(self.strategy);

        if let Some(max_time) = self.max_time_ms {
            config = config.with_max_time(max_time as f64);
        }
        if let Some(min_delay) = self.min_delay_ms {
            config = config.with_min_delay(min_delay as f64);
        }
        if let Some(max_delay) = self.max_delay_ms {
            config = config.with_max_delay(max_delay as f64);
        }
        if let Some(first_delay) = self.first_delay_ms {
            config = config.with_first_delay(first_delay as f64);
        }

        config
    }
}

/// Settings for the backoff decision function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackoffSettings {
    /// Retry budget
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed base interval in milliseconds, random in 300..=500 when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_interval_ms: Option<u64>,

    /// Time budget for the whole sequence in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_ms: Option<u64>,

    /// Upper bound on each delay in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_interval_ms: None,
            max_time_ms: None,
            max_delay_ms: None,
        }
    }
}

impl BackoffSettings {
    /// Build an engine configuration from these settings
    pub fn to_config<C, E>(&self) -> BackoffConfig<C, E> {
        let mut config = BackoffConfig::new().with_max_retries(self.max_retries);

        if let Some(base_interval) = self.base_interval_ms {
            config = config.with_base_interval(base_interval as f64);
        }
        if let Some(max_time) = self.max_time_ms {
            config = config.with_max_time(max_time as f64);
        }
        if let Some(max_delay) = self.max_delay_ms {
            config = config.with_max_delay(max_delay as f64);
        }

        config
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS as u32
}
fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MS as u64
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES as u32
}
