//! CLI command implementations

pub mod config;
pub mod header;
pub mod run;
pub mod simulate;

use std::fmt;

use anyhow::Result;
use camino::Utf8Path;
use rebound_core::retry::{BackoffStrategy, HttpFailure, RetryConfig};
use rebound_core::types::RetrySettings;
use rebound_core::SettingsLoader;

/// Load settings from `path` if given, otherwise from the default hierarchy
pub fn load_settings(path: Option<&Utf8Path>) -> Result<RetrySettings> {
    let loader = SettingsLoader::new()?;
    let settings = match path {
        Some(path) => loader.load_from(path)?,
        None => loader.load()?,
    };
    Ok(settings)
}

/// Attempt scope builder configuration for an operation, with an optional strategy override
pub fn pattern_config<C, E>(
    settings: &RetrySettings,
    operation: Option<&str>,
    strategy: Option<BackoffStrategy>,
) -> RetryConfig<C, E> {
    let pattern = match operation {
        Some(operation) => settings.pattern_for(operation),
        None => &settings.pattern,
    };

    let config = pattern.to_config();
    match strategy {
        Some(strategy) => config.with_strategy(strategy),
        None => config,
    }
}

/// A failed request produced by the synthetic operations
#[derive(Debug, Clone)]
pub struct SimulatedFailure {
    status: u16,
    headers: Vec<(String, String)>,
}

impl SimulatedFailure {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.headers.push((name.to_string(), value.to_string()));
        }
        self
    }
}

impl fmt::Display for SimulatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_network_error() {
            write!(f, "network error")
        } else {
            write!(f, "HTTP {}", self.status)
        }
    }
}

impl std::error::Error for SimulatedFailure {}

impl HttpFailure for SimulatedFailure {
    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
