//! Hierarchical settings loader with precedence
//!
//! Loads retry settings from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User settings (~/.rebound/retry.yaml, or an explicit file)
//! 3. Environment variables (REBOUND_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::retry::BackoffStrategy;
use crate::types::RetrySettings;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::str::FromStr;

/// Name of the user settings file inside the config directory
pub const SETTINGS_FILE: &str = "retry.yaml";

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Settings hierarchy loader
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    /// Base directory for settings files
    config_dir: Utf8PathBuf,
}

impl SettingsLoader {
    /// Create a loader reading from `~/.rebound`
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the standard config directory (~/.rebound)
    fn get_config_dir() -> Result<Utf8PathBuf> {
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .ok()
            .or_else(|| dirs::home_dir().and_then(|p| p.to_str().map(str::to_string)))
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;

        Ok(Utf8PathBuf::from(home).join(".rebound"))
    }

    /// Load settings from the config directory with hierarchical precedence
    pub fn load(&self) -> Result<RetrySettings> {
        let mut settings = Self::load_embedded_config::<RetrySettings>("retry-defaults.yaml")?;

        let settings_path = self.settings_path();
        if settings_path.exists() {
            let file_settings = self.load_yaml_file::<RetrySettings>(&settings_path)?;
            settings = Self::merge_settings(settings, file_settings);
        }

        self.apply_env_overrides(settings)
    }

    /// Load settings using an explicit file instead of the config directory
    ///
    /// Unlike [`SettingsLoader::load`], a missing file is an error.
    pub fn load_from(&self, path: &Utf8Path) -> Result<RetrySettings> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }

        let settings = Self::load_embedded_config::<RetrySettings>("retry-defaults.yaml")?;
        let file_settings = self.load_yaml_file::<RetrySettings>(path)?;
        self.apply_env_overrides(Self::merge_settings(settings, file_settings))
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        let config: T = serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        tracing::debug!(path = %path, "loaded retry settings");
        Ok(config)
    }

    /// Merge two settings (base is overridden by overlay)
    fn merge_settings(mut base: RetrySettings, overlay: RetrySettings) -> RetrySettings {
        for (operation, pattern) in overlay.operations {
            base.operations.insert(operation, pattern);
        }

        RetrySettings {
            pattern: overlay.pattern,
            operations: base.operations,
            backoff: overlay.backoff,
            http: overlay.http,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, mut settings: RetrySettings) -> Result<RetrySettings> {
        if let Some(val) = env_number("REBOUND_MAX_ATTEMPTS")? {
            settings.pattern.max_attempts = val;
        }

        if let Some(val) = env_number("REBOUND_INTERVAL_MS")? {
            settings.pattern.interval_ms = val;
        }

        if let Ok(val) = env::var("REBOUND_STRATEGY") {
            settings.pattern.strategy = BackoffStrategy::from_str(&val)?;
        }

        if let Some(val) = env_number("REBOUND_MAX_TIME_MS")? {
            settings.pattern.max_time_ms = Some(val);
        }

        if let Some(val) = env_number("REBOUND_MAX_RETRIES")? {
            settings.backoff.max_retries = val;
        }

        if let Some(val) = env_number("REBOUND_BASE_INTERVAL_MS")? {
            settings.backoff.base_interval_ms = Some(val);
        }

        if let Some(val) = env_number("REBOUND_HTTP_MAX_OPERATION_TIME_MS")? {
            settings.http.max_operation_time_ms = val;
        }

        if let Ok(val) = env::var("REBOUND_HTTP_METHODS") {
            settings.http.methods = val
                .split(',')
                .map(|method| method.trim().to_ascii_uppercase())
                .filter(|method| !method.is_empty())
                .collect();
        }

        Ok(settings)
    }

    /// Path of the user settings file
    pub fn settings_path(&self) -> Utf8PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

/// Parse a numeric environment variable, if set
fn env_number<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::invalid_config(format!("{} must be a valid number", name))),
        Err(_) => Ok(None),
    }
}
