//! Error types for rebound-core
//!
//! The decision engines never construct errors of their own: an aborted retry
//! hands back the caller's original error. These variants cover the settings
//! layer only.

use thiserror::Error;

/// Result type alias using rebound-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Settings errors
#[derive(Error, Debug)]
pub enum Error {
    /// Settings file not found
    #[error("Settings file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid settings value or format
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = Error::invalid_config("REBOUND_MAX_ATTEMPTS must be a valid number");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: REBOUND_MAX_ATTEMPTS must be a valid number"
        );
    }

    #[test]
    fn test_config_not_found_display() {
        let err = Error::config_not_found("/tmp/missing.yaml");
        assert!(err.to_string().contains("/tmp/missing.yaml"));
    }
}
