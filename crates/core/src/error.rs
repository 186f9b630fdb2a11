//! Configuration error model.

use thiserror::Error;

/// Result type used when building or loading configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration-level error.
///
/// Only raised while assembling policies and settings. The call wrappers
/// never produce these at call time; they hand back whatever the wrapped
/// callable returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A retry policy would never attempt the call.
    #[error("max_attempts must be at least 1 (got {0})")]
    ZeroAttempts(u32),

    /// The backoff multiplier is not a finite number >= 1.0.
    #[error("backoff multiplier must be finite and >= 1.0 (got {0})")]
    InvalidBackoff(f64),

    /// The initial delay is negative or not finite.
    #[error("delay must be a finite, non-negative number of seconds (got {0})")]
    InvalidDelay(f64),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// An environment variable held a value of the wrong shape.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ConfigError {
    pub fn invalid_env(var: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var,
            value: value.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
