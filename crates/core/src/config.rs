//! Configuration for the call wrappers and process logging.
//!
//! Everything here is plain data: it can be built in code, deserialized from
//! JSON, or read from the environment. Values are validated on the way in so
//! the wrappers can assume a usable policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Retry policy configuration.
///
/// The delay before retry `n + 1` is `delay * backoff^(n - 1)`, where `n` is
/// the 1-based number of the attempt that just failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first call.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    #[serde(rename = "delay_secs", with = "duration_secs")]
    pub delay: Duration,
    /// Factor applied to the delay after every retryable failure.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Build a validated policy with the default attempt budget.
    pub fn new(delay: Duration, backoff: f64) -> ConfigResult<Self> {
        Self {
            delay,
            backoff,
            ..Default::default()
        }
        .validated()
    }

    /// The policy used around reporting API calls: 3 tries, 15s, doubling.
    pub fn api_default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(15),
            backoff: 2.0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Check the policy's invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts(self.max_attempts));
        }
        if !self.backoff.is_finite() || self.backoff < 1.0 {
            return Err(ConfigError::InvalidBackoff(self.backoff));
        }
        Ok(())
    }

    /// Validate and return the policy.
    pub fn validated(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Delay to sleep after the given (1-indexed) attempt has failed.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = self.backoff.powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Check if another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Process logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: true,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
}

pub const ENV_RETRY_MAX_ATTEMPTS: &str = "SA360_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_DELAY_SECS: &str = "SA360_RETRY_DELAY_SECS";
pub const ENV_RETRY_BACKOFF: &str = "SA360_RETRY_BACKOFF";
pub const ENV_LOG_JSON: &str = "SA360_LOG_JSON";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

impl AutomationConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.retry.validate()?;
        Ok(config)
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
            config.retry.max_attempts = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(ENV_RETRY_MAX_ATTEMPTS, raw.as_str()))?;
        }
        if let Some(raw) = lookup(ENV_RETRY_DELAY_SECS) {
            let secs: f64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(ENV_RETRY_DELAY_SECS, raw.as_str()))?;
            config.retry.delay = duration_secs::from_f64(secs)?;
        }
        if let Some(raw) = lookup(ENV_RETRY_BACKOFF) {
            config.retry.backoff = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(ENV_RETRY_BACKOFF, raw.as_str()))?;
        }
        if let Some(raw) = lookup(ENV_LOG_JSON) {
            config.logging.json = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(ConfigError::invalid_env(ENV_LOG_JSON, raw)),
            };
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            config.logging.filter = filter;
        }

        config.retry.validate()?;
        tracing::debug!(retry = ?config.retry, json = config.logging.json, "loaded configuration");
        Ok(config)
    }
}

/// Serialize a `Duration` as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::error::{ConfigError, ConfigResult};

    pub fn from_f64(secs: f64) -> ConfigResult<Duration> {
        Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDelay(secs))
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        from_f64(secs).map_err(serde::de::Error::custom)
    }
}
