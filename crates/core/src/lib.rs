//! `sa360-core` — shared configuration and error types.
//!
//! This crate holds plain data only (no logging setup, no wrappers).

pub mod config;
pub mod error;

pub use config::{AutomationConfig, LoggingConfig, RetryPolicy};
pub use error::{ConfigError, ConfigResult};
