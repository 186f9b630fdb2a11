//! Process subscriber setup.
//!
//! JSON lines by default, plain text when configured. The filter comes from
//! `RUST_LOG` when set, otherwise from [`LoggingConfig::filter`].

use sa360_core::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// [`init_with`] using [`LoggingConfig::default`].
pub fn init() {
    init_with(&LoggingConfig::default());
}

/// Install a fmt subscriber built from `config`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_with(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        ::tracing::debug!(json = config.json, filter = %config.filter, "logging initialized");
    }
    installed
}
