//! Where the call wrappers' messages go.
//!
//! Every wrapper writes through a [`LogSink`]. The default [`TracingSink`]
//! forwards each message as a `tracing` event, so it shows up wherever the
//! process subscriber sends it; [`MemorySink`] keeps records in memory for
//! assertions. [`init`] and [`init_with`] install that subscriber.

/// Install the process subscriber with the default [`sa360_core::LoggingConfig`]
/// (JSON lines, `info` unless `RUST_LOG` says otherwise).
///
/// Only the first installation in a process takes effect.
pub fn init() {
    tracing::init();
}

/// Subscriber setup: JSON or text output, `RUST_LOG`-driven filtering.
pub mod tracing;

/// The [`LogSink`] seam and its implementations.
pub mod sink;

pub use self::tracing::init_with;
pub use sink::{Level, LogRecord, LogSink, MemorySink, TracingSink};
