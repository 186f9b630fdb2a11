//! Log sinks.
//!
//! The call wrappers never log through a global directly; they write to a
//! [`LogSink`] handed to them. [`TracingSink`] forwards to `tracing` and is the
//! default. [`MemorySink`] keeps records in memory so tests can assert on
//! exactly what was emitted.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

/// A leveled, already formatted message.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message);
    }
}

/// Forwards every record to the `tracing` dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => ::tracing::debug!("{message}"),
            Level::Info => ::tracing::info!("{message}"),
            Level::Warn => ::tracing::warn!("{message}"),
        }
    }
}

/// A record captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far, in order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogRecord {
                level,
                message: message.to_string(),
                at: Utc::now(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order_and_levels() {
        let sink = MemorySink::new();
        sink.info("first");
        sink.warn("second");
        sink.info("third");

        assert_eq!(sink.count(Level::Info), 2);
        assert_eq!(sink.count(Level::Warn), 1);
        assert_eq!(sink.messages(Level::Info), vec!["first", "third"]);

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(records[0].at <= records[2].at);
    }

    #[test]
    fn clones_share_a_buffer() {
        let sink = MemorySink::new();
        let shared: Arc<dyn LogSink> = Arc::new(sink.clone());

        shared.warn("through the trait object");

        assert_eq!(sink.messages(Level::Warn), vec!["through the trait object"]);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn tracing_sink_without_subscriber_is_silent() {
        TracingSink.info("dropped");
        TracingSink.log(Level::Debug, "dropped");
    }
}
