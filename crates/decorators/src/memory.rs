//! Time and heap usage of calls.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sa360_observability::{LogSink, TracingSink};

use crate::naming::{Invoke, fn_name};
use crate::outcome::Outcome;
use crate::profiler::{self, MemoryUsage, TracingSession};

/// One memory measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySample {
    pub name: String,
    pub elapsed: Duration,
    pub usage: MemoryUsage,
}

impl MemorySample {
    /// The four log lines for this sample: name, time, current, peak.
    pub fn lines(&self) -> [String; 4] {
        [
            format!("Function Name        : {}", self.name),
            format!(
                "Execution time       : {:.3}ms",
                self.elapsed.as_secs_f64() * 1000.0
            ),
            format!("Current memory usage : {:04.3}M", self.usage.current_mb()),
            format!("Peak                 : {:04.3}M", self.usage.peak_mb()),
        ]
    }

    fn emit(&self, sink: &dyn LogSink) {
        for line in self.lines() {
            sink.info(&line);
        }
    }
}

impl fmt::Display for MemorySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}

/// A callable that logs its duration and traced heap usage on every normal
/// return. A call that returns `Err` or panics is not logged.
///
/// Heap figures come from [`profiler`]; they read zero unless
/// [`profiler::TracingAllocator`] is the global allocator.
#[derive(Clone)]
pub struct Measured<F> {
    name: String,
    inner: F,
    sink: Arc<dyn LogSink>,
}

impl<F> Measured<F> {
    pub fn new(name: impl Into<String>, inner: F) -> Self {
        Self {
            name: name.into(),
            inner,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call<Args>(&self, args: Args) -> <F as Invoke<Args>>::Output
    where
        F: Invoke<Args>,
        F::Output: Outcome,
    {
        measured_with(&*self.sink, &self.name, || self.inner.invoke(args))
    }
}

impl<F> fmt::Debug for Measured<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measured").field("name", &self.name).finish()
    }
}

/// Wrap `f`, labelling log records with the callable's own name.
pub fn measure_memory<F>(f: F) -> Measured<F> {
    Measured::new(fn_name::<F>(), f)
}

/// Run `f` once and log its duration and heap usage.
pub fn measured<R: Outcome>(name: &str, f: impl FnOnce() -> R) -> R {
    measured_with(&TracingSink, name, f)
}

/// Like [`measured`], logging to `sink`.
pub fn measured_with<R: Outcome>(sink: &dyn LogSink, name: &str, f: impl FnOnce() -> R) -> R {
    let (output, sample) = measure(name, f);
    if !output.is_failure() {
        sample.emit(sink);
    }
    output
}

fn measure<R>(name: &str, f: impl FnOnce() -> R) -> (R, MemorySample) {
    if !profiler::is_installed() {
        tracing::trace!(function = name, "tracing allocator not installed; usage reads zero");
    }

    let session = TracingSession::begin();
    let started = Instant::now();
    let output = f();
    let elapsed = started.elapsed();
    let usage = session.snapshot();
    drop(session);

    let sample = MemorySample {
        name: name.to_string(),
        elapsed,
        usage,
    };
    (output, sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa360_observability::{Level, MemorySink};
    use std::panic::{self, AssertUnwindSafe};

    fn build_rows(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("row-{i}")).collect()
    }

    fn value_after(line: &str, prefix: &str, unit: &str) -> f64 {
        line.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(unit))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(|| panic!("unexpected record: {line}"))
    }

    #[test]
    fn emits_four_records_in_order() {
        let sink = MemorySink::new();
        let wrapped = measure_memory(build_rows).with_sink(sink.clone());

        assert_eq!(wrapped.call((100usize,)).len(), 100);

        let infos = sink.messages(Level::Info);
        assert_eq!(infos.len(), 4);
        assert_eq!(infos[0], "Function Name        : build_rows");
        assert!(value_after(&infos[1], "Execution time       :", "ms") >= 0.0);
        assert!(value_after(&infos[2], "Current memory usage :", "M") >= 0.0);
        assert!(value_after(&infos[3], "Peak                 :", "M") >= 0.0);
    }

    #[test]
    fn every_invocation_logs_its_own_block() {
        let sink = MemorySink::new();
        let wrapped = Measured::new("noop", || ()).with_sink(sink.clone());

        wrapped.call(());
        wrapped.call(());

        assert_eq!(sink.count(Level::Info), 8);
        assert_eq!(sink.count(Level::Warn), 0);
    }

    fn failing_call() -> Result<(), String> {
        Err("quota exceeded".to_string())
    }

    #[test]
    fn errors_are_returned_without_logging() {
        let sink = MemorySink::new();
        let wrapped = measure_memory(failing_call).with_sink(sink.clone());

        assert_eq!(wrapped.call(()), Err("quota exceeded".to_string()));
        assert_eq!(
            measured_with(&sink, "failing", failing_call),
            Err("quota exceeded".to_string())
        );
        assert_eq!(sink.count(Level::Info), 0);
    }

    #[test]
    fn named_overrides_the_label() {
        let sink = MemorySink::new();
        let wrapped = measure_memory(build_rows)
            .named("report_upload")
            .with_sink(sink.clone());

        assert_eq!(wrapped.name(), "report_upload");
        wrapped.call((3usize,));
        assert_eq!(
            sink.messages(Level::Info)[0],
            "Function Name        : report_upload"
        );
    }

    #[test]
    fn sample_formatting() {
        let sample = MemorySample {
            name: "report_fetch".to_string(),
            elapsed: Duration::from_millis(12),
            usage: MemoryUsage {
                current: 1_234_000,
                peak: 5_000_000,
            },
        };

        let [name, time, current, peak] = sample.lines();
        assert_eq!(name, "Function Name        : report_fetch");
        assert_eq!(time, "Execution time       : 12.000ms");
        assert_eq!(current, "Current memory usage : 1.234M");
        assert_eq!(peak, "Peak                 : 5.000M");
    }

    #[test]
    fn panics_propagate_without_logging() {
        let sink = MemorySink::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            measured_with(&sink, "explode", || -> u8 { panic!("kaboom") })
        }));

        assert!(outcome.is_err());
        assert!(sink.is_empty());
    }
}
