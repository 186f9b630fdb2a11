//! Wall-clock timing of calls.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sa360_observability::{LogSink, TracingSink};

use crate::naming::{Invoke, fn_name};
use crate::outcome::Outcome;

/// One timing measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingSample {
    pub name: String,
    pub elapsed: Duration,
}

impl TimingSample {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

impl fmt::Display for TimingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.3}ms", self.name, self.elapsed_ms())
    }
}

/// A callable that logs its own duration on every normal return.
///
/// A call that returns `Err` or panics is not logged; the error or panic
/// reaches the caller unchanged.
#[derive(Clone)]
pub struct Timed<F> {
    name: String,
    inner: F,
    sink: Arc<dyn LogSink>,
}

impl<F> Timed<F> {
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

    /// Invoke the wrapped callable with `args` packed in a tuple.
    pub fn call<Args>(&self, args: Args) -> <F as Invoke<Args>>::Output
    where
        F: Invoke<Args>,
        F::Output: Outcome,
    {
        timed_with(&*self.sink, &self.name, || self.inner.invoke(args))
    }
}

impl<F> fmt::Debug for Timed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timed").field("name", &self.name).finish()
    }
}

/// Wrap `f`, labelling log records with the callable's own name.
pub fn time_it<F>(f: F) -> Timed<F> {
    Timed::new(fn_name::<F>(), f)
}

/// Run `f` once and log how long it took.
pub fn timed<R: Outcome>(name: &str, f: impl FnOnce() -> R) -> R {
    timed_with(&TracingSink, name, f)
}

/// Like [`timed`], logging to `sink`.
pub fn timed_with<R: Outcome>(sink: &dyn LogSink, name: &str, f: impl FnOnce() -> R) -> R {
    let (output, sample) = measure(name, f);
    if !output.is_failure() {
        sink.info(&sample.to_string());
    }
    output
}

fn measure<R>(name: &str, f: impl FnOnce() -> R) -> (R, TimingSample) {
    let started = Instant::now();
    let output = f();
    let sample = TimingSample {
        name: name.to_string(),
        elapsed: started.elapsed(),
    };
    (output, sample)
}
