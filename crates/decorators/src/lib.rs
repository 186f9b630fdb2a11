//! `sa360-decorators` — call wrappers shared by the reporting jobs.
//!
//! - [`lazy`]: per-instance values computed on first access
//! - [`timing`]: log how long a call took
//! - [`memory`]: log how long a call took and how much heap it used
//! - [`retry`]: re-run failing calls with exponential backoff
//!
//! Timing and memory records are written only for calls that return
//! normally; see [`Outcome`].
//!
//! Every wrapper logs through an injected [`LogSink`](sa360_observability::LogSink),
//! defaulting to `tracing`.

pub mod lazy;
pub mod memory;
pub mod naming;
pub mod outcome;
pub mod profiler;
pub mod retry;
pub mod timing;

pub use lazy::{LazyProperty, SyncLazyProperty, memoize};
pub use memory::{MemorySample, Measured, measure_memory, measured, measured_with};
pub use naming::{Invoke, fn_name};
pub use outcome::Outcome;
pub use profiler::{MemoryUsage, TracingAllocator};
pub use retry::{
    AttemptOutcome, FailureKind, Retry, RetryAttempt, RetryOn, RetryReport, RetryState, Retrying,
    Sleeper, ThreadSleeper, retry,
};
pub use timing::{Timed, TimingSample, time_it, timed, timed_with};
