//! Retry with exponential backoff.
//!
//! A [`Retry`] decides which failures are worth another attempt, how long to
//! wait between attempts and how many attempts to make in total. Every
//! retryable failure is logged as a warning; non-retryable failures go
//! straight back to the caller. When the attempt budget runs out the last
//! error is returned unchanged, never wrapped.
//!
//! ```ignore
//! let fetch = retry(RetryOn::kinds([ApiErrorKind::RateLimited]), 2.0, Duration::from_secs(15))?
//!     .wrap(|report_id: u64| client.run_report(report_id));
//!
//! let result = fetch.call((42,))?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sa360_core::{ConfigResult, RetryPolicy};
use sa360_observability::{LogSink, TracingSink};

use crate::naming::Invoke;

/// Classifies an error into a comparable kind.
pub trait FailureKind {
    type Kind: PartialEq;

    fn kind(&self) -> Self::Kind;
}

/// Which errors are retried.
pub struct RetryOn<E: ?Sized> {
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E: ?Sized> RetryOn<E> {
    /// Retry every error.
    pub fn any() -> Self {
        Self::predicate(|_| true)
    }

    /// Retry errors for which `predicate` returns `true`.
    pub fn predicate<P>(predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Retry errors whose kind is one of `kinds`.
    pub fn kinds<I>(kinds: I) -> Self
    where
        E: FailureKind,
        E::Kind: Send + Sync + 'static,
        I: IntoIterator<Item = E::Kind>,
    {
        let kinds: Vec<E::Kind> = kinds.into_iter().collect();
        Self::predicate(move |error: &E| kinds.contains(&error.kind()))
    }

    pub fn matches(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

impl<E: ?Sized> Clone for RetryOn<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E: ?Sized> fmt::Debug for RetryOn<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryOn(..)")
    }
}

/// Blocks the calling thread between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration);
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        thread::sleep(delay);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, delay: Duration) {
        (**self).sleep(delay);
    }
}

/// Where a retry sequence stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to make (or making) the given 1-based attempt.
    Attempting(u32),
    Succeeded,
    FailedFinal,
}

/// What a single attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable,
    Fatal,
}

impl RetryState {
    /// Next state after an attempt finished with `outcome`.
    ///
    /// Retryable failures move on while `policy` allows another attempt.
    /// Terminal states stay where they are.
    pub fn advance(self, outcome: AttemptOutcome, policy: &RetryPolicy) -> Self {
        match (self, outcome) {
            (RetryState::Attempting(_), AttemptOutcome::Success) => RetryState::Succeeded,
            (RetryState::Attempting(_), AttemptOutcome::Fatal) => RetryState::FailedFinal,
            (RetryState::Attempting(n), AttemptOutcome::Retryable) if policy.should_retry(n) => {
                RetryState::Attempting(n + 1)
            }
            (RetryState::Attempting(_), AttemptOutcome::Retryable) => RetryState::FailedFinal,
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }
}

/// Record of one retryable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt: u32,
    /// The failure, as displayed.
    pub error: String,
    /// Delay slept before the next attempt; `None` on the last attempt.
    pub delay: Option<Duration>,
}

impl fmt::Display for RetryAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delay {
            Some(delay) => write!(
                f,
                "Try {}: \"{}\" - retrying in {} seconds...",
                self.attempt,
                self.error,
                delay.as_secs_f64()
            ),
            None => write!(
                f,
                "Try {}: \"{}\" - giving up after {} attempts",
                self.attempt, self.error, self.attempt
            ),
        }
    }
}

/// Result of a retried call together with its failure history.
#[derive(Debug)]
pub struct RetryReport<T, E> {
    pub result: Result<T, E>,
    pub state: RetryState,
    /// Number of times the callable was invoked.
    pub calls: u32,
    /// One entry per retryable failure, in order.
    pub attempts: Vec<RetryAttempt>,
}

/// Retry policy bound to an error type.
pub struct Retry<E> {
    policy: RetryPolicy,
    on: RetryOn<E>,
    sink: Arc<dyn LogSink>,
    sleeper: Arc<dyn Sleeper>,
}

/// Build a retry wrapper for `on` errors, starting at `delay` and multiplying
/// it by `backoff` after each failure. Three attempts are made by default.
pub fn retry<E>(on: RetryOn<E>, backoff: f64, delay: Duration) -> ConfigResult<Retry<E>> {
    Retry::new(RetryPolicy::new(delay, backoff)?, on)
}

impl<E> Retry<E> {
    pub fn new(policy: RetryPolicy, on: RetryOn<E>) -> ConfigResult<Self> {
        Ok(Self {
            policy: policy.validated()?,
            on,
            sink: Arc::new(TracingSink),
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    /// Override the total number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> ConfigResult<Self> {
        self.policy = self.policy.with_max_attempts(max_attempts).validated()?;
        Ok(self)
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wrap `f` so that every call goes through this policy.
    pub fn wrap<F>(self, f: F) -> Retrying<F, E> {
        Retrying { retry: self, inner: f }
    }

    /// Run `op` under this policy.
    pub fn run<T, F>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: fmt::Display,
    {
        self.run_recorded(op).result
    }

    /// Run `op` and return the full attempt history along with the result.
    pub fn run_recorded<T, F>(&self, mut op: F) -> RetryReport<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: fmt::Display,
    {
        let policy = &self.policy;
        let mut state = RetryState::Attempting(1);
        let mut attempts = Vec::new();
        let mut calls = 0;

        loop {
            let RetryState::Attempting(attempt) = state else {
                unreachable!("loop exits on terminal states");
            };

            calls += 1;
            let error = match op() {
                Ok(value) => {
                    return RetryReport {
                        result: Ok(value),
                        state: state.advance(AttemptOutcome::Success, policy),
                        calls,
                        attempts,
                    };
                }
                Err(error) => error,
            };

            if !self.on.matches(&error) {
                return RetryReport {
                    result: Err(error),
                    state: state.advance(AttemptOutcome::Fatal, policy),
                    calls,
                    attempts,
                };
            }

            state = state.advance(AttemptOutcome::Retryable, policy);
            let delay = policy.delay_for_attempt(attempt);
            let record = RetryAttempt {
                attempt,
                error: error.to_string(),
                delay: (!state.is_terminal()).then_some(delay),
            };
            self.sink.warn(&record.to_string());
            attempts.push(record);

            if state.is_terminal() {
                return RetryReport {
                    result: Err(error),
                    state,
                    calls,
                    attempts,
                };
            }

            self.sleeper.sleep(delay);
        }
    }
}

impl<E> Clone for Retry<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            on: self.on.clone(),
            sink: Arc::clone(&self.sink),
            sleeper: Arc::clone(&self.sleeper),
        }
    }
}

impl<E> fmt::Debug for Retry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry").field("policy", &self.policy).finish()
    }
}

/// A callable wrapped in a [`Retry`].
pub struct Retrying<F, E> {
    retry: Retry<E>,
    inner: F,
}

impl<F, E> Retrying<F, E> {
    /// Invoke the wrapped callable with `args`, retrying as configured.
    ///
    /// The same arguments are passed to every attempt.
    pub fn call<Args, T>(&self, args: Args) -> Result<T, E>
    where
        F: Invoke<Args, Output = Result<T, E>>,
        Args: Clone,
        E: fmt::Display,
    {
        self.retry.run(|| self.inner.invoke(args.clone()))
    }

    pub fn retry(&self) -> &Retry<E> {
        &self.retry
    }
}

impl<F, E> fmt::Debug for Retrying<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying").field("retry", &self.retry).finish()
    }
}
