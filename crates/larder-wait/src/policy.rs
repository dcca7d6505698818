//! Retry count and spacing for a wait, plus the optional failure observer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Whether a failed attempt was a well-formed "not yet" or an exceptional failure.
///
/// Both are retried the same way; the distinction only reaches observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The probe ran and reported the dependency as not ready.
    Failure,
    /// The probe itself failed (spawn error, transport error, timeout, panic).
    Error,
}

/// What an observer is told about a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
    pub kind: FailureKind,
    pub reason: String,
}

type Observer = Arc<dyn Fn(&AttemptFailure) + Send + Sync>;

/// Immutable wait configuration.
#[derive(Clone)]
pub struct WaitPolicy {
    max_attempts: u32,
    interval: Duration,
    on_attempt_failure: Option<Observer>,
}

impl WaitPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            on_attempt_failure: None,
        }
    }

    /// Attach an observer called once per failed attempt, for logging.
    ///
    /// A panic inside the observer is caught and does not stop the wait.
    pub fn on_attempt_failure<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AttemptFailure) + Send + Sync + 'static,
    {
        self.on_attempt_failure = Some(Arc::new(observer));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Zero attempts cannot produce a meaningful outcome.
    pub fn is_valid(&self) -> bool {
        self.max_attempts > 0
    }

    pub(crate) fn observer(&self) -> Option<&Observer> {
        self.on_attempt_failure.as_ref()
    }
}

impl Default for WaitPolicy {
    /// 30 attempts one second apart.
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}

impl fmt::Debug for WaitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .field("on_attempt_failure", &self.on_attempt_failure.is_some())
            .finish()
    }
}
