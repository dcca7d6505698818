//! Terminal results of a readiness wait.

use std::fmt;

/// Why a wait ended without the dependency becoming ready or timing out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The policy could not be run (zero attempts). No probe was invoked.
    InvalidPolicy,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::InvalidPolicy => "invalid policy",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`wait`](crate::wait).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The last probe invocation reported success.
    Ready,
    /// Every allowed attempt was made and none succeeded.
    TimedOut { attempts_made: u32 },
    /// The wait stopped early.
    Aborted { reason: AbortReason },
}

impl WaitOutcome {
    /// Conventional process exit code for embedding CLIs.
    ///
    /// `0` ready, `1` timed out, `2` invalid policy, `130` cancelled (SIGINT).
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Ready => 0,
            Self::TimedOut { .. } => 1,
            Self::Aborted { reason: AbortReason::InvalidPolicy } => 2,
            Self::Aborted { reason: AbortReason::Cancelled } => 130,
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::TimedOut { attempts_made } => {
                write!(f, "timed out after {attempts_made} attempts")
            }
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}
