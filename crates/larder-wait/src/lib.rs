//! # larder-wait
//!
//! Readiness polling for dependencies that take a while to come up — a
//! database container accepting connections, an HTTP endpoint reporting a flag.
//!
//! The caller supplies a [`Probe`], a [`WaitPolicy`] and a
//! [`CancellationToken`](tokio_util::sync::CancellationToken); [`wait`] polls
//! until the probe succeeds, attempts run out, or the token fires, and returns a
//! [`WaitOutcome`]. The waiter never exits the process or prints anything;
//! mapping outcomes to exit codes is the caller's job.

pub mod outcome;
pub mod policy;
pub mod probe;
pub mod waiter;

pub use outcome::{AbortReason, WaitOutcome};
pub use policy::{AttemptFailure, FailureKind, WaitPolicy};
pub use probe::{CommandProbe, FnProbe, JsonFlagProbe, Probe, ProbeError, ProbeStatus, probe_fn};
pub use waiter::wait;
