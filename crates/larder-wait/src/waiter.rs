//! The polling loop.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::outcome::{AbortReason, WaitOutcome};
use crate::policy::{AttemptFailure, FailureKind, WaitPolicy};
use crate::probe::{Probe, ProbeError, ProbeStatus};

/// Poll `probe` until it reports ready, `policy` runs out of attempts, or
/// `cancel` fires.
///
/// - At most one probe call is in flight; calls are spaced by
///   `policy.interval()` and there is no sleep after the final attempt.
/// - Probe errors and panics count as ordinary failed attempts.
/// - Cancellation is checked before every attempt and cuts short the
///   inter-attempt sleep. A probe call already running is not interrupted.
///
/// Nothing here prints, but a caught panic still passes through the process
/// panic hook first, which by default writes the message to stderr. Callers
/// that own the terminal can route it elsewhere with [`std::panic::set_hook`].
pub async fn wait<P>(probe: &P, policy: &WaitPolicy, cancel: &CancellationToken) -> WaitOutcome
where
    P: Probe + ?Sized,
{
    if !policy.is_valid() {
        tracing::warn!(max_attempts = policy.max_attempts(), "refusing to wait with invalid policy");
        return WaitOutcome::Aborted {
            reason: AbortReason::InvalidPolicy,
        };
    }

    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    while attempt < max_attempts && !cancel.is_cancelled() {
        attempt += 1;

        let failure = match run_probe(probe).await {
            Ok(ProbeStatus::Ready) => {
                tracing::debug!(attempt, max_attempts, probe = %probe.describe(), "probe ready");
                return WaitOutcome::Ready;
            }
            Ok(ProbeStatus::NotReady(reason)) => AttemptFailure {
                attempt,
                max_attempts,
                kind: FailureKind::Failure,
                reason,
            },
            Err(e) => AttemptFailure {
                attempt,
                max_attempts,
                kind: FailureKind::Error,
                reason: e.to_string(),
            },
        };

        tracing::debug!(
            attempt,
            max_attempts,
            kind = ?failure.kind,
            reason = %failure.reason,
            "probe not ready"
        );
        notify(policy, &failure);

        if attempt == max_attempts {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(policy.interval()) => {}
        }
    }

    // Cancellation can only break out while attempts remain.
    if attempt == max_attempts {
        WaitOutcome::TimedOut {
            attempts_made: attempt,
        }
    } else {
        tracing::debug!(attempt, "wait cancelled");
        WaitOutcome::Aborted {
            reason: AbortReason::Cancelled,
        }
    }
}

async fn run_probe<P: Probe + ?Sized>(probe: &P) -> Result<ProbeStatus, ProbeError> {
    match AssertUnwindSafe(probe.check()).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(ProbeError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn notify(policy: &WaitPolicy, failure: &AttemptFailure) {
    let Some(observer) = policy.observer() else {
        return;
    };
    if std::panic::catch_unwind(AssertUnwindSafe(|| observer(failure))).is_err() {
        tracing::warn!(attempt = failure.attempt, "attempt-failure observer panicked");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
