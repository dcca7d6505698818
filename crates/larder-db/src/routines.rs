//! Start and reset the local database stack.
//!
//! Both routines only touch the database once the readiness wait reports
//! `Ready`; a timed-out or cancelled wait stops them before any SQL runs.

use larder_common::error::{LarderError, LarderResult};
use larder_wait::{WaitOutcome, WaitPolicy, wait};
use tokio_util::sync::CancellationToken;

use crate::compose::Orchestrator;

/// What [`start`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartReport {
    AlreadyRunning,
    Started,
}

/// Ensure the stack is up and the database accepts SQL.
///
/// A stack that is already running is left alone without probing.
pub async fn start(
    stack: &dyn Orchestrator,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> LarderResult<StartReport> {
    if stack.is_running().await {
        tracing::info!("Docker Compose is already running!");
        return Ok(StartReport::AlreadyRunning);
    }

    tracing::info!("Starting Docker Compose...");
    stack.up().await?;

    wait_ready(stack, policy, cancel).await?;
    Ok(StartReport::Started)
}

/// Bring the stack up if needed, wait for it, then apply `down.sql` and `up.sql`.
pub async fn refresh(
    stack: &dyn Orchestrator,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> LarderResult<()> {
    if !stack.is_running().await {
        tracing::info!("Starting Docker Compose...");
        stack.up().await?;
    }

    wait_ready(stack, policy, cancel).await?;

    tracing::info!("Applying down migrations...");
    stack.apply_sql_file("down.sql").await?;

    tracing::info!("Applying up migrations...");
    stack.apply_sql_file("up.sql").await?;

    tracing::info!("Database refresh complete!");
    Ok(())
}

async fn wait_ready(
    stack: &dyn Orchestrator,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> LarderResult<()> {
    let probe = stack.readiness_probe();
    tracing::info!(probe = %probe.describe(), "Waiting for database to be ready...");

    match wait(probe.as_ref(), policy, cancel).await {
        WaitOutcome::Ready => {
            tracing::info!("Database is ready!");
            Ok(())
        }
        outcome => Err(LarderError::NotReady(outcome)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use larder_wait::{AbortReason, Probe, ProbeStatus, probe_fn};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records every call; the database turns ready on probe call `ready_on`.
    struct FakeStack {
        running: bool,
        ready_on: Option<u32>,
        probes: Arc<AtomicU32>,
        log: Mutex<Vec<String>>,
    }

    impl FakeStack {
        fn new(running: bool, ready_on: Option<u32>) -> Self {
            Self {
                running,
                ready_on,
                probes: Arc::new(AtomicU32::new(0)),
                log: Mutex::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Orchestrator for FakeStack {
        async fn is_running(&self) -> bool {
            self.running
        }

        async fn up(&self) -> LarderResult<()> {
            self.log.lock().unwrap().push("up".into());
            Ok(())
        }

        fn readiness_probe(&self) -> Box<dyn Probe> {
            let probes = self.probes.clone();
            let ready_on = self.ready_on;
            Box::new(probe_fn(move || {
                let n = probes.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    match ready_on {
                        Some(k) if n >= k => Ok(ProbeStatus::Ready),
                        _ => Ok(ProbeStatus::NotReady("connection refused".into())),
                    }
                }
            }))
        }

        async fn apply_sql_file(&self, file_name: &str) -> LarderResult<()> {
            self.log.lock().unwrap().push(format!("apply {file_name}"));
            Ok(())
        }
    }

    fn policy() -> WaitPolicy {
        WaitPolicy::new(30, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_start_skips_running_stack() {
        let stack = FakeStack::new(true, Some(1));
        let report = start(&stack, &policy(), &CancellationToken::new()).await.unwrap();
        assert_eq!(report, StartReport::AlreadyRunning);
        assert!(stack.log().is_empty());
        assert_eq!(stack.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_after_up() {
        let stack = FakeStack::new(false, Some(4));
        let report = start(&stack, &policy(), &CancellationToken::new()).await.unwrap();
        assert_eq!(report, StartReport::Started);
        assert_eq!(stack.log(), vec!["up"]);
        assert_eq!(stack.probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_times_out() {
        let stack = FakeStack::new(false, None);
        let err = start(&stack, &policy(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            LarderError::NotReady(WaitOutcome::TimedOut { attempts_made: 30 })
        ));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_runs_down_then_up_after_ready() {
        let stack = FakeStack::new(false, Some(2));
        refresh(&stack, &policy(), &CancellationToken::new()).await.unwrap();
        assert_eq!(stack.log(), vec!["up", "apply down.sql", "apply up.sql"]);
        assert_eq!(stack.probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_on_running_stack_still_checks_readiness() {
        let stack = FakeStack::new(true, Some(1));
        refresh(&stack, &policy(), &CancellationToken::new()).await.unwrap();
        assert_eq!(stack.log(), vec!["apply down.sql", "apply up.sql"]);
        assert_eq!(stack.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_never_resets_unready_database() {
        let stack = FakeStack::new(false, None);
        let err = refresh(&stack, &WaitPolicy::new(3, Duration::from_secs(1)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LarderError::NotReady(WaitOutcome::TimedOut { attempts_made: 3 })
        ));
        assert_eq!(stack.log(), vec!["up"]);
    }

    #[tokio::test]
    async fn test_cancelled_refresh_applies_nothing() {
        let stack = FakeStack::new(true, Some(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = refresh(&stack, &policy(), &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            LarderError::NotReady(WaitOutcome::Aborted {
                reason: AbortReason::Cancelled
            })
        ));
        assert_eq!(err.exit_code(), 130);
        assert!(stack.log().is_empty());
    }
}
