//! # larder
//!
//! Operational entry point for the Larder database workflow:
//! - `migrate` — apply a SQL script to the production database
//! - `start` / `refresh` — run and reset the local CockroachDB compose stack
//! - `wait` — poll any dependency until it is ready
//! - `verify` — check a session against the auth endpoint
//!
//! Library crates return structured outcomes; this binary owns logging setup
//! and the mapping to process exit codes.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use larder_common::config::AppConfig;
use larder_common::error::LarderError;
use larder_db::{ComposeStack, MigrationRunner, Orchestrator, PgProbe, StartReport};
use larder_guard::VerifyClient;
use larder_wait::{
    AttemptFailure, CommandProbe, FailureKind, JsonFlagProbe, Probe, WaitOutcome, WaitPolicy, wait,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command, WaitTarget};

const DEFAULT_LOG_FILTER: &str = "larder=info,larder_common=info,larder_db=info,larder_wait=info,larder_guard=info";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = larder_common::config::init()?;

    // Initialize tracing (structured logging)
    init_tracing(cli.log.as_deref(), cli.json_logs);

    // Ctrl-C cancels any wait in progress
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping...");
                cancel.cancel();
            }
        }
    });

    match run(cli.command, config, &cancel).await {
        Ok(code) => Ok(code),
        Err(e) => {
            let code = e
                .downcast_ref::<LarderError>()
                .map_or(1, LarderError::exit_code);
            tracing::error!("{e:#}");
            Ok(ExitCode::from(code))
        }
    }
}

fn init_tracing(filter: Option<&str>, json: bool) {
    let filter = match filter {
        Some(directives) => tracing_subscriber::EnvFilter::new(directives),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(
    command: Command,
    config: &AppConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::Migrate { file, database_url } => {
            let runner = match database_url {
                Some(url) => MigrationRunner::new(url),
                None => MigrationRunner::from_config(&config.database)?,
            };
            let file = file.unwrap_or_else(|| config.database.migration_file.clone());
            runner.run(&file).await.map_err(|e| {
                anyhow::Error::new(e).context(format!("Migration failed ({})", file.display()))
            })?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Start(args) => {
            let policy = with_progress_log(args.policy(&config.wait));
            let stack = compose_stack(config);
            match larder_db::start(&stack, &policy, cancel).await {
                Ok(StartReport::AlreadyRunning | StartReport::Started) => Ok(ExitCode::SUCCESS),
                Err(e) => Err(explain_not_ready(e, &policy)),
            }
        }

        Command::Refresh(args) => {
            let policy = with_progress_log(args.policy(&config.wait));
            let stack = compose_stack(config);
            larder_db::refresh(&stack, &policy, cancel)
                .await
                .map_err(|e| explain_not_ready(e, &policy))?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Wait {
            policy,
            target,
            field,
        } => {
            let policy = with_progress_log(policy.policy(&config.wait));
            let probe = build_probe(target, field, config)?;
            tracing::info!(probe = %probe.describe(), "Waiting for dependency...");

            let outcome = wait(probe.as_ref(), &policy, cancel).await;
            match outcome {
                WaitOutcome::Ready => tracing::info!("Dependency is ready!"),
                WaitOutcome::TimedOut { .. } => tracing::error!(
                    "Dependency was not ready within {}",
                    budget(&policy)
                ),
                WaitOutcome::Aborted { reason } => tracing::error!("Wait aborted: {reason}"),
            }
            Ok(ExitCode::from(outcome.exit_code()))
        }

        Command::Verify { cookie } => {
            let client = VerifyClient::from_config(&config.auth)?;
            if client.verify(cookie.as_deref()).await? {
                tracing::info!("Session is authenticated");
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::warn!(login = %config.auth.login_path, "Session is not authenticated");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn compose_stack(config: &AppConfig) -> ComposeStack {
    ComposeStack::from_config(&config.compose).probe_timeout(config.wait.probe_timeout())
}

fn build_probe(
    target: WaitTarget,
    field: String,
    config: &AppConfig,
) -> anyhow::Result<Box<dyn Probe>> {
    let timeout = config.wait.probe_timeout();
    let probe: Box<dyn Probe> = if target.compose {
        compose_stack(config).readiness_probe()
    } else if let Some(url) = target.postgres {
        Box::new(PgProbe::new(url).timeout(timeout))
    } else if let Some(url) = target.http {
        Box::new(JsonFlagProbe::new(reqwest::Client::new(), url, field).timeout(timeout))
    } else if let Some(mut argv) = target.exec {
        anyhow::ensure!(!argv.is_empty(), "--exec needs a command");
        let program = argv.remove(0);
        Box::new(CommandProbe::new(program).args(argv).timeout(timeout))
    } else {
        anyhow::bail!("no wait target given");
    };
    Ok(probe)
}

fn with_progress_log(policy: WaitPolicy) -> WaitPolicy {
    policy.on_attempt_failure(|failure: &AttemptFailure| match failure.kind {
        FailureKind::Failure => tracing::info!(
            "Not ready yet ({}/{}): {}",
            failure.attempt,
            failure.max_attempts,
            failure.reason
        ),
        FailureKind::Error => tracing::warn!(
            "Probe error ({}/{}): {}",
            failure.attempt,
            failure.max_attempts,
            failure.reason
        ),
    })
}

/// Wall-clock budget of a policy, e.g. "30 seconds".
fn budget(policy: &WaitPolicy) -> String {
    let total = policy.interval() * policy.max_attempts();
    format!("{} seconds", total.as_secs())
}

fn explain_not_ready(e: LarderError, policy: &WaitPolicy) -> anyhow::Error {
    match e {
        LarderError::NotReady(WaitOutcome::TimedOut { .. }) => {
            let message = format!("Database failed to start within {}", budget(policy));
            anyhow::Error::new(e).context(message)
        }
        other => other.into(),
    }
}
