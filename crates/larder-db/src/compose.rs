//! The local database container stack, driven through `docker compose`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use larder_common::config::ComposeConfig;
use larder_common::error::{LarderError, LarderResult};
use larder_wait::{CommandProbe, Probe};
use tokio::process::Command;

/// What the start/refresh routines need from a container stack.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Whether the database service is up. Any error answers `false`.
    async fn is_running(&self) -> bool;

    /// Bring the stack up in the background.
    async fn up(&self) -> LarderResult<()>;

    /// A probe that succeeds once the database accepts SQL.
    fn readiness_probe(&self) -> Box<dyn Probe>;

    /// Run a SQL file from the container's migration directory.
    async fn apply_sql_file(&self, file_name: &str) -> LarderResult<()>;
}

/// `docker compose` against a single CockroachDB service.
#[derive(Debug, Clone)]
pub struct ComposeStack {
    program: String,
    service: String,
    project_dir: Option<PathBuf>,
    container_migration_dir: String,
    probe_timeout: Option<Duration>,
}

impl ComposeStack {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            program: "docker".to_owned(),
            service: service.into(),
            project_dir: None,
            container_migration_dir: "/migration".to_owned(),
            probe_timeout: None,
        }
    }

    pub fn from_config(config: &ComposeConfig) -> Self {
        Self {
            project_dir: config.project_dir.clone(),
            container_migration_dir: config.container_migration_dir.clone(),
            ..Self::new(config.service.clone())
        }
    }

    /// Replace the `docker` executable (e.g. `podman`).
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// `compose exec -T <service> cockroach sql --insecure --host=localhost <extra>`
    fn sql_args(&self, extra: String) -> Vec<String> {
        vec![
            "compose".to_owned(),
            "exec".to_owned(),
            "-T".to_owned(),
            self.service.clone(),
            "cockroach".to_owned(),
            "sql".to_owned(),
            "--insecure".to_owned(),
            "--host=localhost".to_owned(),
            extra,
        ]
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null());
        if let Some(dir) = &self.project_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn render(&self, args: &[String]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    /// Run to completion with inherited output; non-zero exit is an error.
    async fn run(&self, args: Vec<String>) -> LarderResult<()> {
        let rendered = self.render(&args);
        tracing::debug!(command = %rendered, "running");

        let status = self
            .command(&args)
            .status()
            .await
            .map_err(|source| LarderError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(LarderError::CommandFailed {
                command: rendered,
                status: status.to_string(),
            })
        }
    }
}

#[async_trait]
impl Orchestrator for ComposeStack {
    async fn is_running(&self) -> bool {
        let output = self
            .command(["compose", "ps", "--status", "running"])
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                String::from_utf8_lossy(&out.stdout).contains(&self.service)
            }
            Ok(out) => {
                tracing::debug!(status = %out.status, "compose ps failed; assuming stack is down");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not run compose ps; assuming stack is down");
                false
            }
        }
    }

    async fn up(&self) -> LarderResult<()> {
        self.run(vec!["compose".into(), "up".into(), "-d".into()]).await
    }

    fn readiness_probe(&self) -> Box<dyn Probe> {
        let mut probe = CommandProbe::new(self.program.clone())
            .args(self.sql_args("--execute=SELECT 1".to_owned()));
        if let Some(dir) = &self.project_dir {
            probe = probe.current_dir(dir.clone());
        }
        if let Some(limit) = self.probe_timeout {
            probe = probe.timeout(limit);
        }
        Box::new(probe)
    }

    async fn apply_sql_file(&self, file_name: &str) -> LarderResult<()> {
        let path = format!(
            "{}/{}",
            self.container_migration_dir.trim_end_matches('/'),
            file_name
        );
        self.run(self.sql_args(format!("--file={path}"))).await
    }
}
