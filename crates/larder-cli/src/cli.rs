//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use larder_common::config::WaitConfig;
use larder_wait::WaitPolicy;

#[derive(Debug, Parser)]
#[command(name = "larder", version, about = "Database workflow tooling for Larder")]
pub struct Cli {
    /// Log filter directives (e.g. `larder_wait=debug`); overrides RUST_LOG.
    #[arg(long, global = true, env = "LARDER_LOG")]
    pub log: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply a SQL script to the production database.
    Migrate {
        /// Script to apply [default: database.migration_file, `migration/up.sql`]
        #[arg(long)]
        file: Option<PathBuf>,

        /// Connection string [default: database.url, then `DATABASE_URL`]
        #[arg(long)]
        database_url: Option<String>,
    },

    /// Start the local compose stack and wait for the database.
    Start(WaitArgs),

    /// Reset the local database: wait for it, then apply down.sql and up.sql.
    Refresh(WaitArgs),

    /// Poll a dependency until it is ready.
    Wait {
        #[command(flatten)]
        policy: WaitArgs,

        #[command(flatten)]
        target: WaitTarget,

        /// Boolean JSON field read by `--http`.
        #[arg(long, default_value = "authenticated", requires = "http")]
        field: String,
    },

    /// Ask the auth endpoint whether a session cookie is logged in.
    Verify {
        /// Raw `Cookie` header value, e.g. `token=...; email=...`.
        #[arg(long, env = "LARDER_SESSION_COOKIE", hide_env_values = true)]
        cookie: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct WaitArgs {
    /// Maximum probe attempts [default: wait.max_attempts]
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Delay between attempts in milliseconds [default: wait.interval_ms]
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl WaitArgs {
    /// Command-line values win over configuration.
    pub fn policy(&self, config: &WaitConfig) -> WaitPolicy {
        WaitPolicy::new(
            self.attempts.unwrap_or(config.max_attempts),
            self.interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.interval()),
        )
    }
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct WaitTarget {
    /// The compose database service (`cockroach sql -e 'SELECT 1'`).
    #[arg(long)]
    pub compose: bool,

    /// A PostgreSQL URL answering `SELECT 1`.
    #[arg(long, value_name = "URL")]
    pub postgres: Option<String>,

    /// An HTTP endpoint returning a JSON boolean flag.
    #[arg(long, value_name = "URL")]
    pub http: Option<String>,

    /// A command that exits 0 once the dependency is up. Must come last:
    /// everything after it belongs to the command.
    #[arg(long, value_name = "CMD", num_args = 1.., allow_hyphen_values = true)]
    pub exec: Option<Vec<String>>,
}
