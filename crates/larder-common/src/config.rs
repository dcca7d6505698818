//! Tool configuration loaded from environment variables and config files.
//!
//! Config precedence: env vars > .env file > larder.toml > defaults.
//! `DATABASE_URL` is honored as-is for the production connection string, but
//! only when `LARDER_DATABASE__URL` is unset.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use larder_wait::WaitPolicy;
use serde::Deserialize;

use crate::error::LarderResult;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration from the environment.
///
/// Should be called once at startup, before any other code accesses config.
pub fn init() -> LarderResult<&'static AppConfig> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config = load()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Build a configuration from defaults, `larder.toml` and the environment
/// without touching the global.
pub fn load() -> LarderResult<AppConfig> {
    let cfg = config::Config::builder()
        // Defaults
        .set_default("database.migration_file", "migration/up.sql")?
        .set_default("compose.service", "crdb")?
        .set_default("compose.container_migration_dir", "/migration")?
        .set_default("wait.max_attempts", 30)?
        .set_default("wait.interval_ms", 1000)?
        .set_default("wait.probe_timeout_ms", 5000)?
        .set_default("auth.api_domain", "http://localhost:3000")?
        .set_default("auth.verify_path", "/verify")?
        .set_default("auth.login_path", "/login")?
        // Optional config file
        .add_source(config::File::with_name("larder").required(false))
        // Environment variables (LARDER_DATABASE__URL, LARDER_WAIT__MAX_ATTEMPTS, etc.)
        .add_source(
            config::Environment::with_prefix("LARDER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut app_config: AppConfig = cfg.try_deserialize()?;
    if app_config.database.url.is_none() {
        app_config.database.url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
    }
    Ok(app_config)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub compose: ComposeConfig,
    pub wait: WaitConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL of the production database.
    /// Falls back to `DATABASE_URL` when `LARDER_DATABASE__URL` is unset.
    pub url: Option<String>,
    /// SQL script applied by `larder migrate`.
    pub migration_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ComposeConfig {
    /// Compose service running the local CockroachDB node.
    pub service: String,
    /// Directory holding the compose file; current directory when unset.
    pub project_dir: Option<PathBuf>,
    /// Where `down.sql`/`up.sql` are mounted inside the container.
    pub container_migration_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WaitConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
    /// Upper bound on a single probe call.
    pub probe_timeout_ms: u64,
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Policy without an observer; callers attach their own logging.
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::new(self.max_attempts, self.interval())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Base URL of the backend API (e.g. `https://api.example.com`).
    pub api_domain: String,
    pub verify_path: String,
    /// Where unauthenticated sessions are sent.
    pub login_path: String,
}

impl AuthConfig {
    pub fn verify_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_domain.trim_end_matches('/'),
            self.verify_path.trim_start_matches('/')
        )
    }
}
