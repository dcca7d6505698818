//! Centralized error type for Larder tooling.
//!
//! Readiness probing never surfaces here: individual probe failures stay inside
//! the waiter and only the aggregate [`WaitOutcome`] is carried by
//! [`LarderError::NotReady`].

use std::path::PathBuf;

use larder_wait::WaitOutcome;

#[derive(Debug, thiserror::Error)]
pub enum LarderError {
    // === Configuration ===
    #[error("DATABASE_URL environment variable is not set")]
    MissingDatabaseUrl,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // === Migration files ===
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration file {} is empty", .0.display())]
    EmptyMigration(PathBuf),

    // === External processes ===
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: String },

    // === Readiness ===
    #[error("Database did not become ready: {0}")]
    NotReady(WaitOutcome),

    // === Infrastructure ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LarderError {
    /// Process exit code for the `larder` binary.
    ///
    /// Readiness failures keep the waiter's own code so a cancelled wait is
    /// distinguishable from a timed-out one.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotReady(outcome) => outcome.exit_code(),
            _ => 1,
        }
    }
}

/// Convenience type alias for Results using LarderError.
pub type LarderResult<T> = Result<T, LarderError>;
