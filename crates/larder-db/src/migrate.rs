//! Apply a single SQL script to the production database.
//!
//! The script is sent as-is in one round trip (simple query protocol), so it
//! may hold several statements. There is no versioning or bookkeeping table;
//! running the same script twice runs it twice.

use std::path::Path;

use larder_common::config::DatabaseConfig;
use larder_common::error::{LarderError, LarderResult};
use sqlx::Connection;

use crate::postgres;

pub struct MigrationRunner {
    database_url: String,
}

impl MigrationRunner {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Fails with [`LarderError::MissingDatabaseUrl`] when neither
    /// `LARDER_DATABASE__URL` nor `DATABASE_URL` is set.
    pub fn from_config(config: &DatabaseConfig) -> LarderResult<Self> {
        config
            .url
            .as_deref()
            .map(Self::new)
            .ok_or(LarderError::MissingDatabaseUrl)
    }

    /// Read `path`, connect, and execute the whole script.
    pub async fn run(&self, path: &Path) -> LarderResult<()> {
        let sql = read_script(path).await?;

        let mut conn = postgres::connect(&self.database_url).await?;

        tracing::info!(file = %path.display(), "Running migration...");
        sqlx::raw_sql(&sql).execute(&mut conn).await?;
        conn.close().await?;

        tracing::info!("Migration completed successfully!");
        Ok(())
    }
}

/// Read a migration script, rejecting one with nothing but whitespace.
pub async fn read_script(path: &Path) -> LarderResult<String> {
    let sql = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LarderError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

    if sql.trim().is_empty() {
        return Err(LarderError::EmptyMigration(path.to_path_buf()));
    }
    Ok(sql)
}
