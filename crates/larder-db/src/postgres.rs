//! PostgreSQL connection helpers.

use std::time::Duration;

use async_trait::async_trait;
use larder_wait::{Probe, ProbeError, ProbeStatus};
use sqlx::{Connection, PgConnection};

/// Open a single connection. No pool: every tool here issues a handful of
/// statements and exits.
pub async fn connect(database_url: &str) -> Result<PgConnection, sqlx::Error> {
    PgConnection::connect(database_url).await
}

/// Health check — verify the database answers `SELECT 1`.
pub async fn health_check(conn: &mut PgConnection) -> bool {
    sqlx::query("SELECT 1").execute(conn).await.is_ok()
}

/// Readiness probe that connects fresh on every call and runs [`health_check`].
///
/// A refused or failed connection is an error; a connection that opens but
/// cannot run the query is reported as not ready.
#[derive(Debug, Clone)]
pub struct PgProbe {
    database_url: String,
    timeout: Option<Duration>,
}

impl PgProbe {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn check_once(&self) -> Result<ProbeStatus, ProbeError> {
        let mut conn = connect(&self.database_url)
            .await
            .map_err(|e| ProbeError::Other(format!("connect failed: {e}")))?;
        let healthy = health_check(&mut conn).await;
        // Closing is best effort; the answer is already known.
        let _ = conn.close().await;

        if healthy {
            Ok(ProbeStatus::Ready)
        } else {
            Ok(ProbeStatus::NotReady("SELECT 1 failed".to_owned()))
        }
    }
}

#[async_trait]
impl Probe for PgProbe {
    async fn check(&self) -> Result<ProbeStatus, ProbeError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.check_once())
                .await
                .map_err(|_| ProbeError::Timeout(limit))?,
            None => self.check_once().await,
        }
    }

    fn describe(&self) -> String {
        "postgres SELECT 1".to_owned()
    }
}
