//! # larder-db
//!
//! The database side of the Larder workflow:
//! - **PostgreSQL** — applying a migration script to production, connection probes
//! - **Compose** — the local CockroachDB container stack (start, readiness, reset)

pub mod compose;
pub mod migrate;
pub mod postgres;
pub mod routines;

pub use compose::{ComposeStack, Orchestrator};
pub use migrate::MigrationRunner;
pub use postgres::PgProbe;
pub use routines::{StartReport, refresh, start};
