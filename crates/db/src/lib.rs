//! Job ledger and prediction audit persistence.
//!
//! The tables here are bookkeeping, not owned state: every write is
//! tolerated to fail by the callers (see [`ledger::JobLedger`]). The
//! panel collection itself lives in the pipeline's in-memory store and
//! is never persisted by this crate.

use sqlx::postgres::PgPoolOptions;

pub mod ledger;
pub mod models;
pub mod repositories;

pub use ledger::JobLedger;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}
