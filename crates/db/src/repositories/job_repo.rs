//! Repository for the `panel_jobs` table.
//!
//! Uses `JobStatus` from `panelworks_core::status` for all transitions.
//! No magic numbers — every status literal is a named constant. Callers
//! that must not fail on storage errors go through
//! [`crate::ledger::JobLedger`] instead of calling this directly.

use panelworks_core::status::JobStatus;
use panelworks_core::types::{DbId, PanelId};
use sqlx::PgPool;

use crate::models::job::PanelJob;

/// Column list for `panel_jobs` queries.
const COLUMNS: &str = "\
    id, panel_id, job_type, status_id, attempt_count, \
    started_at, completed_at, error_message, metadata, \
    created_at, updated_at";

/// Provides CRUD operations for panel processing jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new queued job for a panel. One row per top-level
    /// processing call; retries reuse the row via [`set_attempt_count`].
    ///
    /// [`set_attempt_count`]: Self::set_attempt_count
    pub async fn create(
        pool: &PgPool,
        panel_id: PanelId,
        job_type: &str,
        metadata: &serde_json::Value,
    ) -> Result<PanelJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO panel_jobs (panel_id, job_type, status_id, started_at, metadata) \
             VALUES ($1, $2, $3, NOW(), $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PanelJob>(&query)
            .bind(panel_id)
            .bind(job_type)
            .bind(JobStatus::Queued.id())
            .bind(metadata)
            .fetch_one(pool)
            .await
    }

    /// Move a job into the `processing` state.
    pub async fn mark_processing(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE panel_jobs SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(job_id)
            .bind(JobStatus::Processing.id())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record the attempt count before an attempt goes out.
    pub async fn set_attempt_count(
        pool: &PgPool,
        job_id: DbId,
        attempt_count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE panel_jobs SET attempt_count = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(attempt_count)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job as done with its result snapshot. Stamps `completed_at`.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        metadata: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE panel_jobs \
             SET status_id = $2, metadata = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Done.id())
        .bind(metadata)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job as failed with an error message. Stamps `completed_at`.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE panel_jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Error.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PanelJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM panel_jobs WHERE id = $1");
        sqlx::query_as::<_, PanelJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all jobs for a panel, newest first by start time.
    pub async fn list_by_panel(
        pool: &PgPool,
        panel_id: PanelId,
    ) -> Result<Vec<PanelJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM panel_jobs \
             WHERE panel_id = $1 \
             ORDER BY started_at DESC"
        );
        sqlx::query_as::<_, PanelJob>(&query)
            .bind(panel_id)
            .fetch_all(pool)
            .await
    }
}
