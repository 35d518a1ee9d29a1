//! Best-effort job ledger client.
//!
//! The ledger is observability bookkeeping for panel processing. Its
//! writes are side-channel: a storage failure must never abort the
//! processing attempt being recorded. [`JobLedger`] therefore swallows
//! every error (logged at `warn`) and signals failure through `Option`/
//! `bool`/empty returns so call sites read as plain orchestration with
//! no defensive error plumbing.

use panelworks_core::status::JobStatus;
use panelworks_core::types::{DbId, PanelId};
use sqlx::PgPool;

use crate::models::job::PanelJob;
use crate::repositories::JobRepo;

/// Handle to the job ledger. Cheap to clone; shares the pool.
#[derive(Clone)]
pub struct JobLedger {
    pool: PgPool,
}

impl JobLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a queued job record. Returns `None` (not an error) on
    /// storage failure so callers can proceed without tracking.
    pub async fn create_job(
        &self,
        panel_id: PanelId,
        job_type: &str,
        metadata: &serde_json::Value,
    ) -> Option<DbId> {
        match JobRepo::create(&self.pool, panel_id, job_type, metadata).await {
            Ok(job) => Some(job.id),
            Err(e) => {
                tracing::warn!(
                    panel_id = %panel_id,
                    job_type,
                    error = %e,
                    "Failed to create job record; continuing untracked",
                );
                None
            }
        }
    }

    /// Transition a job's status. Terminal transitions stamp the
    /// completion timestamp; an `Error` transition requires a message.
    /// Returns `false` on storage failure or a missing error message.
    pub async fn update_job(
        &self,
        job_id: DbId,
        status: JobStatus,
        error_message: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> bool {
        let result = match status {
            JobStatus::Queued => {
                // Jobs are created queued; there is no transition back.
                tracing::warn!(job_id, "Ignoring explicit transition to queued");
                return false;
            }
            JobStatus::Processing => JobRepo::mark_processing(&self.pool, job_id).await,
            JobStatus::Done => {
                let snapshot = metadata.cloned().unwrap_or(serde_json::Value::Null);
                JobRepo::complete(&self.pool, job_id, &snapshot).await
            }
            JobStatus::Error => {
                let Some(message) = error_message else {
                    tracing::warn!(job_id, "Error transition without a message; dropped");
                    return false;
                };
                JobRepo::fail(&self.pool, job_id, message).await
            }
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    job_id,
                    status = status.as_str(),
                    error = %e,
                    "Failed to update job record",
                );
                false
            }
        }
    }

    /// Record the attempt count before an attempt goes out. Returns
    /// `false` on storage failure.
    pub async fn record_attempt(&self, job_id: DbId, attempt_count: i32) -> bool {
        match JobRepo::set_attempt_count(&self.pool, job_id, attempt_count).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(job_id, attempt_count, error = %e, "Failed to record attempt");
                false
            }
        }
    }

    /// All jobs for a panel, newest first. Empty on storage failure.
    pub async fn jobs_for_panel(&self, panel_id: PanelId) -> Vec<PanelJob> {
        match JobRepo::list_by_panel(&self.pool, panel_id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(panel_id = %panel_id, error = %e, "Failed to list jobs");
                Vec::new()
            }
        }
    }
}
