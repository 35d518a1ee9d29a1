//! Ledger entity for panel processing jobs.

use panelworks_core::status::StatusId;
use panelworks_core::types::{DbId, PanelId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Job type recorded for top-level panel analysis calls.
pub const JOB_TYPE_PROCESS_PANEL: &str = "process-panel";

/// A row from the `panel_jobs` table.
///
/// One row is created per top-level processing call, not per retry;
/// retries bump `attempt_count` in place.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PanelJob {
    pub id: DbId,
    pub panel_id: PanelId,
    pub job_type: String,
    pub status_id: StatusId,
    pub attempt_count: i32,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    /// Result snapshot from the path that completed the job.
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
