//! Audit entity for locally produced predictions.

use panelworks_core::types::{DbId, PanelId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `panel_predictions` table.
///
/// Written best-effort after a successful local inference so results can
/// be audited and reused; never read on the processing critical path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PanelPrediction {
    pub id: DbId,
    pub panel_id: PanelId,
    /// Name of the provider that produced the labels.
    pub provider: String,
    /// SHA-256 hex digest of the image bytes that were analyzed.
    pub image_digest: String,
    pub labels: serde_json::Value,
    pub created_at: Timestamp,
}
