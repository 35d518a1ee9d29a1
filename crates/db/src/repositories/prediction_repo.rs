//! Repository for the `panel_predictions` audit table.

use panelworks_core::types::{DbId, PanelId};
use sqlx::PgPool;

/// Provides insert/list operations for local prediction audit records.
pub struct PredictionRepo;

impl PredictionRepo {
    /// Insert an audit record for a successful local prediction.
    pub async fn record(
        pool: &PgPool,
        panel_id: PanelId,
        provider: &str,
        image_digest: &str,
        labels: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO panel_predictions (panel_id, provider, image_digest, labels) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(panel_id)
        .bind(provider)
        .bind(image_digest)
        .bind(labels)
        .fetch_one(pool)
        .await
    }

    /// Best-effort variant of [`record`](Self::record): logs and swallows
    /// storage failures so the inference path never aborts on audit
    /// bookkeeping.
    pub async fn record_best_effort(
        pool: &PgPool,
        panel_id: PanelId,
        provider: &str,
        image_digest: &str,
        labels: &serde_json::Value,
    ) -> bool {
        match Self::record(pool, panel_id, provider, image_digest, labels).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    panel_id = %panel_id,
                    provider,
                    error = %e,
                    "Failed to persist prediction audit record",
                );
                false
            }
        }
    }
}
