use crate::types::PanelId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Panel not found: {0}")]
    PanelNotFound(PanelId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
