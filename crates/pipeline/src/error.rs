//! Pipeline error type.
//!
//! Everything here ends up in a panel's `error_message` and a user
//! notification — the orchestrator never lets an error escape uncaught
//! past its own state updates.

use panelworks_core::types::PanelId;
use panelworks_inference::InferenceError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Panel not found: {0}")]
    PanelNotFound(PanelId),

    #[error("Panel {0} is already being processed")]
    AlreadyProcessing(PanelId),

    #[error("Panel {0} has no image to process")]
    MissingImage(PanelId),

    #[error("Panel {0} has no narration to voice")]
    MissingNarration(PanelId),

    #[error("Processing timed out waiting for background analysis ({attempts} polls)")]
    PollTimeout { attempts: u32 },

    #[error("Processing was cancelled")]
    Cancelled,

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
