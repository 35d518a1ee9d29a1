//! Error types for the inference clients.
//!
//! Messages name the failing stage so a panel's terminal error tells
//! the user which part of which path gave out.

use panelworks_core::retry::TimeoutError;
use panelworks_core::types::PanelId;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Panel {0} has no image reference")]
    MissingImage(PanelId),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analysis service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid response from {stage}: {detail}")]
    InvalidResponse {
        stage: &'static str,
        detail: String,
    },

    #[error("Image fetch failed after {attempts} attempts: {detail}")]
    ImageFetch { attempts: u32, detail: String },

    #[error("Provider '{provider}' detection failed: {detail}")]
    Provider { provider: String, detail: String },

    #[error("All local providers failed (primary: {primary}; secondary: {secondary})")]
    LocalExhausted { primary: String, secondary: String },

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl From<TimeoutError> for InferenceError {
    fn from(e: TimeoutError) -> Self {
        Self::Timeout(e.0)
    }
}
