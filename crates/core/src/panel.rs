//! Panel domain model and processing state transitions.
//!
//! A panel's `status` and its `is_processing`/`is_error` convenience
//! flags are only ever changed together, through the transition methods
//! here, so the two views can never disagree.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::annotation::LabelRegion;
use crate::status::PanelStatus;
use crate::types::{PanelId, Timestamp};
use crate::voice::{NarrationFormat, NarrationTone, VoiceType};

/// Which execution path produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// Remote analysis answered synchronously.
    Remote,
    /// Remote recognized the image by content key and served stored labels.
    RemoteCached,
    /// Remote accepted a background job; the result arrived via polling.
    RemotePolled,
    /// Primary client-resident model.
    LocalPrimary,
    /// Secondary client-resident fallback model.
    LocalSecondary,
}

impl AnalysisSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::RemoteCached => "remote_cached",
            Self::RemotePolled => "remote_polled",
            Self::LocalPrimary => "local_primary",
            Self::LocalSecondary => "local_secondary",
        }
    }
}

/// Normalized output of a successful analysis, whichever path produced it.
///
/// The local path fills only `labels` (and what can be derived from
/// them); the remote path also carries the scene-level fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub labels: Vec<LabelRegion>,
    pub content: Option<String>,
    pub scene_type: Option<String>,
    pub character_count: Option<i32>,
    pub mood: Option<String>,
    pub action_level: Option<String>,
    pub processed_at: Option<Timestamp>,
    pub source: AnalysisSource,
    /// Opaque result bag exactly as the provider returned it.
    pub raw: serde_json::Value,
}

impl AnalysisResult {
    /// A labels-only result, as the local path produces.
    pub fn from_labels(labels: Vec<LabelRegion>, source: AnalysisSource) -> Self {
        let character_count = Some(crate::annotation::character_count(&labels));
        Self {
            labels,
            content: None,
            scene_type: None,
            character_count,
            mood: None,
            action_level: None,
            processed_at: Some(Utc::now()),
            source,
            raw: serde_json::Value::Null,
        }
    }
}

/// A storyboard panel as the pipeline sees it.
///
/// Owned by the in-memory store for the duration of a session; the
/// document store's copy is reconciled by the caller, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub id: PanelId,
    /// Opaque image reference: remote URL or embedded data URI.
    pub image_url: Option<String>,
    pub status: PanelStatus,
    /// Mirror of `status == Processing`, kept for the UI.
    pub is_processing: bool,
    /// Mirror of `status == Error`, kept for the UI.
    pub is_error: bool,
    pub error_message: Option<String>,
    /// Learned routing decision: once true, remote attempts are skipped.
    /// Only explicit user action resets it — the pipeline never does.
    pub force_client_processing: bool,
    /// Raw result bag from whichever path last succeeded.
    pub metadata: Option<serde_json::Value>,
    pub content: Option<String>,
    pub scene_type: Option<String>,
    pub character_count: Option<i32>,
    pub mood: Option<String>,
    pub action_level: Option<String>,
    pub debug_overlay: Vec<LabelRegion>,
    pub last_processed_at: Option<Timestamp>,
    pub narration: Option<String>,
    pub narration_tone: Option<NarrationTone>,
    pub narration_format: Option<NarrationFormat>,
    pub audio_url: Option<String>,
    pub voice_type: Option<VoiceType>,
}

impl Panel {
    /// A fresh idle panel around an image reference.
    pub fn new(id: PanelId, image_url: impl Into<String>) -> Self {
        Self {
            id,
            image_url: Some(image_url.into()),
            status: PanelStatus::Idle,
            is_processing: false,
            is_error: false,
            error_message: None,
            force_client_processing: false,
            metadata: None,
            content: None,
            scene_type: None,
            character_count: None,
            mood: None,
            action_level: None,
            debug_overlay: Vec::new(),
            last_processed_at: None,
            narration: None,
            narration_tone: None,
            narration_format: None,
            audio_url: None,
            voice_type: None,
        }
    }

    /// Transition to `Processing`, clearing any previous error.
    pub fn begin_processing(&mut self) {
        self.status = PanelStatus::Processing;
        self.is_processing = true;
        self.is_error = false;
        self.error_message = None;
    }

    /// Transition to `Done`, projecting the analysis into the derived
    /// fields.
    pub fn complete_with(&mut self, result: AnalysisResult) {
        self.status = PanelStatus::Done;
        self.is_processing = false;
        self.is_error = false;
        self.error_message = None;
        self.content = result.content;
        self.scene_type = result.scene_type;
        self.character_count = result.character_count;
        self.mood = result.mood;
        self.action_level = result.action_level;
        self.debug_overlay = result.labels;
        self.last_processed_at = Some(result.processed_at.unwrap_or_else(Utc::now));
        self.metadata = Some(serde_json::json!({
            "source": result.source.as_str(),
            "result": result.raw,
        }));
    }

    /// Transition to `Error` with a user-facing message.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.status = PanelStatus::Error;
        self.is_processing = false;
        self.is_error = true;
        self.error_message = Some(message.into());
    }

    /// Record that this panel required the local fallback. One-way: the
    /// pipeline never clears it.
    pub fn mark_force_client(&mut self) {
        self.force_client_processing = true;
    }

    /// Return to a captured status after a side operation (narration or
    /// audio generation) that borrowed the processing flags.
    pub fn restore_status(&mut self, status: PanelStatus, error_message: Option<String>) {
        self.status = status;
        self.is_processing = status == PanelStatus::Processing;
        self.is_error = status == PanelStatus::Error;
        self.error_message = error_message;
    }

    /// Whether `status` and the convenience flags agree.
    pub fn flags_consistent(&self) -> bool {
        match self.status {
            PanelStatus::Processing => self.is_processing && !self.is_error,
            PanelStatus::Error => !self.is_processing && self.is_error,
            PanelStatus::Idle | PanelStatus::Done => !self.is_processing && !self.is_error,
        }
    }
}
