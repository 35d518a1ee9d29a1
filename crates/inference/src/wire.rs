//! Wire formats for the analysis service and model runtimes.
//!
//! Provider boxes arrive as `[x1, y1, x2, y2]`; the conversion to the
//! internal `{x, y, width, height}` form happens in
//! [`AnalysisPayload::into_result`] and
//! [`labels_to_regions`] — nowhere else.

use panelworks_core::annotation::{self, region_from_bbox, LabelRegion};
use panelworks_core::panel::{AnalysisResult, AnalysisSource};
use panelworks_core::types::{DbId, PanelId, Timestamp};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Remote analysis
// ---------------------------------------------------------------------------

/// Request body for the hosted panel-analysis endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub panel_id: PanelId,
    pub image_url: String,
    /// 0-indexed attempt number, for server-side dedup and logs.
    pub attempt: u32,
    pub job_id: Option<DbId>,
}

/// A detected label in provider form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLabel {
    /// `[x1, y1, x2, y2]` corner pair.
    pub bbox: [f32; 4],
    pub label: String,
    pub confidence: f32,
}

/// Scene-level analysis fields as the hosted service returns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    pub content: Option<String>,
    pub scene_type: Option<String>,
    pub character_count: Option<i32>,
    pub mood: Option<String>,
    pub action_level: Option<String>,
    pub processed_at: Option<Timestamp>,
}

/// Response from the hosted analysis endpoint.
///
/// Exactly one of two shapes: a synchronous `result`, or a background
/// acceptance (`processing = true` plus the content key the result will
/// be stored under).
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub result: Option<AnalysisPayload>,
    #[serde(default)]
    pub processing: bool,
    #[serde(default)]
    pub cached: bool,
    pub cache_key: Option<u32>,
}

// ---------------------------------------------------------------------------
// Remote metadata fetch
// ---------------------------------------------------------------------------

/// Stored per-panel metadata as the hosted service reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelMetadata {
    /// True while a background job for this panel is still in flight.
    #[serde(default)]
    pub processing: bool,
    /// Terminal failure reported by the background job.
    pub error: Option<String>,
    /// Rolling content key of the image the stored analysis belongs to.
    pub image_hash: Option<u32>,
    #[serde(flatten)]
    pub analysis: AnalysisPayload,
}

/// `data` member of the metadata fetch response.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataData {
    pub metadata: Option<PanelMetadata>,
    #[serde(rename = "latestJob")]
    pub latest_job: Option<serde_json::Value>,
}

/// Response from the hosted metadata endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataResponse {
    pub success: bool,
    pub data: Option<MetadataData>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Local model runtime
// ---------------------------------------------------------------------------

/// Model invocation parameters for the client-resident runtimes.
#[derive(Debug, Clone, Serialize)]
pub struct ModelParams {
    pub model_name: String,
    pub iou_threshold: f32,
    pub score_threshold: f32,
    pub allow_dynamic: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model_name: "panel-detect-v2".to_string(),
            iou_threshold: 0.45,
            score_threshold: 0.25,
            allow_dynamic: true,
        }
    }
}

/// Response from a local detection runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub annotations: Vec<WireLabel>,
}

// ---------------------------------------------------------------------------
// Narration / audio generation
// ---------------------------------------------------------------------------

/// Request body for narration generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    pub image_data: String,
    pub tone: panelworks_core::voice::NarrationTone,
    pub format: panelworks_core::voice::NarrationFormat,
}

/// Response body for narration generation.
#[derive(Debug, Clone, Deserialize)]
pub struct NarrationResponse {
    pub success: bool,
    pub narration: Option<String>,
    pub error: Option<String>,
}

/// Request body for audio synthesis.
#[derive(Debug, Clone, Serialize)]
pub struct AudioRequest {
    pub text: String,
    pub voice: panelworks_core::voice::VoiceType,
}

/// Response body for audio synthesis.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResponse {
    pub success: bool,
    pub audio_url: Option<String>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Convert provider labels to internal regions, dropping malformed boxes.
///
/// `bounds` is the analyzed image's (width, height) when known.
pub fn labels_to_regions(labels: &[WireLabel], bounds: Option<(u32, u32)>) -> Vec<LabelRegion> {
    let mut regions = Vec::with_capacity(labels.len());
    let mut dropped = 0usize;
    for wire in labels {
        match region_from_bbox(wire.label.clone(), wire.confidence, wire.bbox, bounds) {
            Some(region) => regions.push(region),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, "Dropped malformed label boxes at ingestion");
    }
    regions
}

impl AnalysisPayload {
    /// Normalize the payload into the internal [`AnalysisResult`] form.
    pub fn into_result(self, source: AnalysisSource) -> AnalysisResult {
        let raw = serde_json::to_value(&self).unwrap_or(serde_json::Value::Null);
        let labels = labels_to_regions(&self.labels, None);
        let character_count = self
            .character_count
            .or_else(|| Some(annotation::character_count(&labels)));
        AnalysisResult {
            labels,
            content: self.content,
            scene_type: self.scene_type,
            character_count,
            mood: self.mood,
            action_level: self.action_level,
            processed_at: self.processed_at,
            source,
            raw,
        }
    }
}
