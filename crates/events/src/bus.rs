//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PipelineEvent`]s. It
//! is designed to be shared via `Arc<EventBus>` across the pipeline; the
//! user-visible failure notifications required after terminal processing
//! errors travel through here.

use chrono::{DateTime, Utc};
use panelworks_core::types::PanelId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// A panel entered processing.
pub const EVENT_PANEL_PROCESSING: &str = "panel.processing";

/// A panel finished processing successfully.
pub const EVENT_PANEL_COMPLETED: &str = "panel.completed";

/// A panel failed terminally; payload carries the user-facing message.
pub const EVENT_PANEL_FAILED: &str = "panel.failed";

/// Batch progress tick; payload carries `percent`.
pub const EVENT_BATCH_PROGRESS: &str = "batch.progress";

/// Batch finished; payload carries the aggregate summary message.
pub const EVENT_BATCH_COMPLETED: &str = "batch.completed";

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// A pipeline lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Dot-separated event name, e.g. [`EVENT_PANEL_FAILED`].
    pub event_type: String,

    /// The panel this event concerns, if any (batch events carry none).
    pub panel_id: Option<PanelId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            panel_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the subject panel to the event.
    pub fn with_panel(mut self, panel_id: PanelId) -> Self {
        self.panel_id = Some(panel_id);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are
    /// dropped and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero active subscribers the event is silently dropped —
    /// processing never depends on anyone listening.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
