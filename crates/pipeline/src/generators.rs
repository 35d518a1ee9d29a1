//! Narration and audio generation flows.
//!
//! An order of magnitude simpler than panel processing: one network
//! call, no retry, no polling. What they share with the orchestrator is
//! the state-update pattern — claim the panel, flip it to processing,
//! write the result or the error, restore.

use std::sync::Arc;

use panelworks_core::types::PanelId;
use panelworks_core::voice::{NarrationFormat, NarrationTone, VoiceType};
use panelworks_events::bus::{EventBus, PipelineEvent, EVENT_PANEL_FAILED};
use panelworks_inference::generate::GeneratorClient;

use crate::error::PipelineError;
use crate::store::PanelStore;

/// Generate narration text for a panel and record it.
pub async fn generate_narration(
    store: &Arc<PanelStore>,
    events: &EventBus,
    client: &dyn GeneratorClient,
    panel_id: PanelId,
    tone: NarrationTone,
    format: NarrationFormat,
) -> Result<(), PipelineError> {
    let _guard = store.begin(panel_id)?;
    let panel = store
        .get(panel_id)
        .await
        .ok_or(PipelineError::PanelNotFound(panel_id))?;

    let Some(image_data) = panel.image_url.clone() else {
        let error = PipelineError::MissingImage(panel_id);
        fail(store, events, panel_id, &error.to_string()).await;
        return Err(error);
    };

    // Generation borrows the processing flags; the panel's own analysis
    // status is restored afterwards.
    let prior_status = panel.status;
    let prior_error = panel.error_message.clone();
    store.update(panel_id, |p| p.begin_processing()).await;

    match client.narration(&image_data, tone, format).await {
        Ok(text) => {
            tracing::info!(panel_id = %panel_id, tone = tone.as_str(), "Narration generated");
            store
                .update(panel_id, |p| {
                    p.narration = Some(text);
                    p.narration_tone = Some(tone);
                    p.narration_format = Some(format);
                    p.restore_status(prior_status, prior_error);
                })
                .await;
            Ok(())
        }
        Err(error) => {
            fail(store, events, panel_id, &error.to_string()).await;
            Err(error.into())
        }
    }
}

/// Synthesize audio for a panel's narration and record the URL.
pub async fn generate_audio(
    store: &Arc<PanelStore>,
    events: &EventBus,
    client: &dyn GeneratorClient,
    panel_id: PanelId,
    voice: VoiceType,
) -> Result<(), PipelineError> {
    let _guard = store.begin(panel_id)?;
    let panel = store
        .get(panel_id)
        .await
        .ok_or(PipelineError::PanelNotFound(panel_id))?;

    let Some(text) = panel.narration.clone() else {
        let error = PipelineError::MissingNarration(panel_id);
        fail(store, events, panel_id, &error.to_string()).await;
        return Err(error);
    };

    let prior_status = panel.status;
    let prior_error = panel.error_message.clone();
    store.update(panel_id, |p| p.begin_processing()).await;

    match client.audio(&text, voice).await {
        Ok(audio_url) => {
            tracing::info!(panel_id = %panel_id, voice = voice.as_str(), "Audio synthesized");
            store
                .update(panel_id, |p| {
                    p.audio_url = Some(audio_url);
                    p.voice_type = Some(voice);
                    p.restore_status(prior_status, prior_error);
                })
                .await;
            Ok(())
        }
        Err(error) => {
            fail(store, events, panel_id, &error.to_string()).await;
            Err(error.into())
        }
    }
}

async fn fail(store: &Arc<PanelStore>, events: &EventBus, panel_id: PanelId, message: &str) {
    store.update(panel_id, |p| p.fail_with(message)).await;
    events.publish(
        PipelineEvent::new(EVENT_PANEL_FAILED)
            .with_panel(panel_id)
            .with_payload(serde_json::json!({ "message": message })),
    );
    tracing::error!(panel_id = %panel_id, message, "Generation failed");
}
