//! Panel processing orchestrator.
//!
//! One top-level state machine per panel:
//! `idle → processing → {done | error}`, with the remote leg passing
//! through `submitted → polling` while a background job is in flight.
//!
//! Routing rules, in order:
//! 1. No image reference: fail fast, nothing is invoked.
//! 2. `force_client_processing`: local only; its error propagates
//!    untouched — this is an already-degraded mode with nowhere left to
//!    fall.
//! 3. `prefer_client_side` (default): local first, remote on failure.
//! 4. Remote, polling for background jobs.
//! 5. On remote failure, one last local attempt before giving up. When
//!    that rescue succeeds the panel learns `force_client_processing`.
//!
//! Fallback is strictly sequential — the two paths are never raced,
//! because both write to shared job/metadata stores.

use std::sync::Arc;

use panelworks_core::panel::{AnalysisResult, AnalysisSource, Panel};
use panelworks_core::types::PanelId;
use panelworks_events::bus::{
    EventBus, PipelineEvent, EVENT_PANEL_COMPLETED, EVENT_PANEL_FAILED, EVENT_PANEL_PROCESSING,
};
use panelworks_inference::local::LocalAnalysis;
use panelworks_inference::remote::RemoteAnalysis;
use panelworks_inference::InferenceError;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::poller::{MetadataPoller, PollResult};
use crate::store::PanelStore;

/// Why the remote leg gave up.
enum RemoteFailure {
    /// The submission call itself failed after retries.
    Call(InferenceError),
    /// The background job reported a terminal failure.
    JobFailed(String),
    /// Polling hit its attempt cap without completion.
    PollTimeout { attempts: u32 },
    Cancelled,
}

impl RemoteFailure {
    fn message(&self) -> String {
        match self {
            Self::Call(e) => e.to_string(),
            Self::JobFailed(m) => m.clone(),
            Self::PollTimeout { attempts } => {
                format!("background analysis timed out after {attempts} polls")
            }
            Self::Cancelled => "processing was cancelled".to_string(),
        }
    }
}

/// Successful path result plus how it was reached.
struct PathOutcome {
    analysis: AnalysisResult,
    /// True when the local path rescued the panel after a remote
    /// failure — the learned-routing case.
    rescued_by_local: bool,
}

/// Drives panels through the local/remote analysis paths.
pub struct PanelOrchestrator {
    store: Arc<PanelStore>,
    remote: Arc<dyn RemoteAnalysis>,
    local: Arc<dyn LocalAnalysis>,
    events: Arc<EventBus>,
    config: PipelineConfig,
    /// Master cancellation token — cancelled during shutdown.
    cancel: CancellationToken,
}

impl PanelOrchestrator {
    pub fn new(
        store: Arc<PanelStore>,
        remote: Arc<dyn RemoteAnalysis>,
        local: Arc<dyn LocalAnalysis>,
        events: Arc<EventBus>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            remote,
            local,
            events,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &Arc<PanelStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Abort in-flight polling loops. In-flight network calls are
    /// abandoned by their timeouts, not interrupted.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Process one panel to a terminal state.
    ///
    /// On `Err` the panel has already been marked `error` and a
    /// user-visible failure event published — callers never need to
    /// re-handle the failure, only to account for it.
    pub async fn process_panel(&self, panel_id: PanelId) -> Result<(), PipelineError> {
        let _guard = self.store.begin(panel_id)?;
        let panel = self
            .store
            .get(panel_id)
            .await
            .ok_or(PipelineError::PanelNotFound(panel_id))?;

        // Validation failures are fatal and never retried.
        let Some(image_url) = panel.image_url.clone() else {
            let error = PipelineError::MissingImage(panel_id);
            self.fail_panel(panel_id, &error.to_string()).await;
            return Err(error);
        };

        self.store.update(panel_id, |p| p.begin_processing()).await;
        self.events
            .publish(PipelineEvent::new(EVENT_PANEL_PROCESSING).with_panel(panel_id));
        tracing::info!(panel_id = %panel_id, "Panel processing started");

        match self.run_paths(&panel, &image_url).await {
            Ok(outcome) => {
                let source = outcome.analysis.source;
                let label_count = outcome.analysis.labels.len();
                let mut payload = serde_json::json!({
                    "source": source.as_str(),
                    "labels": label_count,
                });
                if self.config.debug_mode {
                    payload["overlay"] = serde_json::to_value(&outcome.analysis.labels)
                        .unwrap_or(serde_json::Value::Null);
                }

                self.store
                    .update(panel_id, |p| {
                        if outcome.rescued_by_local {
                            p.mark_force_client();
                        }
                        p.complete_with(outcome.analysis);
                    })
                    .await;

                self.events.publish(
                    PipelineEvent::new(EVENT_PANEL_COMPLETED)
                        .with_panel(panel_id)
                        .with_payload(payload),
                );
                tracing::info!(
                    panel_id = %panel_id,
                    source = source.as_str(),
                    label_count,
                    "Panel processing completed",
                );
                Ok(())
            }
            Err(error) => {
                self.fail_panel(panel_id, &error.to_string()).await;
                Err(error)
            }
        }
    }

    /// Steps 2–5 of the routing rules; returns the winning analysis.
    async fn run_paths(
        &self,
        panel: &Panel,
        image_url: &str,
    ) -> Result<PathOutcome, PipelineError> {
        if panel.force_client_processing {
            let analysis = self.local.process(panel).await?;
            return Ok(PathOutcome {
                analysis,
                rescued_by_local: false,
            });
        }

        if self.config.prefer_client_side {
            match self.local.process(panel).await {
                Ok(analysis) => {
                    return Ok(PathOutcome {
                        analysis,
                        rescued_by_local: false,
                    })
                }
                Err(error) => {
                    tracing::warn!(
                        panel_id = %panel.id,
                        error = %error,
                        "Local path failed; falling back to remote",
                    );
                }
            }
        }

        match self.run_remote(panel.id, image_url).await {
            Ok(analysis) => Ok(PathOutcome {
                analysis,
                rescued_by_local: false,
            }),
            // Polling exhaustion is terminal: the job may still finish
            // remotely, and a local rerun would shadow its result.
            Err(RemoteFailure::PollTimeout { attempts }) => {
                Err(PipelineError::PollTimeout { attempts })
            }
            Err(RemoteFailure::Cancelled) => Err(PipelineError::Cancelled),
            Err(failure) => {
                tracing::warn!(
                    panel_id = %panel.id,
                    error = %failure.message(),
                    "Remote path failed; retrying local as last resort",
                );
                match self.local.process(panel).await {
                    Ok(analysis) => Ok(PathOutcome {
                        analysis,
                        rescued_by_local: true,
                    }),
                    Err(local_error) => Err(PipelineError::Inference(local_error)),
                }
            }
        }
    }

    /// Remote submission plus the polling sub-state for background jobs.
    async fn run_remote(
        &self,
        panel_id: PanelId,
        image_url: &str,
    ) -> Result<AnalysisResult, RemoteFailure> {
        let outcome = self
            .remote
            .process(panel_id, image_url)
            .await
            .map_err(RemoteFailure::Call)?;

        if let Some(analysis) = outcome.analysis {
            return Ok(analysis);
        }
        if !outcome.processing {
            return Err(RemoteFailure::JobFailed(
                "remote returned neither a result nor a background job".to_string(),
            ));
        }

        tracing::info!(
            panel_id = %panel_id,
            cache_key = ?outcome.cache_key,
            "Remote accepted a background job; polling for completion",
        );

        let poller = MetadataPoller::new(self.config.poll.clone());
        match poller
            .run(self.remote.as_ref(), panel_id, &self.cancel)
            .await
        {
            PollResult::Ready(metadata) => {
                let analysis = metadata.analysis.into_result(AnalysisSource::RemotePolled);
                if let Some(job_id) = outcome.job_id {
                    self.remote.complete_job(job_id, &analysis.raw).await;
                }
                Ok(analysis)
            }
            PollResult::Failed(message) => {
                if let Some(job_id) = outcome.job_id {
                    self.remote.fail_job(job_id, &message).await;
                }
                Err(RemoteFailure::JobFailed(message))
            }
            PollResult::Exhausted { attempts } => {
                if let Some(job_id) = outcome.job_id {
                    self.remote
                        .fail_job(job_id, "background analysis timed out")
                        .await;
                }
                Err(RemoteFailure::PollTimeout { attempts })
            }
            PollResult::Cancelled => Err(RemoteFailure::Cancelled),
        }
    }

    /// Mark a panel failed and publish the user-visible failure signal.
    pub(crate) async fn fail_panel(&self, panel_id: PanelId, message: &str) {
        self.store.update(panel_id, |p| p.fail_with(message)).await;
        self.events.publish(
            PipelineEvent::new(EVENT_PANEL_FAILED)
                .with_panel(panel_id)
                .with_payload(serde_json::json!({ "message": message })),
        );
        tracing::error!(panel_id = %panel_id, message, "Panel processing failed");
    }
}
