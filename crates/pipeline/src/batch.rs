//! Batch ("process all") execution.
//!
//! Strictly sequential, one panel at a time — the paths below share job
//! and metadata stores, so concurrency is not worth the duplicate-write
//! risk. Panels already done and not in error are skipped and counted
//! as successes rather than reprocessed.

use panelworks_core::status::PanelStatus;
use panelworks_events::bus::{PipelineEvent, EVENT_BATCH_COMPLETED, EVENT_BATCH_PROGRESS};

use crate::orchestrator::PanelOrchestrator;

/// Aggregate result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every panel succeeded (skips included).
    Full { total: usize },
    /// Some panels succeeded.
    Partial { succeeded: usize, total: usize },
    /// No panel succeeded.
    Failed { total: usize },
}

impl BatchOutcome {
    fn from_counts(succeeded: usize, total: usize) -> Self {
        if total == 0 || succeeded == total {
            Self::Full { total }
        } else if succeeded > 0 {
            Self::Partial { succeeded, total }
        } else {
            Self::Failed { total }
        }
    }

    /// User-facing summary message.
    pub fn summary(&self) -> String {
        match self {
            Self::Full { total: 0 } => "no panels to process".to_string(),
            Self::Full { total } => format!("all {total} panels processed"),
            Self::Partial { succeeded, total } => {
                format!("{succeeded} of {total} panels processed")
            }
            Self::Failed { .. } => "panel processing failed".to_string(),
        }
    }
}

impl PanelOrchestrator {
    /// Process every panel in timeline order.
    ///
    /// Progress is reported as `round((completed / total) * 100)` via
    /// [`EVENT_BATCH_PROGRESS`] events; the aggregate summary goes out
    /// as [`EVENT_BATCH_COMPLETED`]. Per-panel failures were already
    /// surfaced individually — the batch only accounts for them.
    pub async fn process_all(&self) -> BatchOutcome {
        let panels = self.store().snapshot().await;
        let total = panels.len();
        let mut completed = 0usize;
        let mut succeeded = 0usize;

        for panel in panels {
            let skip = panel.status == PanelStatus::Done && !panel.is_error;
            let ok = if skip {
                tracing::debug!(panel_id = %panel.id, "Panel already done; skipping");
                true
            } else {
                self.process_panel(panel.id).await.is_ok()
            };

            completed += 1;
            if ok {
                succeeded += 1;
            }

            let percent = ((completed as f64 / total as f64) * 100.0).round() as u32;
            self.events().publish(
                PipelineEvent::new(EVENT_BATCH_PROGRESS)
                    .with_payload(serde_json::json!({ "percent": percent })),
            );
        }

        let outcome = BatchOutcome::from_counts(succeeded, total);
        self.events().publish(
            PipelineEvent::new(EVENT_BATCH_COMPLETED)
                .with_payload(serde_json::json!({ "summary": outcome.summary() })),
        );
        tracing::info!(total, succeeded, summary = %outcome.summary(), "Batch finished");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::store::PanelStore;
    use async_trait::async_trait;
    use panelworks_core::annotation::region_from_bbox;
    use panelworks_core::panel::{AnalysisResult, AnalysisSource, Panel};
    use panelworks_core::types::{DbId, PanelId};
    use panelworks_events::bus::EventBus;
    use panelworks_inference::local::LocalAnalysis;
    use panelworks_inference::remote::{MetadataEnvelope, RemoteAnalysis, RemoteOutcome};
    use panelworks_inference::InferenceError;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    /// Local path that succeeds or fails per panel ID.
    struct PerPanelLocal {
        failing: Mutex<HashSet<PanelId>>,
    }

    #[async_trait]
    impl LocalAnalysis for PerPanelLocal {
        async fn process(&self, panel: &Panel) -> Result<AnalysisResult, InferenceError> {
            if self.failing.lock().unwrap().contains(&panel.id) {
                Err(InferenceError::ImageFetch {
                    attempts: 3,
                    detail: "cdn hiccup".into(),
                })
            } else {
                let region = region_from_bbox("person", 0.9, [0.0, 0.0, 1.0, 1.0], None).unwrap();
                Ok(AnalysisResult::from_labels(
                    vec![region],
                    AnalysisSource::LocalPrimary,
                ))
            }
        }
    }

    /// Remote path that always fails, forcing local-only outcomes.
    struct DeadRemote;

    #[async_trait]
    impl RemoteAnalysis for DeadRemote {
        async fn process(
            &self,
            _panel_id: PanelId,
            _image_url: &str,
        ) -> Result<RemoteOutcome, InferenceError> {
            Err(InferenceError::Api {
                status: 503,
                body: "unavailable".into(),
            })
        }

        async fn fetch_metadata(&self, _panel_id: PanelId) -> MetadataEnvelope {
            MetadataEnvelope::degraded("unavailable")
        }

        async fn complete_job(&self, _job_id: DbId, _snapshot: &serde_json::Value) {}

        async fn fail_job(&self, _job_id: DbId, _message: &str) {}
    }

    fn done_panel(url: &str) -> Panel {
        let mut panel = Panel::new(Uuid::new_v4(), url);
        panel.begin_processing();
        let region = region_from_bbox("person", 0.9, [0.0, 0.0, 1.0, 1.0], None).unwrap();
        panel.complete_with(AnalysisResult::from_labels(
            vec![region],
            AnalysisSource::Remote,
        ));
        panel
    }

    async fn harness(panels: Vec<Panel>, failing: HashSet<PanelId>) -> PanelOrchestrator {
        let store = PanelStore::new();
        store.replace_all(panels).await;
        PanelOrchestrator::new(
            store,
            Arc::new(DeadRemote),
            Arc::new(PerPanelLocal {
                failing: Mutex::new(failing),
            }),
            Arc::new(EventBus::default()),
            PipelineConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn two_done_two_fresh_one_failing_reports_four_of_five() {
        let fresh_a = Panel::new(Uuid::new_v4(), "https://cdn/a.png");
        let fresh_b = Panel::new(Uuid::new_v4(), "https://cdn/b.png");
        let failing = Panel::new(Uuid::new_v4(), "https://cdn/c.png");
        let failing_ids = HashSet::from([failing.id]);
        let panels = vec![
            done_panel("https://cdn/d1.png"),
            done_panel("https://cdn/d2.png"),
            fresh_a,
            fresh_b,
            failing,
        ];
        let orchestrator = harness(panels, failing_ids).await;

        let outcome = orchestrator.process_all().await;

        assert_eq!(
            outcome,
            BatchOutcome::Partial {
                succeeded: 4,
                total: 5
            }
        );
        assert_eq!(outcome.summary(), "4 of 5 panels processed");
    }

    #[tokio::test(start_paused = true)]
    async fn all_panels_succeeding_is_a_full_batch() {
        let panels = vec![
            Panel::new(Uuid::new_v4(), "https://cdn/a.png"),
            done_panel("https://cdn/b.png"),
            Panel::new(Uuid::new_v4(), "https://cdn/c.png"),
        ];
        let orchestrator = harness(panels, HashSet::new()).await;

        let outcome = orchestrator.process_all().await;

        assert_eq!(outcome, BatchOutcome::Full { total: 3 });
        assert_eq!(outcome.summary(), "all 3 panels processed");
    }

    #[tokio::test(start_paused = true)]
    async fn every_panel_failing_is_a_failed_batch() {
        let a = Panel::new(Uuid::new_v4(), "https://cdn/a.png");
        let b = Panel::new(Uuid::new_v4(), "https://cdn/b.png");
        let failing = HashSet::from([a.id, b.id]);
        let orchestrator = harness(vec![a, b], failing).await;

        let outcome = orchestrator.process_all().await;

        assert_eq!(outcome, BatchOutcome::Failed { total: 2 });
        assert_eq!(outcome.summary(), "panel processing failed");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_store_is_a_trivial_full_batch() {
        let orchestrator = harness(vec![], HashSet::new()).await;
        let outcome = orchestrator.process_all().await;
        assert_eq!(outcome, BatchOutcome::Full { total: 0 });
        assert_eq!(outcome.summary(), "no panels to process");
    }

    #[tokio::test(start_paused = true)]
    async fn progress_events_step_in_rounded_percent() {
        let panels = vec![
            Panel::new(Uuid::new_v4(), "https://cdn/a.png"),
            Panel::new(Uuid::new_v4(), "https://cdn/b.png"),
            Panel::new(Uuid::new_v4(), "https://cdn/c.png"),
        ];
        let orchestrator = harness(panels, HashSet::new()).await;
        let mut rx = orchestrator.events().subscribe();

        orchestrator.process_all().await;

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.event_type == EVENT_BATCH_PROGRESS {
                percents.push(event.payload["percent"].as_u64().unwrap());
            }
        }
        assert_eq!(percents, vec![33, 67, 100]);
    }

    #[test]
    fn summary_messages() {
        assert_eq!(
            BatchOutcome::Full { total: 5 }.summary(),
            "all 5 panels processed"
        );
        assert_eq!(
            BatchOutcome::Partial {
                succeeded: 4,
                total: 5
            }
            .summary(),
            "4 of 5 panels processed"
        );
        assert_eq!(
            BatchOutcome::Failed { total: 5 }.summary(),
            "panel processing failed"
        );
    }
}
