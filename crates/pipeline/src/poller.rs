//! Metadata polling for background remote jobs.
//!
//! Modeled as an explicit state machine rather than a loop of sleeps:
//! [`MetadataPoller::poll_once`] is one step, [`MetadataPoller::run`] is
//! the driver. The attempt counter both bounds the loop and grows the
//! inter-poll delay linearly; fetch failures count as attempts and the
//! loop continues — an individual poll failure is never fatal.

use std::time::Duration;

use panelworks_core::types::PanelId;
use panelworks_inference::remote::{MetadataEnvelope, RemoteAnalysis};
use panelworks_inference::wire::PanelMetadata;
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;

/// Classification of a single poll.
#[derive(Debug, Clone)]
pub enum PollStep {
    /// Background processing finished; stored metadata is the result.
    Ready(Box<PanelMetadata>),
    /// Still in flight (or the fetch itself failed) — poll again.
    Pending,
    /// The background job reported a terminal failure.
    Failed(String),
}

/// Terminal result of a polling run.
#[derive(Debug, Clone)]
pub enum PollResult {
    Ready(Box<PanelMetadata>),
    Failed(String),
    /// The attempt cap was reached without completion.
    Exhausted { attempts: u32 },
    Cancelled,
}

/// Bounded, linearly backed-off metadata poller for one panel.
pub struct MetadataPoller {
    config: PollConfig,
    attempt: u32,
}

impl MetadataPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Polls made so far.
    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next poll: `base + attempt * step`.
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(
            self.config.base_delay_ms + u64::from(self.attempt) * self.config.step_ms,
        )
    }

    /// Classify a metadata envelope. Degraded envelopes (fetch failed)
    /// read as "not ready yet".
    pub fn classify(envelope: &MetadataEnvelope) -> PollStep {
        if !envelope.success {
            return PollStep::Pending;
        }
        let Some(metadata) = &envelope.metadata else {
            return PollStep::Pending;
        };
        if let Some(error) = &metadata.error {
            return PollStep::Failed(error.clone());
        }
        if metadata.processing {
            return PollStep::Pending;
        }
        PollStep::Ready(Box::new(metadata.clone()))
    }

    /// One step: fetch metadata, bump the counter, classify.
    pub async fn poll_once(
        &mut self,
        remote: &dyn RemoteAnalysis,
        panel_id: PanelId,
    ) -> PollStep {
        let envelope = remote.fetch_metadata(panel_id).await;
        self.attempt += 1;
        let step = Self::classify(&envelope);
        tracing::debug!(
            panel_id = %panel_id,
            attempt = self.attempt,
            pending = matches!(step, PollStep::Pending),
            "Polled panel metadata",
        );
        step
    }

    /// Drive polling to a terminal result, respecting cancellation.
    pub async fn run(
        mut self,
        remote: &dyn RemoteAnalysis,
        panel_id: PanelId,
        cancel: &CancellationToken,
    ) -> PollResult {
        while self.attempt < self.config.max_attempts {
            let delay = self.next_delay();
            tokio::select! {
                _ = cancel.cancelled() => return PollResult::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.poll_once(remote, panel_id).await {
                PollStep::Ready(metadata) => return PollResult::Ready(metadata),
                PollStep::Failed(message) => return PollResult::Failed(message),
                PollStep::Pending => {}
            }
        }

        tracing::warn!(
            panel_id = %panel_id,
            attempts = self.attempt,
            "Background analysis never completed; giving up",
        );
        PollResult::Exhausted {
            attempts: self.attempt,
        }
    }
}
