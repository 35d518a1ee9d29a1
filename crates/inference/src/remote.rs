//! Remote panel-analysis client.
//!
//! Wraps the hosted analysis capability in the full call discipline:
//! content-key cache recognition, one ledger job per top-level call,
//! per-attempt bookkeeping, 15 s timeout and 3 attempts with exponential
//! backoff, and graceful degradation of the metadata fetch so polling
//! loops can treat transport failures as "not ready yet".

use std::sync::Arc;

use async_trait::async_trait;
use panelworks_core::hashing::content_key;
use panelworks_core::panel::{AnalysisResult, AnalysisSource};
use panelworks_core::retry::{with_retry, with_timeout, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_MS};
use panelworks_core::status::JobStatus;
use panelworks_core::types::{DbId, PanelId};
use panelworks_db::models::job::JOB_TYPE_PROCESS_PANEL;
use panelworks_db::JobLedger;

use crate::error::InferenceError;
use crate::transport::RemoteTransport;
use crate::wire::{AnalyzeRequest, MetadataResponse, PanelMetadata};

/// Result of one top-level remote processing call.
#[derive(Debug, Clone)]
pub struct RemoteOutcome {
    /// Present when the service answered synchronously (or from cache).
    pub analysis: Option<AnalysisResult>,
    /// True when the service accepted a background job instead; the
    /// result must be retrieved via metadata polling.
    pub processing: bool,
    /// True when the service recognized the image by content key and
    /// served stored labels without re-running the model.
    pub cached: bool,
    /// Content key the result is (or will be) stored under.
    pub cache_key: Option<u32>,
    /// Ledger job for this call, if bookkeeping succeeded.
    pub job_id: Option<DbId>,
}

/// Internal metadata envelope handed to polling loops.
///
/// Never constructed as an error: when every fetch attempt failed the
/// envelope carries `success: false` and the failure text, which polling
/// treats as "not ready yet" rather than crashing.
#[derive(Debug, Clone, Default)]
pub struct MetadataEnvelope {
    pub success: bool,
    pub metadata: Option<PanelMetadata>,
    pub latest_job: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl MetadataEnvelope {
    /// Degraded envelope after exhausting all fetch attempts.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            success: false,
            metadata: None,
            latest_job: None,
            error: Some(error.into()),
        }
    }

    fn from_response(response: MetadataResponse) -> Self {
        let (metadata, latest_job) = match response.data {
            Some(data) => (data.metadata, data.latest_job),
            None => (None, None),
        };
        Self {
            success: response.success,
            metadata,
            latest_job,
            error: response.error,
        }
    }
}

/// The remote execution path as the orchestrator consumes it.
#[async_trait]
pub trait RemoteAnalysis: Send + Sync {
    /// Run one top-level remote processing call for a panel.
    async fn process(
        &self,
        panel_id: PanelId,
        image_url: &str,
    ) -> Result<RemoteOutcome, InferenceError>;

    /// Fetch stored metadata; degrades instead of failing.
    async fn fetch_metadata(&self, panel_id: PanelId) -> MetadataEnvelope;

    /// Close this call's ledger job as done (best-effort).
    async fn complete_job(&self, job_id: DbId, snapshot: &serde_json::Value);

    /// Close this call's ledger job as failed (best-effort).
    async fn fail_job(&self, job_id: DbId, message: &str);
}

/// Remote analysis client over a [`RemoteTransport`].
pub struct RemoteAnalyzer {
    transport: Arc<dyn RemoteTransport>,
    /// `None` runs untracked — every ledger write is best-effort anyway.
    ledger: Option<JobLedger>,
    timeout_ms: u64,
    max_attempts: u32,
}

impl RemoteAnalyzer {
    pub fn new(transport: Arc<dyn RemoteTransport>, ledger: Option<JobLedger>) -> Self {
        Self {
            transport,
            ledger,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the per-request timeout (tests, constrained deployments).
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Override the attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Serve from stored metadata when the service already analyzed this
    /// exact image. Returns `None` on any mismatch — the caller then
    /// proceeds with a fresh submission.
    async fn cached_outcome(&self, panel_id: PanelId, key: u32) -> Option<RemoteOutcome> {
        let envelope = self.fetch_metadata(panel_id).await;
        let metadata = envelope.metadata?;
        if metadata.processing
            || metadata.image_hash != Some(key)
            || metadata.analysis.labels.is_empty()
        {
            return None;
        }
        tracing::debug!(panel_id = %panel_id, cache_key = key, "Remote cache hit");
        Some(RemoteOutcome {
            analysis: Some(metadata.analysis.into_result(AnalysisSource::RemoteCached)),
            processing: false,
            cached: true,
            cache_key: Some(key),
            job_id: None,
        })
    }
}

#[async_trait]
impl RemoteAnalysis for RemoteAnalyzer {
    async fn process(
        &self,
        panel_id: PanelId,
        image_url: &str,
    ) -> Result<RemoteOutcome, InferenceError> {
        let key = content_key(image_url);

        // Cache recognition never creates a job.
        if let Some(outcome) = self.cached_outcome(panel_id, key).await {
            return Ok(outcome);
        }

        let job_id = match &self.ledger {
            Some(ledger) => {
                ledger
                    .create_job(
                        panel_id,
                        JOB_TYPE_PROCESS_PANEL,
                        &serde_json::json!({ "image_hash": key }),
                    )
                    .await
            }
            None => None,
        };

        let attempt_result = with_retry(
            |attempt| {
                let transport = Arc::clone(&self.transport);
                let ledger = self.ledger.clone();
                let request = AnalyzeRequest {
                    panel_id,
                    image_url: image_url.to_string(),
                    attempt,
                    job_id,
                };
                let timeout_ms = self.timeout_ms;
                async move {
                    if let (Some(ledger), Some(job_id)) = (&ledger, job_id) {
                        ledger.record_attempt(job_id, attempt as i32 + 1).await;
                        if attempt == 0 {
                            ledger.update_job(job_id, JobStatus::Processing, None, None).await;
                        }
                    }
                    match with_timeout(
                        async move { transport.analyze(&request).await },
                        timeout_ms,
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(timeout) => Err(InferenceError::from(timeout)),
                    }
                }
            },
            self.max_attempts,
        )
        .await;

        let response = match attempt_result {
            Ok(response) => response,
            Err(e) => {
                if let Some(job_id) = job_id {
                    self.fail_job(job_id, &e.to_string()).await;
                }
                return Err(e);
            }
        };

        if response.processing {
            // Background acceptance: the job stays open until polling
            // resolves it.
            return Ok(RemoteOutcome {
                analysis: None,
                processing: true,
                cached: false,
                cache_key: response.cache_key.or(Some(key)),
                job_id,
            });
        }

        let Some(payload) = response.result else {
            let error = InferenceError::InvalidResponse {
                stage: "analyze",
                detail: "neither a result nor a background acceptance".to_string(),
            };
            if let Some(job_id) = job_id {
                self.fail_job(job_id, &error.to_string()).await;
            }
            return Err(error);
        };

        let source = if response.cached {
            AnalysisSource::RemoteCached
        } else {
            AnalysisSource::Remote
        };
        let analysis = payload.into_result(source);

        if let Some(job_id) = job_id {
            self.complete_job(job_id, &analysis.raw).await;
        }

        Ok(RemoteOutcome {
            analysis: Some(analysis),
            processing: false,
            cached: response.cached,
            cache_key: response.cache_key.or(Some(key)),
            job_id,
        })
    }

    async fn fetch_metadata(&self, panel_id: PanelId) -> MetadataEnvelope {
        let result = with_retry(
            |_attempt| {
                let transport = Arc::clone(&self.transport);
                let timeout_ms = self.timeout_ms;
                async move {
                    match with_timeout(
                        async move { transport.metadata(panel_id).await },
                        timeout_ms,
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(timeout) => Err(InferenceError::from(timeout)),
                    }
                }
            },
            self.max_attempts,
        )
        .await;

        match result {
            Ok(response) => MetadataEnvelope::from_response(response),
            Err(e) => {
                tracing::warn!(
                    panel_id = %panel_id,
                    error = %e,
                    "Metadata fetch exhausted retries; degrading",
                );
                MetadataEnvelope::degraded(e.to_string())
            }
        }
    }

    async fn complete_job(&self, job_id: DbId, snapshot: &serde_json::Value) {
        if let Some(ledger) = &self.ledger {
            ledger
                .update_job(job_id, JobStatus::Done, None, Some(snapshot))
                .await;
        }
    }

    async fn fail_job(&self, job_id: DbId, message: &str) {
        if let Some(ledger) = &self.ledger {
            ledger
                .update_job(job_id, JobStatus::Error, Some(message), None)
                .await;
        }
    }
}
