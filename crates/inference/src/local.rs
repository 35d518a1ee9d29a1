//! Client-resident inference path.
//!
//! Runs the same detection capability as the hosted service against
//! local model runtimes: a primary provider with an internal fallback to
//! a secondary one. Image fetching has its own bounded retry — fetch
//! failures are common and cheap to retry, independently of any outer
//! discipline the caller applies.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use panelworks_core::hashing::sha256_hex;
use panelworks_core::panel::{AnalysisResult, AnalysisSource, Panel};
use panelworks_core::retry::with_retry;
use panelworks_db::repositories::PredictionRepo;
use sqlx::PgPool;

use crate::error::InferenceError;
use crate::wire::{labels_to_regions, DetectResponse, ModelParams, WireLabel};

/// Bounded retry for the image fetch, independent of the outer call.
const IMAGE_FETCH_ATTEMPTS: u32 = 3;

/// A client-resident detection model runtime.
#[async_trait]
pub trait DetectionProvider: Send + Sync {
    /// Short provider name, used in errors and audit records.
    fn name(&self) -> &str;

    /// Run detection over raw image bytes.
    async fn detect(
        &self,
        image: &[u8],
        params: &ModelParams,
    ) -> Result<Vec<WireLabel>, InferenceError>;
}

/// Fetches a panel's image bytes from its opaque reference.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, image_url: &str) -> Result<Vec<u8>, InferenceError>;
}

/// The local execution path as the orchestrator consumes it.
#[async_trait]
pub trait LocalAnalysis: Send + Sync {
    async fn process(&self, panel: &Panel) -> Result<AnalysisResult, InferenceError>;
}

// ---------------------------------------------------------------------------
// HTTP implementations
// ---------------------------------------------------------------------------

/// `reqwest`-backed image fetcher.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image_url: &str) -> Result<Vec<u8>, InferenceError> {
        let response = self.client.get(image_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body: format!("image fetch from {image_url}"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// `reqwest`-backed detection provider posting binary image payloads to
/// a model runtime endpoint.
pub struct HttpDetectionProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDetectionProvider {
    /// * `name`     - provider name for errors/audit (e.g. `"primary"`).
    /// * `endpoint` - full detection URL, e.g. `http://127.0.0.1:7860/detect`.
    pub fn new(name: impl Into<String>, client: reqwest::Client, endpoint: String) -> Self {
        Self {
            name: name.into(),
            client,
            endpoint,
        }
    }
}

#[async_trait]
impl DetectionProvider for HttpDetectionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(
        &self,
        image: &[u8],
        params: &ModelParams,
    ) -> Result<Vec<WireLabel>, InferenceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(params)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InferenceError::Provider {
                provider: self.name.clone(),
                detail: format!("runtime returned {status}: {body}"),
            });
        }

        let parsed: DetectResponse = response.json().await?;
        Ok(parsed.annotations)
    }
}

// ---------------------------------------------------------------------------
// LocalAnalyzer
// ---------------------------------------------------------------------------

/// Local analysis over a primary provider with a secondary fallback.
pub struct LocalAnalyzer {
    fetcher: Arc<dyn ImageFetcher>,
    primary: Arc<dyn DetectionProvider>,
    secondary: Arc<dyn DetectionProvider>,
    params: ModelParams,
    /// Audit pool for best-effort prediction persistence; `None` skips it.
    audit_pool: Option<PgPool>,
}

impl LocalAnalyzer {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        primary: Arc<dyn DetectionProvider>,
        secondary: Arc<dyn DetectionProvider>,
        audit_pool: Option<PgPool>,
    ) -> Self {
        Self {
            fetcher,
            primary,
            secondary,
            params: ModelParams::default(),
            audit_pool,
        }
    }

    /// Override the model invocation parameters.
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Fetch the panel image with its own bounded exponential-backoff
    /// retry.
    async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, InferenceError> {
        with_retry(
            |_attempt| {
                let fetcher = Arc::clone(&self.fetcher);
                let url = image_url.to_string();
                async move { fetcher.fetch(&url).await }
            },
            IMAGE_FETCH_ATTEMPTS,
        )
        .await
        .map_err(|e| InferenceError::ImageFetch {
            attempts: IMAGE_FETCH_ATTEMPTS,
            detail: e.to_string(),
        })
    }
}

/// Read (width, height) from the image header without decoding pixels.
fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[async_trait]
impl LocalAnalysis for LocalAnalyzer {
    async fn process(&self, panel: &Panel) -> Result<AnalysisResult, InferenceError> {
        let image_url = panel
            .image_url
            .as_deref()
            .ok_or(InferenceError::MissingImage(panel.id))?;

        let bytes = self.fetch_image(image_url).await?;
        let bounds = image_dimensions(&bytes);

        let (wire_labels, source, provider_name) =
            match self.primary.detect(&bytes, &self.params).await {
                Ok(labels) => (labels, AnalysisSource::LocalPrimary, self.primary.name()),
                Err(primary_error) => {
                    tracing::warn!(
                        panel_id = %panel.id,
                        provider = self.primary.name(),
                        error = %primary_error,
                        "Primary provider failed; falling back to secondary",
                    );
                    match self.secondary.detect(&bytes, &self.params).await {
                        Ok(labels) => {
                            (labels, AnalysisSource::LocalSecondary, self.secondary.name())
                        }
                        Err(secondary_error) => {
                            return Err(InferenceError::LocalExhausted {
                                primary: primary_error.to_string(),
                                secondary: secondary_error.to_string(),
                            });
                        }
                    }
                }
            };

        let regions = labels_to_regions(&wire_labels, bounds);
        let mut analysis = AnalysisResult::from_labels(regions, source);
        analysis.raw = serde_json::json!({ "annotations": wire_labels });

        if let Some(pool) = &self.audit_pool {
            PredictionRepo::record_best_effort(
                pool,
                panel.id,
                provider_name,
                &sha256_hex(&bytes),
                &analysis.raw,
            )
            .await;
        }

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;
    use uuid::Uuid;

    struct FlakyFetcher {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl ImageFetcher for FlakyFetcher {
        async fn fetch(&self, _image_url: &str) -> Result<Vec<u8>, InferenceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(InferenceError::Api {
                    status: 502,
                    body: "cdn hiccup".into(),
                })
            } else {
                Ok(vec![1, 2, 3, 4])
            }
        }
    }

    struct FixedProvider {
        name: &'static str,
        calls: AtomicU32,
        reply: Result<Vec<WireLabel>, String>,
    }

    impl FixedProvider {
        fn ok(name: &'static str, labels: Vec<WireLabel>) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                reply: Ok(labels),
            })
        }

        fn failing(name: &'static str, detail: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                reply: Err(detail.to_string()),
            })
        }
    }

    #[async_trait]
    impl DetectionProvider for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn detect(
            &self,
            _image: &[u8],
            _params: &ModelParams,
        ) -> Result<Vec<WireLabel>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(labels) => Ok(labels.clone()),
                Err(detail) => Err(InferenceError::Provider {
                    provider: self.name.to_string(),
                    detail: detail.clone(),
                }),
            }
        }
    }

    fn labels(count: usize) -> Vec<WireLabel> {
        (0..count)
            .map(|i| WireLabel {
                bbox: [i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0],
                label: "person".into(),
                confidence: 0.85,
            })
            .collect()
    }

    fn panel() -> Panel {
        Panel::new(Uuid::new_v4(), "https://cdn/p1.png")
    }

    fn good_fetcher() -> Arc<FlakyFetcher> {
        Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            fail_first: 0,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn primary_provider_success() {
        let primary = FixedProvider::ok("primary", labels(2));
        let secondary = FixedProvider::failing("secondary", "should not be called");
        let analyzer =
            LocalAnalyzer::new(good_fetcher(), primary.clone(), secondary.clone(), None);

        let result = analyzer.process(&panel()).await.unwrap();

        assert_eq!(result.source, AnalysisSource::LocalPrimary);
        assert_eq!(result.labels.len(), 2);
        assert_eq!(result.character_count, Some(2));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_secondary_when_primary_fails() {
        let primary = FixedProvider::failing("primary", "model load failed");
        let secondary = FixedProvider::ok("secondary", labels(1));
        let analyzer =
            LocalAnalyzer::new(good_fetcher(), primary.clone(), secondary.clone(), None);

        let result = analyzer.process(&panel()).await.unwrap();

        assert_eq!(result.source, AnalysisSource::LocalSecondary);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn both_providers_failing_names_both_stages() {
        let primary = FixedProvider::failing("primary", "model load failed");
        let secondary = FixedProvider::failing("secondary", "out of memory");
        let analyzer = LocalAnalyzer::new(good_fetcher(), primary, secondary, None);

        let error = analyzer.process(&panel()).await.unwrap_err();

        assert_matches!(&error, InferenceError::LocalExhausted { primary, secondary } => {
            assert!(primary.contains("model load failed"));
            assert!(secondary.contains("out of memory"));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn image_fetch_retries_then_succeeds() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let primary = FixedProvider::ok("primary", labels(1));
        let secondary = FixedProvider::failing("secondary", "unused");
        let analyzer = LocalAnalyzer::new(fetcher.clone(), primary, secondary, None);

        let start = Instant::now();
        let result = analyzer.process(&panel()).await.unwrap();

        assert_eq!(result.labels.len(), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        // 1s + 2s backoff between the three fetch attempts.
        assert_eq!(start.elapsed(), Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn image_fetch_exhaustion_fails_without_invoking_providers() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });
        let primary = FixedProvider::ok("primary", labels(1));
        let secondary = FixedProvider::ok("secondary", labels(1));
        let analyzer =
            LocalAnalyzer::new(fetcher.clone(), primary.clone(), secondary.clone(), None);

        let error = analyzer.process(&panel()).await.unwrap_err();

        assert_matches!(&error, InferenceError::ImageFetch { attempts: 3, detail } => {
            assert!(detail.contains("502"));
        });
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_image_reference_fails_fast() {
        let mut p = panel();
        p.image_url = None;
        let analyzer = LocalAnalyzer::new(
            good_fetcher(),
            FixedProvider::ok("primary", labels(1)),
            FixedProvider::ok("secondary", labels(1)),
            None,
        );

        let error = analyzer.process(&p).await.unwrap_err();
        assert_matches!(error, InferenceError::MissingImage(id) if id == p.id);
    }

    #[test]
    fn dimensions_of_garbage_bytes_are_unknown() {
        assert_eq!(image_dimensions(&[1, 2, 3, 4]), None);
    }
}
