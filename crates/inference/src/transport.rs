//! HTTP transport for the hosted analysis service.
//!
//! Wraps the service's REST endpoints using [`reqwest`]. The
//! [`RemoteTransport`] trait is the seam the retry/fallback logic is
//! tested through.

use async_trait::async_trait;
use panelworks_core::types::PanelId;

use crate::error::InferenceError;
use crate::wire::{AnalyzeRequest, AnalyzeResponse, MetadataResponse};

/// One round trip to the hosted analysis service. No retries, no
/// timeouts — [`crate::remote::RemoteAnalyzer`] layers those on top.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Submit a panel for analysis.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, InferenceError>;

    /// Fetch the stored metadata for a panel.
    async fn metadata(&self, panel_id: PanelId) -> Result<MetadataResponse, InferenceError>;
}

/// `reqwest`-backed transport for a single analysis service instance.
pub struct HttpRemoteTransport {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRemoteTransport {
    /// Create a new transport for an analysis service.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `https://analysis.internal`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create a transport reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across clients).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`InferenceError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, InferenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, InferenceError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RemoteTransport for HttpRemoteTransport {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, InferenceError> {
        let response = self
            .client
            .post(format!("{}/panels/analyze", self.api_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn metadata(&self, panel_id: PanelId) -> Result<MetadataResponse, InferenceError> {
        let response = self
            .client
            .get(format!("{}/panels/{}/metadata", self.api_url, panel_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
