//! Single-shot narration and audio generation clients.
//!
//! These are best-effort creative calls, not critical-path
//! infrastructure: one request, no retry, no backoff, no polling. The
//! pipeline awaits them directly and records whatever comes back.

use async_trait::async_trait;
use panelworks_core::voice::{NarrationFormat, NarrationTone, VoiceType};

use crate::error::InferenceError;
use crate::wire::{AudioRequest, AudioResponse, NarrationRequest, NarrationResponse};

/// Narration and audio generation as the pipeline consumes them.
#[async_trait]
pub trait GeneratorClient: Send + Sync {
    /// Generate narration text for a panel image.
    async fn narration(
        &self,
        image_data: &str,
        tone: NarrationTone,
        format: NarrationFormat,
    ) -> Result<String, InferenceError>;

    /// Synthesize narration audio; returns the hosted audio URL.
    async fn audio(&self, text: &str, voice: VoiceType) -> Result<String, InferenceError>;
}

/// `reqwest`-backed generator client.
pub struct HttpGeneratorClient {
    client: reqwest::Client,
    api_url: String,
}

impl HttpGeneratorClient {
    /// * `api_url` - Base HTTP URL of the generation service.
    pub fn new(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

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
}

#[async_trait]
impl GeneratorClient for HttpGeneratorClient {
    async fn narration(
        &self,
        image_data: &str,
        tone: NarrationTone,
        format: NarrationFormat,
    ) -> Result<String, InferenceError> {
        let request = NarrationRequest {
            image_data: image_data.to_string(),
            tone,
            format,
        };

        let response = self
            .client
            .post(format!("{}/narration", self.api_url))
            .json(&request)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let parsed: NarrationResponse = response.json().await?;

        if !parsed.success {
            return Err(InferenceError::Generation(
                parsed
                    .error
                    .unwrap_or_else(|| "narration service reported failure".to_string()),
            ));
        }
        parsed.narration.ok_or(InferenceError::InvalidResponse {
            stage: "narration",
            detail: "success without narration text".to_string(),
        })
    }

    async fn audio(&self, text: &str, voice: VoiceType) -> Result<String, InferenceError> {
        let request = AudioRequest {
            text: text.to_string(),
            voice,
        };

        let response = self
            .client
            .post(format!("{}/audio", self.api_url))
            .json(&request)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let parsed: AudioResponse = response.json().await?;

        if !parsed.success {
            return Err(InferenceError::Generation(
                parsed
                    .error
                    .unwrap_or_else(|| "audio service reported failure".to_string()),
            ));
        }
        parsed.audio_url.ok_or(InferenceError::InvalidResponse {
            stage: "audio",
            detail: "success without audio url".to_string(),
        })
    }
}
