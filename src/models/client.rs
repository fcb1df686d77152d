//! Ollama API client
//!
//! Low-level HTTP access to the Ollama endpoints this pipeline needs:
//! generation, embeddings, installed-model listing, and a reachability
//! probe. Every request carries an explicit timeout; cancellation is
//! dropping the future, which aborts the outstanding call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::errors::{RagError, Result, SynthesisErrorKind};
use crate::models::types::{
    EmbeddingsRequest, EmbeddingsResponse, GenerateOptions, GenerateRequest, GenerateResponse,
    ModelsResponse, VersionResponse,
};
use crate::models::{GenerationClient, ModelConfig};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Connection-level timeout for non-generation calls
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Probe timeout for availability checks
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client for the Ollama API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(RagError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embed one text with the given model.
    ///
    /// Any failure here means the embedding model cannot be used, which is
    /// fatal to the current operation; chunks are never silently skipped.
    pub async fn embeddings(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RagError::EmbeddingUnavailable(format!("embedding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingUnavailable(format!(
                "model '{}' HTTP {}: {}",
                model,
                status,
                detail.trim()
            )));
        }

        let body: EmbeddingsResponse = response.json().await.map_err(|e| {
            RagError::EmbeddingUnavailable(format!("malformed embedding response: {}", e))
        })?;

        if body.embedding.is_empty() {
            return Err(RagError::EmbeddingUnavailable(format!(
                "model '{}' returned an empty embedding",
                model
            )));
        }
        Ok(body.embedding)
    }

    /// List installed model names via GET /api/tags
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(RagError::OllamaApi(format!(
                "failed to list models: HTTP {}",
                response.status()
            )));
        }

        let body: ModelsResponse = response.json().await?;
        Ok(body.models.into_iter().map(|m| m.name).collect())
    }

    /// Check whether the Ollama server answers at all
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        self.client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Server version string, for diagnostics
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body: VersionResponse = response.json().await?;
        Ok(body.version)
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> std::result::Result<String, SynthesisErrorKind> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens as i32,
            },
        };

        let deadline = Duration::from_secs(config.timeout_secs);
        let send = self
            .client
            .post(&url)
            .timeout(deadline)
            .json(&request)
            .send();

        let response = match tokio::time::timeout(deadline, send).await {
            Err(_) => return Err(SynthesisErrorKind::Timeout(deadline.as_millis() as u64)),
            Ok(Err(e)) if e.is_timeout() => {
                return Err(SynthesisErrorKind::Timeout(deadline.as_millis() as u64))
            }
            Ok(Err(e)) => return Err(SynthesisErrorKind::Transient(e.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail = format!("HTTP {}: {}", status, detail.trim());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    SynthesisErrorKind::Auth(detail)
                }
                StatusCode::TOO_MANY_REQUESTS => SynthesisErrorKind::RateLimited(detail),
                StatusCode::REQUEST_TIMEOUT => {
                    SynthesisErrorKind::Timeout(deadline.as_millis() as u64)
                }
                s if s.is_server_error() => SynthesisErrorKind::Transient(detail),
                _ => SynthesisErrorKind::InvalidResponse(detail),
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SynthesisErrorKind::InvalidResponse(e.to_string()))?;

        let text = body.response.trim();
        if text.is_empty() {
            return Err(SynthesisErrorKind::InvalidResponse(
                "service returned an empty answer".to_string(),
            ));
        }
        Ok(text.to_string())
    }

    async fn is_available(&self) -> bool {
        self.health_check().await
    }
}
