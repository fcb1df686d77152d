//! Embeddings via the Ollama API
//!
//! The /api/embeddings endpoint takes one prompt per request, so batches
//! fan out over a small bounded pool; `buffered` keeps completion order
//! equal to input order.

use async_trait::async_trait;
use futures_util::{stream, StreamExt};

use crate::embedding::EmbeddingProvider;
use crate::errors::{RagError, Result};
use crate::models::OllamaClient;

/// Default candidate models, best first (names as known to `ollama pull`)
pub const DEFAULT_EMBED_MODELS: &[&str] = &["nomic-embed-text", "all-minilm", "mxbai-embed-large"];

/// Concurrent requests per embed() call
const MAX_IN_FLIGHT: usize = 4;

/// Embedding provider backed by a running Ollama server
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    /// Try each candidate model in order; the first that answers a probe
    /// request wins and pins the provider's model and dimension.
    pub async fn connect(client: OllamaClient, candidates: &[String]) -> Result<Self> {
        if candidates.is_empty() {
            return Err(RagError::Config(
                "embedding model candidate list is empty".to_string(),
            ));
        }

        let mut attempts = Vec::new();
        for model in candidates {
            match client.embeddings(model, "dimension probe").await {
                Ok(vector) => {
                    return Ok(Self {
                        client,
                        model: model.clone(),
                        dimension: vector.len(),
                    })
                }
                Err(e) => attempts.push(format!("{}: {}", model, e)),
            }
        }
        Err(RagError::EmbeddingUnavailable(format!(
            "no embedding model could be loaded ({})",
            attempts.join("; ")
        )))
    }

    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.client.embeddings(&self.model, text).await?;
        if vector.len() != self.dimension {
            return Err(RagError::EmbeddingUnavailable(format!(
                "model '{}' changed dimension mid-run: expected {}, got {}",
                self.model,
                self.dimension,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let results: Vec<Result<Vec<f32>>> = stream::iter(0..texts.len())
            .map(|i| self.embed_checked(&texts[i]))
            .buffered(MAX_IN_FLIGHT)
            .collect()
            .await;

        let mut vectors = Vec::with_capacity(results.len());
        for result in results {
            vectors.push(result?);
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_checked(text).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_OLLAMA_URL;

    #[tokio::test]
    async fn test_empty_candidate_list_rejected() {
        let client = OllamaClient::new(DEFAULT_OLLAMA_URL).unwrap();
        let result = OllamaEmbedder::connect(client, &[]).await;
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running with an embedding model pulled
    async fn test_connect_and_embed_integration() {
        let client = OllamaClient::new(DEFAULT_OLLAMA_URL).unwrap();
        let candidates: Vec<String> =
            DEFAULT_EMBED_MODELS.iter().map(|m| m.to_string()).collect();
        let embedder = OllamaEmbedder::connect(client, &candidates).await.unwrap();

        let texts = vec!["first".to_string(), "second".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == embedder.dimension()));
    }
}
