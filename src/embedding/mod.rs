//! Text embedding providers
//!
//! A provider maps text to a fixed-dimension vector, deterministically per
//! model. Two adapters implement the capability: the Ollama embeddings
//! endpoint and a local BERT model run through candle. Both resolve their
//! model from an ordered candidate list at construction: first candidate
//! that loads wins, all-failures is `EmbeddingUnavailable`.

pub mod engine;
pub mod ollama;

use async_trait::async_trait;

use crate::errors::Result;

pub use engine::LocalEmbedder;
pub use ollama::OllamaEmbedder;

/// Fixed-dimension text embedding capability
///
/// Same model + same text must yield the same vector (within float
/// round-off), so chunk vectors written at population time stay comparable
/// with query vectors at retrieval time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed many texts, one vector per input, preserving order.
    /// Implementations batch internally for throughput.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector dimension, fixed for the provider's lifetime
    fn dimension(&self) -> usize;

    /// Name of the model that won the candidate race
    fn model_name(&self) -> &str;
}
