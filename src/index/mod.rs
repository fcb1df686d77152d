//! Similarity-searchable vector index
//!
//! The index owns `(id, vector, text, metadata)` entries: created or
//! overwritten by upsert, removed wholesale by reset. Two backends share
//! the contract: a durable single-file local store and a Qdrant
//! collection.
//!
//! # Score convention
//!
//! Scores are cosine similarity mapped to `[0, 1]`:
//! `score = (cosine + 1) / 2`, with 1.0 maximal. Both backends apply the
//! same mapping (the Qdrant backend converts the caller threshold to a raw
//! cosine floor before the server-side filter), so `score_threshold` means
//! the same thing regardless of backend.

pub mod local;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::corpus::{Chunk, ChunkMetadata};
use crate::errors::Result;

pub use local::LocalVectorIndex;
pub use qdrant::QdrantIndex;

/// One indexed chunk: id, embedding, original text, source metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub content_hash: String,
}

impl IndexEntry {
    pub fn from_chunk(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id,
            vector,
            text: chunk.text,
            metadata: chunk.metadata,
            content_hash: chunk.content_hash,
        }
    }

    /// Rebuild the chunk this entry was created from
    pub fn to_chunk(&self) -> Chunk {
        Chunk {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
            content_hash: self.content_hash.clone(),
        }
    }
}

/// A retrieved chunk with its relevance score in `[0, 1]`
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// Persistent nearest-neighbor store over embeddings
///
/// Writers are mutually exclusive per index instance; a reader never
/// observes a partially applied upsert or a reset with only some entries
/// re-populated.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite entries by id; atomic per call
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Delete all entries; reads see an empty index until the next upsert
    async fn reset(&self) -> Result<()>;

    /// Nearest neighbors of `query`: score descending, ties by ascending
    /// id, entries below `score_threshold` excluded before the `k` cap.
    /// An empty index yields an empty result, never an error.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalResult>>;

    /// Number of entries currently indexed
    async fn count(&self) -> Result<usize>;
}

/// Map raw cosine similarity in `[-1, 1]` to the score convention
pub fn cosine_to_score(cosine: f32) -> f32 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Inverse mapping: caller threshold to a raw cosine floor
pub fn score_to_cosine(score: f32) -> f32 {
    score * 2.0 - 1.0
}

/// Cosine similarity between two vectors; 0.0 when either has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Deterministic result ordering: score descending, ties by ascending id
pub(crate) fn sort_results(results: &mut [RetrievalResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, score: f32) -> RetrievalResult {
        let mut chunk = Chunk::new("s", 0, 0, "text".to_string());
        chunk.id = id.to_string();
        RetrievalResult { chunk, score }
    }

    #[test]
    fn test_cosine_score_mapping() {
        assert!((cosine_to_score(1.0) - 1.0).abs() < f32::EPSILON);
        assert!((cosine_to_score(-1.0)).abs() < f32::EPSILON);
        assert!((cosine_to_score(0.0) - 0.5).abs() < f32::EPSILON);
        assert!((score_to_cosine(cosine_to_score(0.3)) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = [0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sort_ties_broken_by_id() {
        let mut results = vec![result("b", 0.9), result("a", 0.9), result("c", 0.95)];
        sort_results(&mut results);
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_entry_chunk_round_trip() {
        let chunk = Chunk::new("doc.txt", 2, 3, "some text".to_string());
        let entry = IndexEntry::from_chunk(chunk.clone(), vec![0.1, 0.2]);
        let rebuilt = entry.to_chunk();
        assert_eq!(rebuilt.id, chunk.id);
        assert_eq!(rebuilt.text, chunk.text);
        assert_eq!(rebuilt.content_hash, chunk.content_hash);
    }
}
