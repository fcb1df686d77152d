//! Query-time retrieval
//!
//! Embeds the query and searches the index, nothing else: no caching
//! across calls (the index is the single source of truth) and no error
//! swallowing; embedding and index failures propagate untouched.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::errors::{RagError, Result};
use crate::index::{RetrievalResult, VectorIndex};

/// Turns a query string into ranked, thresholded, top-k results
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        validate_search_params(k, score_threshold)?;
        let vector = self.embedder.embed_one(query).await?;
        self.index.search(&vector, k, score_threshold).await
    }
}

/// Reject invalid retrieval parameters before any work starts
pub fn validate_search_params(k: usize, score_threshold: f32) -> Result<()> {
    if k < 1 {
        return Err(RagError::Config("k must be at least 1".to_string()));
    }
    if !(0.0..=1.0).contains(&score_threshold) {
        return Err(RagError::Config(format!(
            "score_threshold must be within [0.0, 1.0], got {}",
            score_threshold
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Chunk;
    use crate::index::{IndexEntry, LocalVectorIndex};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Maps any text to a constant unit vector
    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_one(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_param_validation() {
        assert!(validate_search_params(0, 0.5).is_err());
        assert!(validate_search_params(1, -0.1).is_err());
        assert!(validate_search_params(1, 1.5).is_err());
        assert!(validate_search_params(1, 0.0).is_ok());
        assert!(validate_search_params(10, 1.0).is_ok());
    }

    #[tokio::test]
    async fn test_retrieve_goes_through_index() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(LocalVectorIndex::open(dir.path()).unwrap());
        index
            .upsert(vec![IndexEntry::from_chunk(
                Chunk::new("doc.txt", 0, 0, "content".to_string()),
                vec![1.0, 0.0],
            )])
            .await
            .unwrap();

        let retriever = Retriever::new(Arc::new(FixedEmbedder), index);
        let results = retriever.retrieve("anything", 5, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_invalid_k_rejected_before_embedding() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(LocalVectorIndex::open(dir.path()).unwrap());
        let retriever = Retriever::new(Arc::new(FixedEmbedder), index);
        let result = retriever.retrieve("anything", 0, 0.0).await;
        assert!(matches!(result, Err(RagError::Config(_))));
    }
}
