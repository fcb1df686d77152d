//! Qdrant-backed vector index
//!
//! Stores chunks as points in one Qdrant collection with cosine distance.
//! Point UUIDs are derived deterministically from chunk ids (UUIDv5), so
//! repeated population upserts the same points instead of accumulating
//! duplicates. Raw cosine scores are mapped to the crate-wide `[0, 1]`
//! convention and re-sorted client-side for the ascending-id tie-break.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        value::Kind, vectors_config::Config, with_payload_selector::SelectorOptions,
        CreateCollection, Distance, PointStruct, SearchPoints, Value as QdrantValue, VectorParams,
        VectorsConfig, WithPayloadSelector,
    },
};
use uuid::Uuid;

use crate::corpus::{Chunk, ChunkMetadata};
use crate::errors::{RagError, Result};
use crate::index::{
    cosine_to_score, score_to_cosine, sort_results, IndexEntry, RetrievalResult, VectorIndex,
};

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "documents";

/// Vector index backed by a Qdrant server
pub struct QdrantIndex {
    client: QdrantClient,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect and make sure the collection exists with the right shape
    pub async fn connect(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| RagError::IndexUnavailable(format!("qdrant client: {}", e)))?;

        let index = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("qdrant: {}", e)))?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);
        if exists {
            return Ok(());
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: self.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.dimension as u64,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                RagError::IndexUnavailable(format!(
                    "cannot create collection '{}': {}",
                    self.collection, e
                ))
            })?;
        Ok(())
    }

    /// Deterministic point UUID for a chunk id
    fn point_id(chunk_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
    }

    fn to_point(entry: IndexEntry) -> PointStruct {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("chunk_id".to_string(), QdrantValue::from(entry.id.clone()));
        payload.insert("text".to_string(), QdrantValue::from(entry.text));
        payload.insert(
            "source_id".to_string(),
            QdrantValue::from(entry.metadata.source_id),
        );
        payload.insert(
            "page_index".to_string(),
            QdrantValue::from(entry.metadata.page_index as i64),
        );
        payload.insert(
            "chunk_index".to_string(),
            QdrantValue::from(entry.metadata.chunk_index as i64),
        );
        payload.insert(
            "content_hash".to_string(),
            QdrantValue::from(entry.content_hash),
        );

        PointStruct::new(Self::point_id(&entry.id), entry.vector, payload)
    }

    fn chunk_from_payload(payload: &HashMap<String, QdrantValue>) -> Option<Chunk> {
        Some(Chunk {
            id: payload_str(payload, "chunk_id")?,
            text: payload_str(payload, "text")?,
            metadata: ChunkMetadata {
                source_id: payload_str(payload, "source_id")?,
                page_index: payload_int(payload, "page_index")? as usize,
                chunk_index: payload_int(payload, "chunk_index")? as usize,
            },
            content_hash: payload_str(payload, "content_hash").unwrap_or_default(),
        })
    }
}

fn payload_str(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key)?.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

fn payload_int(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<i64> {
    match payload.get(key)?.kind.as_ref()? {
        Kind::IntegerValue(i) => Some(*i),
        _ => None,
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        for entry in &entries {
            if entry.vector.len() != self.dimension {
                return Err(RagError::Config(format!(
                    "embedding dimension mismatch: collection holds {}, entry '{}' has {}",
                    self.dimension,
                    entry.id,
                    entry.vector.len()
                )));
            }
        }

        let points: Vec<PointStruct> = entries.into_iter().map(Self::to_point).collect();
        self.client
            .upsert_points_blocking(&self.collection, None, points, None)
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("qdrant upsert: {}", e)))?;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("qdrant reset: {}", e)))?;
        self.ensure_collection().await
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: query.to_vec(),
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                score_threshold: Some(score_to_cosine(score_threshold)),
                ..Default::default()
            })
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("qdrant search: {}", e)))?;

        let mut results: Vec<RetrievalResult> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let chunk = Self::chunk_from_payload(&point.payload)?;
                Some(RetrievalResult {
                    chunk,
                    score: cosine_to_score(point.score),
                })
            })
            .filter(|r| r.score >= score_threshold)
            .collect();

        sort_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| RagError::IndexUnavailable(format!("qdrant info: {}", e)))?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_deterministic() {
        let a = QdrantIndex::point_id("doc.txt:0:1");
        let b = QdrantIndex::point_id("doc.txt:0:1");
        let c = QdrantIndex::point_id("doc.txt:0:2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    #[ignore] // Integration test - requires Qdrant
    async fn test_upsert_search_roundtrip() {
        let index = QdrantIndex::connect("http://localhost:6334", "docbuddy_test", 2)
            .await
            .unwrap();
        index.reset().await.unwrap();

        let chunk = Chunk::new("doc.txt", 0, 0, "hello world".to_string());
        index
            .upsert(vec![IndexEntry::from_chunk(chunk, vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "doc.txt:0:0");
        assert!(results[0].score > 0.9);
    }
}
