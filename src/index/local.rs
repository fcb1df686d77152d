//! Durable local vector index
//!
//! Entries live in memory behind a read-write lock and are persisted as a
//! single JSON snapshot. Every successful mutation rewrites the snapshot
//! to a temp file and renames it into place, then swaps the in-memory
//! state in one move, so a reader sees either the old state or the new one,
//! never a mixture, and a crash mid-write leaves the previous snapshot
//! intact. A writer mutex serializes upsert/reset per instance.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::errors::{RagError, Result};
use crate::index::{
    cosine_similarity, cosine_to_score, sort_results, IndexEntry, RetrievalResult, VectorIndex,
};

const SNAPSHOT_FILE: &str = "index.json";
const SNAPSHOT_TMP: &str = "index.json.tmp";
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk layout
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

#[derive(Clone, Default)]
struct IndexState {
    dimension: Option<usize>,
    entries: HashMap<String, IndexEntry>,
}

/// File-backed vector index
pub struct LocalVectorIndex {
    dir: PathBuf,
    state: RwLock<IndexState>,
    writer: Mutex<()>,
}

impl LocalVectorIndex {
    /// Open (or create) an index directory, loading any existing snapshot
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            RagError::IndexUnavailable(format!(
                "cannot create index directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let state = Self::load_snapshot(&dir.join(SNAPSHOT_FILE))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            state: RwLock::new(state),
            writer: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_snapshot(path: &Path) -> Result<IndexState> {
        if !path.exists() {
            return Ok(IndexState::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| RagError::IndexUnavailable(format!("cannot read snapshot: {}", e)))?;
        let snapshot: Snapshot = serde_json::from_str(&contents).map_err(|e| {
            RagError::IndexUnavailable(format!(
                "corrupt snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RagError::IndexUnavailable(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(IndexState {
            dimension: snapshot.dimension,
            entries: snapshot
                .entries
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect(),
        })
    }

    fn persist(&self, state: &IndexState) -> Result<()> {
        let mut entries: Vec<IndexEntry> = state.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            dimension: state.dimension,
            entries,
        };

        let tmp = self.dir.join(SNAPSHOT_TMP);
        let target = self.dir.join(SNAPSHOT_FILE);
        let contents = serde_json::to_string(&snapshot)?;
        fs::write(&tmp, contents)
            .map_err(|e| RagError::IndexUnavailable(format!("cannot write snapshot: {}", e)))?;
        fs::rename(&tmp, &target)
            .map_err(|e| RagError::IndexUnavailable(format!("cannot commit snapshot: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let _writer = self.writer.lock().await;

        let mut next = self.state.read().await.clone();
        let dimension = next.dimension.unwrap_or(entries[0].vector.len());
        for entry in &entries {
            if entry.vector.len() != dimension {
                return Err(RagError::Config(format!(
                    "embedding dimension mismatch: index holds {}, entry '{}' has {}",
                    dimension,
                    entry.id,
                    entry.vector.len()
                )));
            }
        }

        next.dimension = Some(dimension);
        for entry in entries {
            next.entries.insert(entry.id.clone(), entry);
        }

        // disk first: if persistence fails, readers keep the old state
        self.persist(&next)?;
        *self.state.write().await = next;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let next = IndexState::default();
        self.persist(&next)?;
        *self.state.write().await = next;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        let state = self.state.read().await;
        if state.entries.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dimension) = state.dimension {
            if query.len() != dimension {
                return Err(RagError::Config(format!(
                    "query dimension {} does not match index dimension {}",
                    query.len(),
                    dimension
                )));
            }
        }

        let mut results: Vec<RetrievalResult> = state
            .entries
            .values()
            .map(|entry| RetrievalResult {
                chunk: entry.to_chunk(),
                score: cosine_to_score(cosine_similarity(query, &entry.vector)),
            })
            .filter(|r| r.score >= score_threshold)
            .collect();

        sort_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.read().await.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Chunk;
    use tempfile::TempDir;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        let mut chunk = Chunk::new("doc.txt", 0, 0, format!("text for {}", id));
        chunk.id = id.to_string();
        chunk.metadata.source_id = "doc.txt".to_string();
        IndexEntry::from_chunk(chunk, vector)
    }

    #[tokio::test]
    async fn test_upsert_and_count() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        index
            .upsert(vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        index.upsert(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![entry("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let results = index.search(&[0.0, 1.0], 1, 0.0).await.unwrap();
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_empty_index_is_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();
        let results = index.search(&[1.0, 0.0], 5, 0.0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_orders_and_caps() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        index
            .upsert(vec![
                entry("far", vec![-1.0, 0.0]),
                entry("near", vec![1.0, 0.0]),
                entry("mid", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "near");
        assert_eq!(results[1].chunk.id, "mid");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_equal_scores_tie_break_by_id() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        // identical vectors: identical scores
        index
            .upsert(vec![
                entry("b", vec![1.0, 0.0]),
                entry("a", vec![1.0, 0.0]),
                entry("c", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0], 3, 0.0).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_threshold_filters_before_cap() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        index
            .upsert(vec![
                entry("near", vec![1.0, 0.0]),
                entry("far", vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();

        // "far" scores 0.0 under the convention, below the floor
        let results = index.search(&[1.0, 0.0], 5, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "near");
        assert!(results.iter().all(|r| r.score >= 0.5));
    }

    #[tokio::test]
    async fn test_reset_empties_index() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        index.upsert(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();
        index.reset().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.search(&[1.0, 0.0], 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = LocalVectorIndex::open(dir.path()).unwrap();
            index
                .upsert(vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])])
                .await
                .unwrap();
        }

        let reopened = LocalVectorIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let results = reopened.search(&[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(results[0].chunk.id, "a");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let index = LocalVectorIndex::open(dir.path()).unwrap();

        index.upsert(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();
        let result = index.upsert(vec![entry("b", vec![1.0, 0.0, 0.0])]).await;
        assert!(matches!(result, Err(RagError::Config(_))));
        // the failed call left nothing behind
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_index_unavailable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SNAPSHOT_FILE), "not json").unwrap();
        let result = LocalVectorIndex::open(dir.path());
        assert!(matches!(result, Err(RagError::IndexUnavailable(_))));
    }
}
