//! Source document loading and chunking
//!
//! The corpus boundary turns files on disk into [`Document`]s and splits
//! them into overlapping, stably-identified [`chunker::Chunk`]s, the
//! atomic unit of indexing and retrieval.

pub mod chunker;
pub mod loader;

pub use chunker::{Chunk, ChunkMetadata, Chunker};
pub use loader::{CorpusLoader, LoadOutcome};

/// A loaded source document: ordered page texts under a stable source id.
///
/// Immutable once loaded. `source_id` is the path the document was read
/// from and anchors every citation derived from it.
#[derive(Debug, Clone)]
pub struct Document {
    pub source_id: String,
    pub pages: Vec<String>,
}

impl Document {
    pub fn new(source_id: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            source_id: source_id.into(),
            pages,
        }
    }

    /// Single-page convenience constructor
    pub fn single_page(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(source_id, vec![text.into()])
    }
}
