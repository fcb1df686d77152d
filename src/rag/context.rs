//! Context assembly
//!
//! Concatenates retrieved chunks into one bounded context block, highest
//! score first, each chunk preceded by a citation marker. When the budget
//! runs out assembly simply stops; the dropped chunks are exactly the
//! lowest-scored suffix, and no chunk is ever truncated mid-text.

use serde::Serialize;

use crate::index::RetrievalResult;

/// Default context budget in characters
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 4000;

/// Distinguished marker for "nothing relevant was retrieved", so callers
/// can tell it apart from "context found but empty"
pub const NO_CONTEXT_MARKER: &str = "[no relevant context retrieved]";

const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Provenance of one included chunk
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub source_id: String,
    pub page_index: usize,
    pub score: f32,
}

/// Bounded context block plus the citations actually included
#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    pub text: String,
    /// Citations in inclusion order (same order as the text blocks)
    pub citations: Vec<Citation>,
    pub included: usize,
    pub dropped: usize,
}

impl AssembledContext {
    /// Whether any retrieved content made it into the block
    pub fn has_context(&self) -> bool {
        !self.citations.is_empty()
    }
}

/// Assembles ranked results into a context block under a character budget
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn assemble(&self, results: &[RetrievalResult]) -> AssembledContext {
        if results.is_empty() {
            return AssembledContext {
                text: NO_CONTEXT_MARKER.to_string(),
                citations: Vec::new(),
                included: 0,
                dropped: 0,
            };
        }

        let mut text = String::new();
        let mut chars_used = 0usize;
        let mut citations = Vec::new();
        let mut included = 0;

        for result in results {
            let block = format!(
                "[source: {} page: {}]\n{}",
                result.chunk.metadata.source_id, result.chunk.metadata.page_index, result.chunk.text
            );
            let block_chars = block.chars().count();
            let separator_chars = if included == 0 {
                0
            } else {
                CHUNK_SEPARATOR.chars().count()
            };

            if chars_used + separator_chars + block_chars > self.max_chars {
                break;
            }

            if included > 0 {
                text.push_str(CHUNK_SEPARATOR);
            }
            text.push_str(&block);
            chars_used += separator_chars + block_chars;
            citations.push(Citation {
                source_id: result.chunk.metadata.source_id.clone(),
                page_index: result.chunk.metadata.page_index,
                score: result.score,
            });
            included += 1;
        }

        AssembledContext {
            text,
            citations,
            included,
            dropped: results.len() - included,
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_CHARS)
    }
}
