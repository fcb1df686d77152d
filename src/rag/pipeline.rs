//! End-to-end RAG pipeline
//!
//! One object wires the population path (load → chunk → embed → upsert)
//! and the query path (retrieve → assemble → synthesize) over injected
//! provider, index, and generation-client implementations. Every entry
//! point, batch CLI and interactive shell alike, goes through here.

use std::path::Path;
use std::sync::Arc;

use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::corpus::{Chunk, Chunker, CorpusLoader};
use crate::embedding::EmbeddingProvider;
use crate::errors::{RagError, Result};
use crate::index::{IndexEntry, VectorIndex};
use crate::models::{GenerationClient, ModelConfig};
use crate::rag::context::ContextAssembler;
use crate::rag::retrieval::Retriever;
use crate::rag::synthesis::{Answer, AnswerSynthesizer, RetryPolicy, DEFAULT_PROMPT_TEMPLATE};

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_context_chars: usize,
    pub prompt_template: String,
    /// Concurrent embedding batches during population
    pub embed_workers: usize,
    /// Chunks per embed() call
    pub embed_batch: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: crate::corpus::chunker::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::corpus::chunker::DEFAULT_CHUNK_OVERLAP,
            max_context_chars: crate::rag::context::DEFAULT_MAX_CONTEXT_CHARS,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            embed_workers: num_cpus::get().clamp(1, 8),
            embed_batch: 32,
        }
    }
}

/// One document that could not be ingested
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub source_id: String,
    pub reason: String,
}

/// What a population run accomplished
#[derive(Debug, Serialize)]
pub struct PopulationReport {
    pub documents_processed: usize,
    pub chunks_indexed: usize,
    pub failures: Vec<DocumentFailure>,
    /// Index entry count after the run
    pub index_count: usize,
}

/// Result of one query
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    /// None when nothing relevant was retrieved: a valid outcome, not an
    /// error, and never a fabricated answer
    pub answer: Option<Answer>,
    /// How many chunks retrieval returned
    pub retrieved: usize,
    /// The assembled context the answer was grounded in
    pub context: String,
}

/// The composed RAG pipeline
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    generation: Arc<dyn GenerationClient>,
    retriever: Retriever,
    assembler: ContextAssembler,
    synthesizer: AnswerSynthesizer,
    options: PipelineOptions,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generation: Arc<dyn GenerationClient>,
        options: PipelineOptions,
    ) -> Result<Self> {
        // chunking parameters are rejected here, before any work starts
        Chunker::new(options.chunk_size, options.chunk_overlap)?;
        if options.embed_workers < 1 || options.embed_batch < 1 {
            return Err(RagError::Config(
                "embed_workers and embed_batch must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            retriever: Retriever::new(Arc::clone(&embedder), Arc::clone(&index)),
            assembler: ContextAssembler::new(options.max_context_chars),
            synthesizer: AnswerSynthesizer::new(Arc::clone(&generation)),
            embedder,
            index,
            generation,
            options,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.synthesizer = AnswerSynthesizer::with_retry(Arc::clone(&self.generation), retry);
        self
    }

    /// Chunk, embed, and index every document under `data_path`.
    ///
    /// Per-document read failures are collected in the report; the run
    /// aborts only when every document failed. With `reset` the index is
    /// cleared first, otherwise stable chunk ids make the upsert
    /// idempotent.
    pub async fn populate(&self, data_path: &Path, reset: bool) -> Result<PopulationReport> {
        let chunker = Chunker::new(self.options.chunk_size, self.options.chunk_overlap)?;
        let outcome = CorpusLoader::load_dir(data_path)?;

        if outcome.documents.is_empty() && !outcome.failures.is_empty() {
            let detail: Vec<String> = outcome.failures.iter().map(|e| e.to_string()).collect();
            return Err(RagError::Ingestion {
                source_id: data_path.display().to_string(),
                reason: format!("all documents failed: {}", detail.join("; ")),
            });
        }

        if reset {
            self.index.reset().await?;
        }

        let mut chunks = Vec::new();
        for document in &outcome.documents {
            chunks.extend(chunker.split(document));
        }

        let entries = self.embed_chunks(chunks).await?;
        let chunks_indexed = entries.len();
        if !entries.is_empty() {
            self.index.upsert(entries).await?;
        }

        Ok(PopulationReport {
            documents_processed: outcome.documents.len(),
            chunks_indexed,
            failures: outcome
                .failures
                .iter()
                .map(|e| match e {
                    RagError::Ingestion { source_id, reason } => DocumentFailure {
                        source_id: source_id.clone(),
                        reason: reason.clone(),
                    },
                    other => DocumentFailure {
                        source_id: String::new(),
                        reason: other.to_string(),
                    },
                })
                .collect(),
            index_count: self.index.count().await?,
        })
    }

    /// Embed chunks in fixed-size batches over a bounded worker pool.
    /// `buffered` yields in input order, so entry order (and with it id
    /// assignment) is deterministic regardless of completion order.
    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexEntry>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<Vec<Chunk>> = chunks
            .chunks(self.options.embed_batch)
            .map(<[Chunk]>::to_vec)
            .collect();

        let embedded: Vec<Result<Vec<IndexEntry>>> = stream::iter(batches)
            .map(|batch| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                    let vectors = embedder.embed(&texts).await?;
                    if vectors.len() != batch.len() {
                        return Err(RagError::EmbeddingUnavailable(format!(
                            "provider returned {} vectors for {} texts",
                            vectors.len(),
                            batch.len()
                        )));
                    }
                    Ok(batch
                        .into_iter()
                        .zip(vectors)
                        .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
                        .collect())
                }
            })
            .buffered(self.options.embed_workers)
            .collect()
            .await;

        let mut entries = Vec::with_capacity(chunks_len(&embedded));
        for batch in embedded {
            entries.extend(batch?);
        }
        Ok(entries)
    }

    /// Retrieve, assemble, and synthesize an answer for one question
    pub async fn query(
        &self,
        question: &str,
        k: usize,
        score_threshold: f32,
        model: &ModelConfig,
    ) -> Result<QueryOutcome> {
        let results = self.retriever.retrieve(question, k, score_threshold).await?;
        let context = self.assembler.assemble(&results);

        if !context.has_context() {
            return Ok(QueryOutcome {
                answer: None,
                retrieved: results.len(),
                context: String::new(),
            });
        }

        let answer = self
            .synthesizer
            .synthesize(question, &context, &self.options.prompt_template, model)
            .await?;

        Ok(QueryOutcome {
            answer: Some(answer),
            retrieved: results.len(),
            context: context.text,
        })
    }

    /// Current index entry count
    pub async fn index_count(&self) -> Result<usize> {
        self.index.count().await
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }
}

fn chunks_len(batches: &[Result<Vec<IndexEntry>>]) -> usize {
    batches
        .iter()
        .map(|b| b.as_ref().map(Vec::len).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let options = PipelineOptions::default();
        assert!(options.chunk_size > options.chunk_overlap);
        assert!(options.embed_workers >= 1);
        assert!(options.prompt_template.contains("{context}"));
        assert!(options.prompt_template.contains("{question}"));
    }
}
