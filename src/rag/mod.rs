//! Retrieval-augmented generation pipeline
//!
//! Population path: Document → Chunker → EmbeddingProvider → VectorIndex.
//! Query path: query → EmbeddingProvider → VectorIndex::search → Retriever
//! → ContextAssembler → AnswerSynthesizer → Answer.

pub mod context;
pub mod pipeline;
pub mod retrieval;
pub mod synthesis;

pub use context::{AssembledContext, Citation, ContextAssembler, NO_CONTEXT_MARKER};
pub use pipeline::{PipelineOptions, PopulationReport, QueryOutcome, RagPipeline};
pub use retrieval::Retriever;
pub use synthesis::{Answer, AnswerSynthesizer, RetryPolicy, DEFAULT_PROMPT_TEMPLATE};
