//! docbuddy - Document Q&A over local Ollama models
//!
//! Retrieval-augmented generation over a private document corpus:
//! deterministic chunking, embedding generation, a durable
//! similarity-searchable vector index with idempotent population, and
//! query-time retrieval feeding grounded answer synthesis with source
//! citations.
//!
//! # Data flow
//!
//! - Population: `Document` → [`corpus::Chunker`] → [`embedding`] →
//!   [`index`]
//! - Query: question → [`embedding`] → [`index`] search →
//!   [`rag::Retriever`] → [`rag::ContextAssembler`] →
//!   [`rag::AnswerSynthesizer`] → [`rag::Answer`]

pub mod cli;
pub mod config;
pub mod corpus;
pub mod doctor;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod models;
pub mod rag;
pub mod repl;

// Re-export commonly used types
pub use errors::{RagError, Result, SynthesisErrorKind};
