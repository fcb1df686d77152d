//! Error types for docbuddy
//!
//! One taxonomy for the whole pipeline: configuration problems are rejected
//! before any work starts, per-document ingestion failures are collected
//! rather than aborting a population run, and generation-service failures
//! carry enough detail to decide whether a retry makes sense.

use thiserror::Error;

/// Main error type for the RAG pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Invalid parameter values (chunk sizes, k, thresholds, templates)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source document could not be read
    #[error("Failed to ingest '{source_id}': {reason}")]
    Ingestion { source_id: String, reason: String },

    /// Embedding model could not be loaded or invoked
    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Vector index storage failure
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Generation service failure after the retry policy ran its course
    #[error("Answer synthesis failed after {attempts} attempt(s): {kind}")]
    Synthesis {
        kind: SynthesisErrorKind,
        attempts: u32,
        retries_exhausted: bool,
    },

    /// Ollama API errors outside the taxonomy above
    #[error("Ollama API error: {0}")]
    OllamaApi(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classified generation-service failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    /// Credentials rejected; retrying cannot help
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Service asked us to back off
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Request exceeded its deadline
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// Connection-level or 5xx failure likely to clear on its own
    #[error("transient service failure: {0}")]
    Transient(String),

    /// Service answered with something we cannot use
    #[error("invalid response from generation service: {0}")]
    InvalidResponse(String),
}

impl SynthesisErrorKind {
    /// Whether the bounded-backoff retry policy applies to this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SynthesisErrorKind::RateLimited(_)
                | SynthesisErrorKind::Timeout(_)
                | SynthesisErrorKind::Transient(_)
        )
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_error_display() {
        let err = RagError::Ingestion {
            source_id: "data/report.txt".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("data/report.txt"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_synthesis_error_display() {
        let err = RagError::Synthesis {
            kind: SynthesisErrorKind::RateLimited("429".to_string()),
            attempts: 4,
            retries_exhausted: true,
        };
        assert!(err.to_string().contains("4 attempt(s)"));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SynthesisErrorKind::RateLimited("x".into()).is_retryable());
        assert!(SynthesisErrorKind::Timeout(5000).is_retryable());
        assert!(SynthesisErrorKind::Transient("x".into()).is_retryable());
        assert!(!SynthesisErrorKind::Auth("x".into()).is_retryable());
        assert!(!SynthesisErrorKind::InvalidResponse("x".into()).is_retryable());
    }
}
