//! Ollama model access
//!
//! HTTP client for the Ollama API plus the capability trait the answer
//! synthesizer dispatches through. Keeping generation behind a trait means
//! the pipeline can be exercised with a canned client in tests.

pub mod client;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::SynthesisErrorKind;

pub use client::{OllamaClient, DEFAULT_OLLAMA_URL};

/// Default generation model
pub const DEFAULT_GENERATION_MODEL: &str = "qwen2.5:7b-instruct";

/// Generation settings, all explicit per call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name as known to the service
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for a single generation request
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 120,
        }
    }
}

impl ModelConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

/// Capability interface for the external generation service
///
/// A single call either returns the generated text or a classified
/// failure; the retry policy lives with the caller, not the client.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> std::result::Result<String, SynthesisErrorKind>;

    /// Cheap reachability probe, never an error
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.model, DEFAULT_GENERATION_MODEL);
        assert_eq!(config.max_tokens, 1000);
        assert!(config.temperature < 1.0);
    }

    #[test]
    fn test_model_config_with_model() {
        let config = ModelConfig::with_model("llama3.1:8b");
        assert_eq!(config.model, "llama3.1:8b");
        assert_eq!(config.timeout_secs, ModelConfig::default().timeout_secs);
    }
}
