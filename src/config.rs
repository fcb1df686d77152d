//! Configuration for docbuddy
//!
//! Loaded from `~/.docbuddy/config.toml`, created with defaults on first
//! run. CLI flags override individual fields; the file is the durable
//! baseline.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::embedding::engine::DEFAULT_LOCAL_MODELS;
use crate::embedding::ollama::DEFAULT_EMBED_MODELS;
use crate::errors::{RagError, Result};
use crate::index::qdrant::DEFAULT_COLLECTION;
use crate::models::{ModelConfig, DEFAULT_GENERATION_MODEL, DEFAULT_OLLAMA_URL};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

/// Which embedding adapter to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama /api/embeddings endpoint
    Ollama,
    /// BERT model run in-process via candle
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Ordered model candidates for the Ollama backend, best first
    pub ollama_models: Vec<String>,
    /// Ordered HuggingFace model ids for the local backend, best first
    pub local_models: Vec<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            ollama_models: DEFAULT_EMBED_MODELS.iter().map(|m| m.to_string()).collect(),
            local_models: DEFAULT_LOCAL_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Which vector index backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Durable single-file store under `path`
    Local,
    /// Qdrant server at `qdrant_url`
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    /// Location of the local index
    pub path: PathBuf,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Local,
            path: PathBuf::from(".docbuddy/index"),
            qdrant_url: "http://localhost:6334".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Retries after the first attempt for retryable synthesis failures
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl GenerationConfig {
    /// Per-call settings, optionally overriding the model name
    pub fn to_model_config(&self, model_override: Option<&str>) -> ModelConfig {
        ModelConfig {
            model: model_override.unwrap_or(&self.model).to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it on first run
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| RagError::Config(format!("cannot parse '{}': {}", path.display(), e)))?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::Config(format!("cannot serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration file location
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RagError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".docbuddy").join("config.toml"))
    }

    /// REPL history file location
    pub fn history_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RagError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".docbuddy").join("history"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ollama.url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Ollama);
        assert_eq!(config.index.backend, IndexBackend::Local);
        assert_eq!(config.generation.model, DEFAULT_GENERATION_MODEL);
        assert!(!config.embedding.ollama_models.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let mut config = Config::default();
        config.generation.model = "llama3.1:8b".to_string();
        config.index.backend = IndexBackend::Qdrant;

        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.generation.model, "llama3.1:8b");
        assert_eq!(parsed.index.backend, IndexBackend::Qdrant);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.generation.model, DEFAULT_GENERATION_MODEL);

        // second load reads the file it just wrote
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.ollama.url, config.ollama.url);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not [valid toml").unwrap();
        assert!(matches!(Config::load_from(&path), Err(RagError::Config(_))));
    }

    #[test]
    fn test_model_override() {
        let generation = GenerationConfig::default();
        let config = generation.to_model_config(Some("mistral:7b"));
        assert_eq!(config.model, "mistral:7b");
        let config = generation.to_model_config(None);
        assert_eq!(config.model, DEFAULT_GENERATION_MODEL);
    }
}
