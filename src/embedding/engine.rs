//! Local sentence embeddings via candle
//!
//! Downloads a sentence-transformer BERT model from the HuggingFace Hub on
//! first use and runs it on CPU: tokenize, forward, mean-pool over the
//! attention mask, L2-normalize. Normalized outputs make cosine similarity
//! a plain dot product downstream.

use std::fmt::Display;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::errors::{RagError, Result};

/// Default candidate models, best first (mirrors the hosted fallback list)
pub const DEFAULT_LOCAL_MODELS: &[&str] = &[
    "sentence-transformers/all-MiniLM-L12-v2",
    "sentence-transformers/all-MiniLM-L6-v2",
    "sentence-transformers/paraphrase-MiniLM-L3-v2",
];

/// Texts per forward pass
const MAX_BATCH: usize = 32;

/// Embedding provider running a BERT model locally
pub struct LocalEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    model_id: String,
}

impl LocalEmbedder {
    /// Try each candidate model in order; first one that downloads and
    /// loads wins. All failures surface as one `EmbeddingUnavailable`.
    pub fn load(candidates: &[String]) -> Result<Self> {
        if candidates.is_empty() {
            return Err(RagError::Config(
                "embedding model candidate list is empty".to_string(),
            ));
        }

        let mut attempts = Vec::new();
        for model_id in candidates {
            match Self::load_model(model_id) {
                Ok(embedder) => return Ok(embedder),
                Err(e) => attempts.push(format!("{}: {}", model_id, e)),
            }
        }
        Err(RagError::EmbeddingUnavailable(format!(
            "no embedding model could be loaded ({})",
            attempts.join("; ")
        )))
    }

    fn load_model(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().map_err(embed_err)?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json").map_err(embed_err)?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(embed_err)?;
        let weights_path = repo.get("model.safetensors").map_err(embed_err)?;

        let config_contents = std::fs::read_to_string(config_path)?;
        let config: BertConfig = serde_json::from_str(&config_contents)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(embed_err)?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(embed_err)?
        };
        let model = BertModel::load(vb, &config).map_err(embed_err)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
            model_id: model_id.to_string(),
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(embed_err)?;

        let batch_size = texts.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut padded_ids = vec![0u32; batch_size * max_len];
        let mut padded_mask = vec![0u32; batch_size * max_len];
        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            padded_ids[row * max_len..row * max_len + ids.len()].copy_from_slice(ids);
            padded_mask[row * max_len..row * max_len + mask.len()].copy_from_slice(mask);
        }

        let token_ids =
            Tensor::from_vec(padded_ids, (batch_size, max_len), &self.device).map_err(embed_err)?;
        let attention_mask = Tensor::from_vec(padded_mask, (batch_size, max_len), &self.device)
            .map_err(embed_err)?;
        let token_type_ids = token_ids.zeros_like().map_err(embed_err)?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))
            .map_err(embed_err)?;

        let pooled = mean_pool(&hidden, &attention_mask).map_err(embed_err)?;
        let normalized = l2_normalize(&pooled).map_err(embed_err)?;

        normalized.to_vec2::<f32>().map_err(embed_err)
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Mean pooling over sequence length, weighted by the attention mask
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask
        .unsqueeze(2)?
        .expand(hidden.shape())?
        .to_dtype(hidden.dtype())?;

    let summed = (hidden * &mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    summed.broadcast_div(&counts)
}

/// Row-wise L2 normalization
fn l2_normalize(t: &Tensor) -> candle_core::Result<Tensor> {
    let norm = t.sqr()?.sum_keepdim(1)?.sqrt()?;
    t.broadcast_div(&norm)
}

fn embed_err(e: impl Display) -> RagError {
    RagError::EmbeddingUnavailable(e.to_string())
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            vectors.extend(self.embed_batch(&refs)?);
        }
        Ok(vectors)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors.pop().ok_or_else(|| {
            RagError::EmbeddingUnavailable("model produced no output for query".to_string())
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_candidate_list_rejected() {
        let result = LocalEmbedder::load(&[]);
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_load_and_dimension() {
        let candidates: Vec<String> =
            DEFAULT_LOCAL_MODELS.iter().map(|m| m.to_string()).collect();
        let embedder = LocalEmbedder::load(&candidates).unwrap();
        assert!(embedder.dimension() > 0);
    }

    #[tokio::test]
    #[ignore] // Integration test - requires model download
    async fn test_embed_batch_shape_and_norm() {
        let candidates: Vec<String> =
            DEFAULT_LOCAL_MODELS.iter().map(|m| m.to_string()).collect();
        let embedder = LocalEmbedder::load(&candidates).unwrap();

        let texts = vec!["Hello".to_string(), "World".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        for v in &vectors {
            assert_eq!(v.len(), embedder.dimension());
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3);
        }
    }
}
