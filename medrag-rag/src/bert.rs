//! Local BERT sentence embeddings with candle.
//!
//! This module is only available when the `candle` feature is enabled.
//!
//! [`BertEmbeddingProvider`] loads a BERT checkpoint (`config.json`,
//! `tokenizer.json`, `model.safetensors`) from the Hugging Face hub or from
//! local files and produces one vector per input by mean-pooling the final
//! hidden states under the attention mask. Inference runs on the CPU on
//! tokio's blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// BERT position embeddings stop at 512 tokens; longer inputs are truncated.
const MAX_SEQUENCE_LENGTH: usize = 512;

fn embed_err(model: &str, message: impl std::fmt::Display) -> RagError {
    RagError::EmbeddingError { provider: model.to_string(), message: message.to_string() }
}

struct BertInner {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl BertInner {
    fn encode(&self, texts: &[String], normalize: bool) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings =
            self.tokenizer.encode_batch(texts.to_vec(), true).map_err(candle_core::Error::msg)?;

        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over real tokens only: (batch, seq, hidden) × (batch, seq, 1).
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let mut pooled = summed.broadcast_div(&counts)?;

        if normalize {
            let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
            pooled = pooled.broadcast_div(&norms)?;
        }

        pooled.to_vec2::<f32>()
    }
}

/// An [`EmbeddingProvider`] running a BERT sentence-embedding model locally.
///
/// # Example
///
/// ```rust,ignore
/// use medrag_rag::bert::BertEmbeddingProvider;
///
/// let provider = BertEmbeddingProvider::from_hub("NeuML/pubmedbert-base-embeddings", "main")?;
/// let embedding = provider.embed("Aspirin reduces fever.").await?;
/// assert_eq!(embedding.len(), 768);
/// ```
pub struct BertEmbeddingProvider {
    inner: Arc<BertInner>,
    model_id: String,
    dimensions: usize,
    normalize: bool,
}

impl BertEmbeddingProvider {
    /// Download (or reuse the cached copy of) `model_id` at `revision` and load it.
    pub fn from_hub(model_id: &str, revision: &str) -> Result<Self> {
        let api = Api::new().map_err(|e| embed_err(model_id, format!("hub client: {e}")))?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));
        let fetch = |file: &str| {
            repo.get(file).map_err(|e| embed_err(model_id, format!("failed to fetch {file}: {e}")))
        };

        let config = fetch("config.json")?;
        let tokenizer = fetch("tokenizer.json")?;
        let weights = fetch("model.safetensors")?;
        Self::from_files(model_id, &config, &tokenizer, &weights)
    }

    /// Load a model from local files.
    pub fn from_files(
        model_id: &str,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
    ) -> Result<Self> {
        let raw = std::fs::read_to_string(config_path).map_err(|e| {
            embed_err(model_id, format!("failed to read {}: {e}", config_path.display()))
        })?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| embed_err(model_id, format!("invalid model config: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| embed_err(model_id, format!("failed to load tokenizer: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| embed_err(model_id, format!("invalid truncation: {e}")))?;

        let device = Device::Cpu;
        // SAFETY: the weights file is mapped read-only and is not modified while loaded.
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device) }
                .map_err(|e| embed_err(model_id, format!("failed to map weights: {e}")))?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| embed_err(model_id, format!("failed to load weights: {e}")))?;

        info!(model = model_id, dimensions = config.hidden_size, "loaded embedding model");

        Ok(Self {
            inner: Arc::new(BertInner { model, tokenizer, device }),
            model_id: model_id.to_string(),
            dimensions: config.hidden_size,
            normalize: true,
        })
    }

    /// Toggle L2 normalisation of the pooled vectors (on by default).
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// The model identifier this provider was loaded from.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl EmbeddingProvider for BertEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| embed_err(&self.model_id, "model returned no vector"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model_id, batch_size = texts.len(), "embedding batch");

        let inner = Arc::clone(&self.inner);
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let normalize = self.normalize;

        tokio::task::spawn_blocking(move || inner.encode(&owned, normalize))
            .await
            .map_err(|e| embed_err(&self.model_id, format!("embedding task failed: {e}")))?
            .map_err(|e| embed_err(&self.model_id, e))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EMBEDDING_MODEL;

    #[tokio::test]
    #[ignore = "downloads NeuML/pubmedbert-base-embeddings from the Hugging Face hub"]
    async fn embeddings_are_deterministic_and_normalized() {
        let provider = BertEmbeddingProvider::from_hub(DEFAULT_EMBEDDING_MODEL, "main").unwrap();
        assert_eq!(provider.dimensions(), 768);

        let a = provider.embed("Aspirin reduces fever.").await.unwrap();
        let b = provider.embed("Aspirin reduces fever.").await.unwrap();
        assert_eq!(a.len(), 768);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    #[ignore = "downloads NeuML/pubmedbert-base-embeddings from the Hugging Face hub"]
    async fn related_sentences_score_higher() {
        let provider = BertEmbeddingProvider::from_hub(DEFAULT_EMBEDDING_MODEL, "main").unwrap();
        let sentences = ["What reduces fever?", "Aspirin reduces fever.", "The bridge is closed."];
        let vectors = provider.embed_batch(&sentences).await.unwrap();
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&vectors[0], &vectors[1]) > dot(&vectors[0], &vectors[2]));
    }
}
