//! Configuration types for loading and sampling the local model.

use std::path::PathBuf;

use crate::error::{MistralRsError, Result};

/// Where the model weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A single quantized GGUF file on disk
    Gguf(PathBuf),
    /// A HuggingFace model ID, downloaded on first use
    HuggingFace(String),
}

impl ModelSource {
    /// Create a GGUF model source
    pub fn gguf(path: impl Into<PathBuf>) -> Self {
        Self::Gguf(path.into())
    }

    /// Create a HuggingFace model source
    pub fn huggingface(model_id: impl Into<String>) -> Self {
        Self::HuggingFace(model_id.into())
    }

    /// Human-readable identifier used in logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            Self::Gguf(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::HuggingFace(id) => id.clone(),
        }
    }
}

/// Fixed sampling parameters applied to every answer.
///
/// Defaults reproduce the settings of the service this crate was built for:
/// a near-deterministic temperature with a small repetition penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub max_new_tokens: usize,
    pub context_length: usize,
    pub repetition_penalty: f32,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    /// CPU threads used for inference
    pub threads: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 1024,
            context_length: 2048,
            repetition_penalty: 1.1,
            temperature: 0.1,
            top_k: 50,
            top_p: 0.9,
            threads: default_threads(),
        }
    }
}

/// Half the available CPUs, at least one.
pub fn default_threads() -> usize {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cpus / 2).max(1)
}

impl GenerationConfig {
    /// Check the parameters are usable together.
    ///
    /// # Errors
    ///
    /// Returns [`MistralRsError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MistralRsError::InvalidConfig(msg));

        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return invalid(format!("temperature must be >= 0, got {}", self.temperature));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return invalid(format!("top_p must be in (0, 1], got {}", self.top_p));
        }
        if self.top_k == 0 {
            return invalid("top_k must be greater than 0".to_string());
        }
        if self.max_new_tokens == 0 {
            return invalid("max_new_tokens must be greater than 0".to_string());
        }
        if self.max_new_tokens >= self.context_length {
            return invalid(format!(
                "max_new_tokens ({}) must be less than context_length ({})",
                self.max_new_tokens, self.context_length
            ));
        }
        if !self.repetition_penalty.is_finite() || self.repetition_penalty < 1.0 {
            return invalid(format!(
                "repetition_penalty must be >= 1.0, got {}",
                self.repetition_penalty
            ));
        }
        if self.threads == 0 {
            return invalid("threads must be at least 1".to_string());
        }
        Ok(())
    }

    /// The repetition penalty expressed as mistral.rs's additive frequency penalty.
    pub fn frequency_penalty(&self) -> f32 {
        self.repetition_penalty - 1.0
    }
}

/// Configuration for the local model.
#[derive(Debug, Clone)]
pub struct MistralRsConfig {
    /// Model source: GGUF file or HuggingFace ID
    pub model_source: ModelSource,

    /// HuggingFace model ID to take the tokenizer from (optional, GGUF only)
    pub tokenizer_model_id: Option<String>,

    /// Custom chat template (optional)
    pub chat_template: Option<String>,

    /// Run on the CPU even when an accelerator is compiled in
    pub force_cpu: bool,

    pub generation: GenerationConfig,
}

impl MistralRsConfig {
    /// Create a new config builder
    pub fn builder() -> MistralRsConfigBuilder {
        MistralRsConfigBuilder::default()
    }
}

/// Builder for MistralRsConfig
#[derive(Debug, Clone, Default)]
pub struct MistralRsConfigBuilder {
    model_source: Option<ModelSource>,
    tokenizer_model_id: Option<String>,
    chat_template: Option<String>,
    force_cpu: bool,
    generation: GenerationConfig,
}

impl MistralRsConfigBuilder {
    /// Set the model source
    pub fn model_source(mut self, source: ModelSource) -> Self {
        self.model_source = Some(source);
        self
    }

    /// Take the tokenizer from a HuggingFace model instead of GGUF metadata
    pub fn tokenizer_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.tokenizer_model_id = Some(model_id.into());
        self
    }

    /// Set custom chat template
    pub fn chat_template(mut self, template: impl Into<String>) -> Self {
        self.chat_template = Some(template.into());
        self
    }

    pub fn force_cpu(mut self, force_cpu: bool) -> Self {
        self.force_cpu = force_cpu;
        self
    }

    /// Replace all sampling parameters
    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.generation.max_new_tokens = max_new_tokens;
        self
    }

    pub fn context_length(mut self, context_length: usize) -> Self {
        self.generation.context_length = context_length;
        self
    }

    pub fn repetition_penalty(mut self, penalty: f32) -> Self {
        self.generation.repetition_penalty = penalty;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.generation.temperature = temperature;
        self
    }

    /// Set top_k
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.generation.top_k = top_k;
        self
    }

    /// Set top_p
    pub fn top_p(mut self, top_p: f64) -> Self {
        self.generation.top_p = top_p;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.generation.threads = threads;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MistralRsError::InvalidConfig`] if no model source was set
    /// or the sampling parameters are invalid.
    pub fn build(self) -> Result<MistralRsConfig> {
        let model_source = self
            .model_source
            .ok_or_else(|| MistralRsError::InvalidConfig("model_source is required".to_string()))?;
        self.generation.validate()?;

        Ok(MistralRsConfig {
            model_source,
            tokenizer_model_id: self.tokenizer_model_id,
            chat_template: self.chat_template,
            force_cpu: self.force_cpu,
            generation: self.generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_settings() {
        let generation = GenerationConfig::default();
        assert_eq!(generation.max_new_tokens, 1024);
        assert_eq!(generation.context_length, 2048);
        assert_eq!(generation.repetition_penalty, 1.1);
        assert_eq!(generation.temperature, 0.1);
        assert_eq!(generation.top_k, 50);
        assert_eq!(generation.top_p, 0.9);
        assert!(generation.threads >= 1);
        assert!(generation.validate().is_ok());
    }

    #[test]
    fn builder_requires_model_source() {
        let err = MistralRsConfig::builder().build().unwrap_err();
        assert!(matches!(err, MistralRsError::InvalidConfig(_)));
    }

    #[test]
    fn builder_collects_options() {
        let config = MistralRsConfig::builder()
            .model_source(ModelSource::gguf("/models/meditron-7b.Q4_K_M.gguf"))
            .tokenizer_model_id("epfl-llm/meditron-7b")
            .force_cpu(true)
            .threads(2)
            .build()
            .unwrap();

        assert_eq!(config.model_source.display_name(), "meditron-7b.Q4_K_M.gguf");
        assert_eq!(config.tokenizer_model_id.as_deref(), Some("epfl-llm/meditron-7b"));
        assert!(config.force_cpu);
        assert_eq!(config.generation.threads, 2);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let source = ModelSource::huggingface("test/model");
        let base = || MistralRsConfig::builder().model_source(source.clone());

        assert!(base().temperature(-0.1).build().is_err());
        assert!(base().top_p(0.0).build().is_err());
        assert!(base().top_p(1.5).build().is_err());
        assert!(base().max_new_tokens(2048).context_length(2048).build().is_err());
        assert!(base().threads(0).build().is_err());
        assert!(base().top_p(1.0).temperature(0.0).build().is_ok());
    }

    #[test]
    fn frequency_penalty_is_offset_from_one() {
        let generation = GenerationConfig { repetition_penalty: 1.1, ..Default::default() };
        assert!((generation.frequency_penalty() - 0.1).abs() < 1e-6);
    }
}
