//! MistralRsGenerator - the local model behind the `Generator` trait.

use std::sync::Arc;

use async_trait::async_trait;
use medrag_rag::Generator;
use mistralrs::{GgufModelBuilder, RequestBuilder, TextMessageRole, TextModelBuilder};
use tracing::{debug, info, instrument, warn};

use crate::config::{GenerationConfig, MistralRsConfig, ModelSource};
use crate::error::{MistralRsError, Result};

/// A mistral.rs model that completes rendered prompts with fixed sampling.
///
/// The model is loaded once and shared; each call to
/// [`generate`](Generator::generate) is an independent single-turn request.
///
/// # Example
///
/// ```rust,ignore
/// use medrag_mistralrs::{MistralRsConfig, MistralRsGenerator, ModelSource};
///
/// let config = MistralRsConfig::builder()
///     .model_source(ModelSource::gguf("models/meditron-7b.Q4_K_M.gguf"))
///     .build()?;
/// let generator = MistralRsGenerator::new(config).await?;
/// ```
pub struct MistralRsGenerator {
    model: Arc<mistralrs::Model>,
    name: String,
    generation: GenerationConfig,
}

impl MistralRsGenerator {
    /// Load the model described by `config`.
    ///
    /// # Errors
    ///
    /// - [`MistralRsError::InvalidConfig`] if the sampling parameters are invalid.
    /// - [`MistralRsError::ModelNotFound`] if a GGUF path does not point to a file.
    /// - [`MistralRsError::ModelLoad`] if mistral.rs cannot load the weights.
    #[instrument(skip(config), fields(model_source = ?config.model_source))]
    pub async fn new(config: MistralRsConfig) -> Result<Self> {
        config.generation.validate()?;
        let name = config.model_source.display_name();

        if let ModelSource::Gguf(path) = &config.model_source {
            if !path.is_file() {
                return Err(MistralRsError::ModelNotFound { path: path.display().to_string() });
            }
        }

        configure_threads(config.generation.threads);
        info!(model = %name, "loading local model");

        let model = match &config.model_source {
            ModelSource::Gguf(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| ".".to_string());
                let mut builder = GgufModelBuilder::new(dir, vec![name.clone()]);
                if let Some(tok) = &config.tokenizer_model_id {
                    builder = builder.with_tok_model_id(tok.clone());
                }
                if let Some(template) = &config.chat_template {
                    builder = builder.with_chat_template(template.clone());
                }
                if config.force_cpu {
                    builder = builder.with_force_cpu();
                }
                builder.with_logging().build().await
            }
            ModelSource::HuggingFace(id) => {
                let mut builder = TextModelBuilder::new(id.clone());
                if let Some(template) = &config.chat_template {
                    builder = builder.with_chat_template(template.clone());
                }
                if config.force_cpu {
                    builder = builder.with_force_cpu();
                }
                builder.with_logging().build().await
            }
        }
        .map_err(|e| MistralRsError::ModelLoad(e.to_string()))?;

        info!(model = %name, "model loaded");

        Ok(Self { model: Arc::new(model), name, generation: config.generation })
    }

    /// The sampling parameters applied to every request.
    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }

    fn request(&self, prompt: &str) -> RequestBuilder {
        let generation = &self.generation;
        RequestBuilder::new()
            .add_message(TextMessageRole::User, prompt)
            .set_sampler_max_len(generation.max_new_tokens)
            .set_sampler_temperature(generation.temperature)
            .set_sampler_topk(generation.top_k)
            .set_sampler_topp(generation.top_p)
            .set_sampler_frequency_penalty(generation.frequency_penalty())
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .model
            .send_chat_request(self.request(prompt))
            .await
            .map_err(|e| MistralRsError::Inference(e.to_string()))?;

        let choice = response.choices.first();
        if let Some(choice) = choice {
            debug!(
                finish_reason = %choice.finish_reason,
                completion_tokens = response.usage.completion_tokens,
                "generation finished"
            );
        }
        Ok(choice.and_then(|c| c.message.content.clone()).unwrap_or_default())
    }
}

/// Size the global rayon pool used for CPU inference.
///
/// The global pool can only be built once per process; later calls keep the
/// existing size.
fn configure_threads(threads: usize) {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        Ok(()) => debug!(threads, "configured inference threads"),
        Err(e) => warn!(threads, error = %e, "inference thread pool already initialised"),
    }
}

#[async_trait]
impl Generator for MistralRsGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, prompt), fields(model = %self.name, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> medrag_rag::Result<String> {
        self.complete(prompt).await.map_err(|e| e.into_rag_error(&self.name))
    }
}

impl std::fmt::Debug for MistralRsGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralRsGenerator")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .finish()
    }
}
