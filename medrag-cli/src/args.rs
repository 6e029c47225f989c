//! Command-line and environment configuration for both binaries.
//!
//! Every flag can also be set through a `MEDRAG_*` environment variable.
//! With no flags at all the binaries use the deployment defaults from
//! [`medrag_rag::config`].

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser};
use medrag_mistralrs::{GenerationConfig, MistralRsConfig, ModelSource, default_threads};
use medrag_rag::bert::BertEmbeddingProvider;
use medrag_rag::qdrant::QdrantVectorStore;
use medrag_rag::{
    DEFAULT_COLLECTION, DEFAULT_DATA_DIR, DEFAULT_EMBEDDING_MODEL, DEFAULT_QDRANT_URL, RagConfig,
    Splitter,
};
use medrag_server::ServerConfig;

/// Vector store connection.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Qdrant REST endpoint
    #[arg(long, env = "MEDRAG_QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
    pub qdrant_url: String,

    /// API key sent as the `api-key` header
    #[arg(long, env = "MEDRAG_QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// Collection holding the document chunks
    #[arg(long, env = "MEDRAG_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,
}

impl StoreArgs {
    pub fn open(&self, batch_size: usize) -> anyhow::Result<QdrantVectorStore> {
        let mut store = QdrantVectorStore::new(&self.qdrant_url)
            .context("invalid qdrant url")?
            .with_batch_size(batch_size);
        if let Some(key) = &self.qdrant_api_key {
            store = store.with_api_key(key.clone());
        }
        Ok(store)
    }
}

/// Embedding model, which must be identical for ingestion and serving.
#[derive(Args, Debug, Clone)]
pub struct EmbeddingArgs {
    /// Hugging Face model id of the sentence embedding model
    #[arg(long, env = "MEDRAG_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Model revision (branch, tag or commit)
    #[arg(long, env = "MEDRAG_EMBEDDING_REVISION", default_value = "main")]
    pub embedding_revision: String,
}

impl EmbeddingArgs {
    /// Download (if needed) and load the embedding model off the async runtime.
    pub async fn load(&self) -> anyhow::Result<BertEmbeddingProvider> {
        let model = self.embedding_model.clone();
        let revision = self.embedding_revision.clone();
        tokio::task::spawn_blocking(move || BertEmbeddingProvider::from_hub(&model, &revision))
            .await
            .context("embedding model loader panicked")?
            .with_context(|| format!("failed to load embedding model {}", self.embedding_model))
    }
}

/// Load PDFs from a directory into the vector store.
#[derive(Parser, Debug, Clone)]
#[command(name = "medrag-ingest", version, about)]
pub struct IngestArgs {
    /// Directory containing the PDF files
    #[arg(long, env = "MEDRAG_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Also ingest PDFs in subdirectories
    #[arg(long, env = "MEDRAG_RECURSIVE")]
    pub recursive: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    /// Maximum characters per chunk
    #[arg(long, env = "MEDRAG_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "MEDRAG_CHUNK_OVERLAP", default_value_t = 100)]
    pub chunk_overlap: usize,

    /// Chunking strategy: `fixed` or `recursive`
    #[arg(long, env = "MEDRAG_SPLITTER", default_value = "fixed")]
    pub splitter: Splitter,

    /// Chunks embedded and upserted per request
    #[arg(long, env = "MEDRAG_BATCH_SIZE", default_value_t = 64)]
    pub batch_size: usize,

    /// Drop the collection before ingesting
    #[arg(long, env = "MEDRAG_RECREATE")]
    pub recreate: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "MEDRAG_LOG_JSON")]
    pub log_json: bool,
}

impl IngestArgs {
    pub fn rag_config(&self) -> anyhow::Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .batch_size(self.batch_size)
            .splitter(self.splitter)
            .build()
            .context("invalid chunking configuration")
    }
}

/// Serve the question answering web app.
#[derive(Parser, Debug, Clone)]
#[command(name = "medrag-serve", version, about)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "MEDRAG_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MEDRAG_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Path to the GGUF language model file
    #[arg(long, env = "MEDRAG_MODEL_PATH")]
    pub model_path: PathBuf,

    /// Hugging Face model id to load the tokenizer from instead of the GGUF file
    #[arg(long, env = "MEDRAG_TOKENIZER_MODEL_ID")]
    pub tokenizer_model_id: Option<String>,

    /// Chat template (Jinja) overriding the one embedded in the model
    #[arg(long, env = "MEDRAG_CHAT_TEMPLATE")]
    pub chat_template: Option<String>,

    /// Run the language model on the CPU only
    #[arg(long, env = "MEDRAG_FORCE_CPU")]
    pub force_cpu: bool,

    #[arg(long, env = "MEDRAG_MAX_NEW_TOKENS", default_value_t = 1024)]
    pub max_new_tokens: usize,

    #[arg(long, env = "MEDRAG_CONTEXT_LENGTH", default_value_t = 2048)]
    pub context_length: usize,

    #[arg(long, env = "MEDRAG_REPETITION_PENALTY", default_value_t = 1.1)]
    pub repetition_penalty: f32,

    #[arg(long, env = "MEDRAG_TEMPERATURE", default_value_t = 0.1)]
    pub temperature: f64,

    #[arg(long, env = "MEDRAG_TOP_K", default_value_t = 50)]
    pub top_k: usize,

    #[arg(long, env = "MEDRAG_TOP_P", default_value_t = 0.9)]
    pub top_p: f64,

    /// Inference threads [default: half the CPUs]
    #[arg(long, env = "MEDRAG_THREADS")]
    pub threads: Option<usize>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    /// Emit logs as JSON lines
    #[arg(long, env = "MEDRAG_LOG_JSON")]
    pub log_json: bool,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig { host: self.host.clone(), port: self.port }
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_new_tokens: self.max_new_tokens,
            context_length: self.context_length,
            repetition_penalty: self.repetition_penalty,
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            threads: self.threads.unwrap_or_else(default_threads),
        }
    }

    pub fn mistralrs_config(&self) -> anyhow::Result<MistralRsConfig> {
        let mut builder = MistralRsConfig::builder()
            .model_source(ModelSource::gguf(&self.model_path))
            .force_cpu(self.force_cpu)
            .generation(self.generation_config());
        if let Some(id) = &self.tokenizer_model_id {
            builder = builder.tokenizer_model_id(id.clone());
        }
        if let Some(template) = &self.chat_template {
            builder = builder.chat_template(template.clone());
        }
        builder.build().context("invalid language model configuration")
    }
}
