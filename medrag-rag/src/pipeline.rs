//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest and retrieval halves of the
//! workflow by composing an [`EmbeddingProvider`], a [`VectorStore`] and a
//! [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use medrag_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let config = RagConfig::default();
//! let pipeline = RagPipeline::builder()
//!     .config(config)
//!     .embedder(Arc::new(embedder))
//!     .store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.create_collection("docs").await?;
//! pipeline.ingest_batch("docs", &documents).await?;
//! let results = pipeline.retrieve("docs", "What reduces fever?", 1).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Totals for a completed ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Documents processed, including ones that produced no chunks.
    pub documents: usize,
    /// Chunks embedded and upserted.
    pub chunks: usize,
}

/// Chunk → embed → store on the way in, embed → search → filter on the way
/// out. Built with [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Create `name` sized to the embedder's output. Existing collections
    /// are left as is.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedder.dimensions();
        self.store.create_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
        })
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.store.delete_collection(name).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
        })
    }

    /// Records stored in `collection`.
    pub async fn count(&self, collection: &str) -> Result<usize> {
        self.store.count(collection).await
    }

    /// Chunk `document`, then embed and upsert the chunks `batch_size` at a
    /// time. Returns the stored chunks with their embeddings.
    ///
    /// # Errors
    ///
    /// Propagates the first embedding or vector store error unchanged.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, "document has no text, skipped");
            return Ok(chunks);
        }

        for batch in chunks.chunks_mut(self.config.batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: "pipeline".to_string(),
                    message: format!(
                        "expected {} embeddings for document '{}', got {}",
                        batch.len(),
                        document.id,
                        embeddings.len()
                    ),
                });
            }

            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            self.store.upsert(collection, batch).await.inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            })?;
            debug!(document.id = %document.id, batch_size = batch.len(), "stored batch");
        }

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// [`ingest`](RagPipeline::ingest) each document in order.
    ///
    /// # Errors
    ///
    /// Stops at the first document that fails; earlier documents stay stored.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for document in documents {
            let chunks = self.ingest(collection, document).await?;
            report.documents += 1;
            report.chunks += chunks.len();
        }
        Ok(report)
    }

    /// Embed `query` and return the `top_k` nearest chunks.
    ///
    /// Results are ordered by descending score. When a `similarity_threshold`
    /// is configured, hits below it are dropped.
    pub async fn retrieve(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await.inspect_err(|e| {
            error!(error = %e, "failed to embed query");
        })?;

        let mut hits =
            self.store.search(collection, &query_embedding, top_k).await.inspect_err(|e| {
                error!(collection, error = %e, "vector store search failed");
            })?;

        if let Some(min_score) = self.config.similarity_threshold {
            hits.retain(|hit| hit.score >= min_score);
        }
        debug!(collection, hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }

    /// [`retrieve`](RagPipeline::retrieve) with the configured `top_k`.
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        self.retrieve(collection, query, self.config.top_k).await
    }
}

/// Assembles a [`RagPipeline`]. The embedder and store are required; the
/// config defaults to [`RagConfig::default`] and the chunker to the one the
/// config selects.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the chunker chosen by the config's splitter.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// # Errors
    ///
    /// [`RagError::ConfigError`] when the embedder or the store is missing,
    /// or the config does not validate.
    pub fn build(self) -> Result<RagPipeline> {
        let Some(embedder) = self.embedder else {
            return Err(RagError::ConfigError("pipeline needs an embedding provider".into()));
        };
        let Some(store) = self.store else {
            return Err(RagError::ConfigError("pipeline needs a vector store".into()));
        };
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let chunker = self.chunker.unwrap_or_else(|| config.chunker());

        Ok(RagPipeline { config, embedder, store, chunker })
    }
}
