//! # medrag-rag
//!
//! Document ingestion and retrieval-augmented question answering over a
//! collection of medical PDFs.
//!
//! ## Overview
//!
//! - **Ingestion**: [`loader::PdfDirectoryLoader`] reads PDFs page by page,
//!   a [`Chunker`] splits them into overlapping windows, an
//!   [`EmbeddingProvider`] embeds each chunk and a [`VectorStore`] keeps the
//!   result. [`RagPipeline`] drives the whole run.
//! - **Answering**: [`RetrievalQa`] embeds a question, retrieves the single
//!   best chunk, renders the [`PromptTemplate`] and hands it to a
//!   [`Generator`].
//!
//! ## Features
//!
//! | feature  | adds |
//! |----------|------|
//! | `candle` | [`bert::BertEmbeddingProvider`], local BERT embeddings |
//! | `qdrant` | [`qdrant::QdrantVectorStore`], Qdrant over its REST API |
//! | `pdf`    | [`loader`], PDF text extraction |
//! | `full`   | all of the above |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medrag_rag::*;
//!
//! let config = RagConfig::default();
//! let pipeline = RagPipeline::builder()
//!     .config(config)
//!     .embedder(Arc::new(bert::BertEmbeddingProvider::from_hub(DEFAULT_EMBEDDING_MODEL, "main")?))
//!     .store(Arc::new(qdrant::QdrantVectorStore::default_url()?))
//!     .build()?;
//!
//! let documents = loader::PdfDirectoryLoader::new("data").load()?;
//! pipeline.create_collection(DEFAULT_COLLECTION).await?;
//! pipeline.ingest_batch(DEFAULT_COLLECTION, &documents).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod qa;
pub mod vectorstore;

#[cfg(feature = "candle")]
pub mod bert;

#[cfg(feature = "pdf")]
pub mod loader;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{
    DEFAULT_COLLECTION, DEFAULT_DATA_DIR, DEFAULT_EMBEDDING_MODEL, DEFAULT_QDRANT_URL, RagConfig,
    RagConfigBuilder, Splitter,
};
pub use document::{Answer, Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::Generator;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{IngestReport, RagPipeline, RagPipelineBuilder};
pub use prompt::{DEFAULT_TEMPLATE, PromptTemplate};
pub use qa::RetrievalQa;
pub use vectorstore::VectorStore;
