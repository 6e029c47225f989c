//! Error types for the `medrag-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting, retrieving or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store backend could not be reached or failed internally.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store was reached but refused the request, e.g. a vector
    /// whose size does not match the collection.
    #[error("Vector store rejected the request ({backend}): {message}")]
    VectorStoreRejected {
        /// The vector store backend that refused the request.
        backend: String,
        /// The reason it gave.
        message: String,
    },

    /// The named collection does not exist in the vector store.
    #[error("Collection '{collection}' does not exist")]
    CollectionNotFound {
        /// The collection that was addressed.
        collection: String,
    },

    /// Retrieval completed but returned no chunk to answer from.
    #[error("No matching documents found in collection '{collection}'")]
    NoResults {
        /// The collection that was searched.
        collection: String,
    },

    /// A source document could not be discovered or read.
    #[error("Loader error ({path}): {message}")]
    LoaderError {
        /// The file or directory involved.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model failed to produce an answer.
    #[error("Generation error ({model}): {message}")]
    GenerationError {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The question submitted for answering was rejected.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
