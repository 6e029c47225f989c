//! Error types for medrag-mistralrs.

use medrag_rag::RagError;
use thiserror::Error;

/// Errors that can occur when loading or running the local model.
#[derive(Debug, Error)]
pub enum MistralRsError {
    /// Model loading failed
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// Model file not found
    #[error("Model not found at path: {path}")]
    ModelNotFound { path: String },

    /// Inference failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MistralRsError {
    /// Convert into the retrieval layer's error, tagged with the model name.
    pub fn into_rag_error(self, model: &str) -> RagError {
        RagError::GenerationError { model: model.to_string(), message: self.to_string() }
    }
}

/// Result type alias for MistralRsError
pub type Result<T> = std::result::Result<T, MistralRsError>;
