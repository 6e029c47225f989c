//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medrag_rag::RagError;
use serde::Serialize;
use thiserror::Error;

/// Body of every error response.
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// An error returned by a handler, rendered as `{"error": kind, "message": text}`.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self { status, kind, message: message.into() }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_query", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        match err {
            RagError::InvalidQuery(_) => Self::invalid_query(message),
            RagError::NoResults { .. } | RagError::CollectionNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "no_results", message)
            }
            RagError::VectorStoreError { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "vector_store_unavailable", message)
            }
            RagError::EmbeddingError { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "embedding_failed", message)
            }
            RagError::GenerationError { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "generation_failed", message)
            }
            RagError::VectorStoreRejected { .. }
            | RagError::LoaderError { .. }
            | RagError::ConfigError(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.kind.to_string(), message: self.message };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rag_errors_to_statuses() {
        let cases = [
            (RagError::InvalidQuery("empty".into()), StatusCode::BAD_REQUEST, "invalid_query"),
            (
                RagError::NoResults { collection: "c".into() },
                StatusCode::NOT_FOUND,
                "no_results",
            ),
            (
                RagError::CollectionNotFound { collection: "c".into() },
                StatusCode::NOT_FOUND,
                "no_results",
            ),
            (
                RagError::VectorStoreError { backend: "qdrant".into(), message: "refused".into() },
                StatusCode::SERVICE_UNAVAILABLE,
                "vector_store_unavailable",
            ),
            (
                RagError::EmbeddingError { provider: "bert".into(), message: "oom".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
                "embedding_failed",
            ),
            (
                RagError::GenerationError { model: "m".into(), message: "oom".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
                "generation_failed",
            ),
            (
                RagError::VectorStoreRejected {
                    backend: "qdrant".into(),
                    message: "Wrong input: Vector dimension error".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
            (RagError::ConfigError("bad".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ];

        for (err, status, kind) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.kind, kind);
        }
    }
}
