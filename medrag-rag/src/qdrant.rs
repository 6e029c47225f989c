//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] against
//! Qdrant's REST API (port 6333) using `reqwest`.
//!
//! Points carry the payload layout `{"page_content": ..., "metadata": {...}}`
//! so that collections written by other LangChain-style tooling can be
//! searched too. Point IDs are UUIDv5 digests of the chunk ID, which makes
//! re-ingesting the same document overwrite its points rather than
//! duplicate them.
//!
//! # Example
//!
//! ```rust,ignore
//! use medrag_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6333")?;
//! store.create_collection("vector_db_Medical", 768).await?;
//! store.upsert("vector_db_Medical", &chunks).await?;
//! let results = store.search("vector_db_Medical", &query_embedding, 1).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::DEFAULT_QDRANT_URL;
use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// Points sent per upsert request unless overridden.
const DEFAULT_UPSERT_BATCH: usize = 64;

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/) over REST.
///
/// Collections are created with cosine distance. No authentication is used
/// unless an API key is configured with [`with_api_key`](Self::with_api_key).
#[derive(Debug, Clone)]
pub struct QdrantVectorStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    batch_size: usize,
}

// ── Qdrant API request/response types ──────────────────────────────

#[derive(Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct ApiError {
    status: ApiErrorStatus,
}

#[derive(Deserialize)]
struct ApiErrorStatus {
    error: String,
}

#[derive(Serialize)]
struct PointsUpsert {
    points: Vec<Point>,
}

#[derive(Debug, Serialize)]
struct Point {
    id: String,
    vector: Vec<f32>,
    payload: Map<String, Value>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

// ── Construction and transport ─────────────────────────────────────

impl QdrantVectorStore {
    /// Create a new Qdrant vector store for the REST endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `url` is not an `http(s)` URL.
    pub fn new(url: &str) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RagError::ConfigError(format!(
                "qdrant url must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: None,
            batch_size: DEFAULT_UPSERT_BATCH,
        })
    }

    /// Create a new Qdrant vector store with the default URL (`http://localhost:6333`).
    pub fn default_url() -> Result<Self> {
        Self::new(DEFAULT_QDRANT_URL)
    }

    /// Send `api-key` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set how many points are sent per upsert request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Use an existing HTTP client (timeouts, proxies, TLS settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The REST endpoint this store talks to.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Send a request and unwrap Qdrant's `{"result": ...}` envelope.
    ///
    /// Transport failures and 5xx replies are [`RagError::VectorStoreError`];
    /// other 4xx replies mean Qdrant refused the request itself and become
    /// [`RagError::VectorStoreRejected`].
    async fn send<T: DeserializeOwned>(
        &self,
        collection: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "request failed");
            RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("request to {} failed: {e}", self.base_url),
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RagError::CollectionNotFound { collection: collection.to_string() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ApiError>(&body).map(|e| e.status.error).unwrap_or(body);
            let message = format!("API returned {status}: {detail}");
            error!(backend = BACKEND, %status, detail = %detail, "API error");
            return Err(if status.is_client_error() {
                RagError::VectorStoreRejected { backend: BACKEND.to_string(), message }
            } else {
                RagError::VectorStoreError { backend: BACKEND.to_string(), message }
            });
        }

        let parsed: ApiResponse<T> = response.json().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "failed to parse response");
            RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("failed to parse response: {e}"),
            }
        })?;
        Ok(parsed.result)
    }
}

// ── Payload mapping ────────────────────────────────────────────────

/// Qdrant accepts UUIDs or integers as point IDs; chunk IDs are mapped to a stable UUID.
fn point_id(chunk_id: &str) -> String {
    Uuid::parse_str(chunk_id)
        .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()))
        .to_string()
}

fn point_from_chunk(chunk: &Chunk) -> Result<Point> {
    if chunk.embedding.is_empty() {
        return Err(RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("chunk '{}' has no embedding", chunk.id),
        });
    }

    let metadata: Map<String, Value> =
        chunk.metadata.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();

    let mut payload = Map::new();
    payload.insert("page_content".to_string(), Value::String(chunk.text.clone()));
    payload.insert("metadata".to_string(), Value::Object(metadata));
    payload.insert("document_id".to_string(), Value::String(chunk.document_id.clone()));
    payload.insert("chunk_id".to_string(), Value::String(chunk.id.clone()));

    Ok(Point { id: point_id(&chunk.id), vector: chunk.embedding.clone(), payload })
}

/// Render a payload value as a metadata string. Nulls are dropped.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn chunk_from_point(point: ScoredPoint) -> SearchResult {
    let payload = point.payload.unwrap_or_default();
    let text = payload
        .get("page_content")
        .or_else(|| payload.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let metadata: HashMap<String, String> = payload
        .get("metadata")
        .and_then(Value::as_object)
        .map(|fields| {
            fields.iter().filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s))).collect()
        })
        .unwrap_or_default();

    let document_id = payload
        .get("document_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| metadata.get("source").cloned())
        .unwrap_or_default();

    let id = payload
        .get("chunk_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| value_to_string(&point.id))
        .unwrap_or_default();

    SearchResult {
        chunk: Chunk { id, text, embedding: vec![], metadata, document_id },
        score: point.score,
    }
}

// ── VectorStore implementation ─────────────────────────────────────

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let path = format!("/collections/{name}");
        match self.send::<Value>(name, self.request(Method::GET, &path)).await {
            Ok(_) => {
                debug!(collection = name, "qdrant collection already exists, skipping creation");
                return Ok(());
            }
            Err(RagError::CollectionNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let body = json!({ "vectors": { "size": dimensions, "distance": "Cosine" } });
        self.send::<Value>(name, self.request(Method::PUT, &path).json(&body)).await?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let path = format!("/collections/{name}");
        match self.send::<Value>(name, self.request(Method::DELETE, &path)).await {
            Ok(_) | Err(RagError::CollectionNotFound { .. }) => {
                debug!(collection = name, "deleted qdrant collection");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let path = format!("/collections/{collection}/points?wait=true");
        for batch in chunks.chunks(self.batch_size) {
            let points = batch.iter().map(point_from_chunk).collect::<Result<Vec<_>>>()?;
            self.send::<Value>(
                collection,
                self.request(Method::PUT, &path).json(&PointsUpsert { points }),
            )
            .await?;
        }

        debug!(collection, count = chunks.len(), "upserted chunks to qdrant");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let points: Vec<String> = ids.iter().map(|id| point_id(id)).collect();
        let path = format!("/collections/{collection}/points/delete?wait=true");
        let body = json!({ "points": points });
        self.send::<Value>(collection, self.request(Method::POST, &path).json(&body)).await?;

        debug!(collection, count = ids.len(), "deleted points from qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let path = format!("/collections/{collection}/points/search");
        let request = SearchRequest { vector: embedding, limit: top_k, with_payload: true };
        let points: Vec<ScoredPoint> =
            self.send(collection, self.request(Method::POST, &path).json(&request)).await?;

        Ok(points.into_iter().map(chunk_from_point).collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let path = format!("/collections/{collection}/points/count");
        let result: CountResult = self
            .send(collection, self.request(Method::POST, &path).json(&json!({ "exact": true })))
            .await?;
        Ok(result.count)
    }
}
