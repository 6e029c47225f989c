//! A [`VectorStore`] held in process memory.
//!
//! Behaves like the Qdrant backend as far as callers can tell: cosine
//! scores, upsert by chunk id, fixed vector size per collection, and
//! [`RagError::CollectionNotFound`] for unknown collections. Used by the
//! tests and for trying the pipeline without a running Qdrant.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    points: HashMap<String, Chunk>,
}

#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::CollectionNotFound { collection: collection.to_string() }
}

fn rejected(message: String) -> RagError {
    RagError::VectorStoreRejected { backend: "InMemory".to_string(), message }
}

/// Cosine of the angle between `a` and `b`; 0.0 when either is all zeros.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        aa += x * x;
        bb += y * y;
    }
    let norms = aa.sqrt() * bb.sqrt();
    if norms == 0.0 { 0.0 } else { dot / norms }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, points: HashMap::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut guard = self.collections.write().await;
        let target = guard.get_mut(collection).ok_or_else(|| missing(collection))?;

        // Validate the whole batch before touching the collection.
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != target.dimensions) {
            return Err(rejected(format!(
                "chunk '{}' has {} dimensions, collection '{collection}' expects {}",
                bad.id,
                bad.embedding.len(),
                target.dimensions
            )));
        }

        target.points.extend(chunks.iter().map(|c| (c.id.clone(), c.clone())));
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut guard = self.collections.write().await;
        let target = guard.get_mut(collection).ok_or_else(|| missing(collection))?;
        target.points.retain(|id, _| !ids.contains(&id.as_str()));
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let guard = self.collections.read().await;
        let target = guard.get(collection).ok_or_else(|| missing(collection))?;
        if embedding.len() != target.dimensions {
            return Err(rejected(format!(
                "query has {} dimensions, collection '{collection}' expects {}",
                embedding.len(),
                target.dimensions
            )));
        }

        let mut hits: Vec<SearchResult> = target
            .points
            .values()
            .map(|chunk| SearchResult {
                score: cosine(&chunk.embedding, embedding),
                chunk: chunk.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let guard = self.collections.read().await;
        guard.get(collection).map(|c| c.points.len()).ok_or_else(|| missing(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: id.to_string(),
            embedding,
            metadata: HashMap::new(),
            document_id: "doc".to_string(),
        }
    }

    #[test]
    fn cosine_handles_zero_and_parallel_vectors() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unknown_collection_is_not_found() {
        let store = InMemoryVectorStore::new();
        let err = store.search("nope", &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::CollectionNotFound { .. }));
        assert!(matches!(store.count("nope").await, Err(RagError::CollectionNotFound { .. })));
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_delete_removes() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let both = [chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])];
        store.upsert("c", &both).await.unwrap();
        store.upsert("c", &[chunk("a", vec![1.0, 1.0])]).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 2);

        store.delete("c", &["b"]).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_vector_size_rejects_the_batch() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let batch = [chunk("a", vec![1.0, 0.0]), chunk("b", vec![])];
        let err = store.upsert("c", &batch).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreRejected { .. }));
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_of_wrong_size_is_rejected() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let err = store.search("c", &[1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreRejected { .. }));
    }

    #[tokio::test]
    async fn recreating_keeps_existing_points() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();
        store.create_collection("c", 2).await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 1);
        assert!(store.search("c", &[1.0, 0.0], 0).await.unwrap().is_empty());
    }
}
