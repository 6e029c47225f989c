//! Ingestion and retrieval-QA tests against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use medrag_rag::{
    Document, EmbeddingProvider, Generator, InMemoryVectorStore, RagConfig, RagError, RagPipeline,
    Result, RetrievalQa, VectorStore,
};

const VOCAB: &[&str] = &["aspirin", "fever", "insulin", "diabetes", "bridge", "closed", "reduces"];

/// Bag-of-words embedder over a tiny fixed vocabulary.
#[derive(Default)]
struct WordCountEmbedder {
    calls: AtomicUsize,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl EmbeddingProvider for WordCountEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.is_some_and(|word| text.contains(word)) {
            return Err(RagError::EmbeddingError {
                provider: "word-count".to_string(),
                message: "refused".to_string(),
            });
        }
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> =
            VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect();
        // Keep every vector non-zero.
        vector.push(0.1);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        VOCAB.len() + 1
    }
}

/// Echoes a fixed answer and records the last prompt.
struct EchoGenerator {
    reply: String,
    last_prompt: std::sync::Mutex<Option<String>>,
}

impl EchoGenerator {
    fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), last_prompt: std::sync::Mutex::new(None) }
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(self.reply.clone())
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::GenerationError { model: "failing".to_string(), message: "boom".to_string() })
    }
}

fn pipeline(embedder: Arc<WordCountEmbedder>, store: Arc<InMemoryVectorStore>) -> RagPipeline {
    let config = RagConfig::default();
    RagPipeline::builder()
        .config(config)
        .embedder(embedder)
        .store(store)
        .build()
        .unwrap()
}

fn corpus() -> Vec<Document> {
    vec![
        Document::from_pages("data/aspirin.pdf", vec!["Aspirin reduces fever.".to_string()]),
        Document::from_pages("data/insulin.pdf", vec!["Insulin treats diabetes.".to_string()]),
        Document::from_pages("data/traffic.pdf", vec!["The bridge is closed.".to_string()]),
    ]
}

async fn populated() -> (Arc<RagPipeline>, Arc<WordCountEmbedder>) {
    let embedder = Arc::new(WordCountEmbedder::default());
    let pipeline = Arc::new(pipeline(embedder.clone(), Arc::new(InMemoryVectorStore::new())));
    pipeline.create_collection("vector_db_Medical").await.unwrap();
    let report = pipeline.ingest_batch("vector_db_Medical", &corpus()).await.unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.chunks, 3);
    (pipeline, embedder)
}

#[tokio::test]
async fn answers_from_the_best_matching_chunk() {
    let (pipeline, _) = populated().await;
    let generator = Arc::new(EchoGenerator::new("  Aspirin.\n"));
    let qa = RetrievalQa::new(pipeline, generator.clone(), "vector_db_Medical");

    let answer = qa.answer("What reduces fever?").await.unwrap();

    assert_eq!(answer.answer, "Aspirin.");
    assert_eq!(answer.source_document, "Aspirin reduces fever.");
    assert_eq!(answer.doc, "aspirin.pdf");

    let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Context: Aspirin reduces fever."));
    assert!(prompt.contains("Question: What reduces fever?"));
}

#[tokio::test]
async fn blank_question_is_rejected_before_embedding() {
    let (pipeline, embedder) = populated().await;
    let calls_before = embedder.calls.load(Ordering::SeqCst);
    let qa = RetrievalQa::new(pipeline, Arc::new(EchoGenerator::new("x")), "vector_db_Medical");

    let err = qa.answer("   ").await.unwrap_err();

    assert!(matches!(err, RagError::InvalidQuery(_)));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn empty_collection_reports_no_results() {
    let embedder = Arc::new(WordCountEmbedder::default());
    let pipeline = Arc::new(pipeline(embedder, Arc::new(InMemoryVectorStore::new())));
    pipeline.create_collection("vector_db_Medical").await.unwrap();
    let qa = RetrievalQa::new(pipeline, Arc::new(EchoGenerator::new("x")), "vector_db_Medical");

    let err = qa.answer("What reduces fever?").await.unwrap_err();
    assert!(matches!(err, RagError::NoResults { .. }));
}

#[tokio::test]
async fn missing_collection_is_not_flattened() {
    let embedder = Arc::new(WordCountEmbedder::default());
    let pipeline = Arc::new(pipeline(embedder, Arc::new(InMemoryVectorStore::new())));
    let qa = RetrievalQa::new(pipeline, Arc::new(EchoGenerator::new("x")), "vector_db_Medical");

    let err = qa.answer("What reduces fever?").await.unwrap_err();
    assert!(matches!(err, RagError::CollectionNotFound { .. }));
}

#[tokio::test]
async fn generation_failure_propagates() {
    let (pipeline, _) = populated().await;
    let qa = RetrievalQa::new(pipeline, Arc::new(FailingGenerator), "vector_db_Medical");

    let err = qa.answer("What reduces fever?").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationError { .. }));
}

#[tokio::test]
async fn ingestion_stops_at_first_failing_document() {
    let embedder = Arc::new(WordCountEmbedder { fail_on: Some("Insulin"), ..Default::default() });
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline(embedder, store.clone());
    pipeline.create_collection("vector_db_Medical").await.unwrap();

    let err = pipeline.ingest_batch("vector_db_Medical", &corpus()).await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }));
    // Only the document before the failure was stored.
    assert_eq!(store.count("vector_db_Medical").await.unwrap(), 1);
}

#[tokio::test]
async fn reingesting_overwrites_instead_of_duplicating() {
    let (pipeline, _) = populated().await;
    pipeline.ingest_batch("vector_db_Medical", &corpus()).await.unwrap();
    assert_eq!(pipeline.count("vector_db_Medical").await.unwrap(), 3);
}

#[tokio::test]
async fn similarity_threshold_filters_weak_matches() {
    let embedder = Arc::new(WordCountEmbedder::default());
    let config = RagConfig::builder().similarity_threshold(0.99).build().unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedder(embedder)
        .store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();
    pipeline.create_collection("c").await.unwrap();
    pipeline.ingest_batch("c", &corpus()).await.unwrap();

    let weak = pipeline.query("c", "Is the bridge open?").await.unwrap();
    assert!(weak.is_empty());

    let strong = pipeline.query("c", "insulin diabetes").await.unwrap();
    assert_eq!(strong.len(), 1);
    assert_eq!(strong[0].chunk.text, "Insulin treats diabetes.");
}

/// Questions point one way, stored text the other, so every hit scores below zero.
struct OpposingEmbedder;

#[async_trait]
impl EmbeddingProvider for OpposingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(if text.ends_with('?') { vec![1.0, 0.0] } else { vec![-1.0, 0.2] })
    }

    fn dimensions(&self) -> usize {
        2
    }
}

#[tokio::test]
async fn best_match_is_kept_even_with_negative_score() {
    let pipeline = RagPipeline::builder()
        .embedder(Arc::new(OpposingEmbedder))
        .store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();
    pipeline.create_collection("c").await.unwrap();
    pipeline.ingest_batch("c", &corpus()[..1]).await.unwrap();

    let hits = pipeline.query("c", "What reduces fever?").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].score < 0.0);

    let qa = RetrievalQa::new(Arc::new(pipeline), Arc::new(EchoGenerator::new("Aspirin.")), "c");
    let answer = qa.answer("What reduces fever?").await.unwrap();
    assert_eq!(answer.doc, "aspirin.pdf");
    assert_eq!(answer.source_document, "Aspirin reduces fever.");
}
