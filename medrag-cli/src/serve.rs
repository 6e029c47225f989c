//! `medrag-serve`: load the models once and serve the question form.

use std::sync::Arc;

use anyhow::Context;
use medrag_mistralrs::MistralRsGenerator;
use medrag_rag::{RagConfig, RagError, RagPipeline, RetrievalQa};
use medrag_server::{AppState, run_server};
use tracing::{info, warn};

use crate::args::ServeArgs;

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let model_config = args.mistralrs_config()?;

    let embedder = args.embedding.load().await?;
    let config = RagConfig::default();
    let store = args.store.open(config.batch_size)?;
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedder(Arc::new(embedder))
        .store(Arc::new(store))
        .build()?;

    let collection = args.store.collection.clone();
    report_collection(&pipeline, &collection).await;

    let generator = MistralRsGenerator::new(model_config)
        .await
        .with_context(|| format!("failed to load language model {}", args.model_path.display()))?;
    info!(model = %args.model_path.display(), "language model initialized");

    let qa = RetrievalQa::new(Arc::new(pipeline), Arc::new(generator), collection);
    run_server(args.server_config(), AppState::new(Arc::new(qa))).await
}

/// Log how many records the collection holds. Never fails: the store may come up later.
async fn report_collection(pipeline: &RagPipeline, collection: &str) {
    match pipeline.count(collection).await {
        Ok(0) => warn!(collection, "collection is empty; run medrag-ingest first"),
        Ok(records) => info!(collection, records, "collection ready"),
        Err(RagError::CollectionNotFound { .. }) => {
            warn!(collection, "collection does not exist; run medrag-ingest first")
        }
        Err(e) => warn!(collection, error = %e, "could not reach the vector store"),
    }
}
