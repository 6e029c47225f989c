//! `medrag-ingest`: load PDFs, chunk, embed, store.

use std::sync::Arc;

use anyhow::Context;
use medrag_rag::loader::PdfDirectoryLoader;
use medrag_rag::{IngestReport, RagPipeline};
use tracing::info;

use crate::args::IngestArgs;

/// Run one ingestion. Any error aborts the whole run.
pub async fn run(args: IngestArgs) -> anyhow::Result<IngestReport> {
    let config = args.rag_config()?;

    let loader = PdfDirectoryLoader::new(&args.data_dir).recursive(args.recursive);
    let documents = tokio::task::spawn_blocking(move || loader.load())
        .await
        .context("pdf loader panicked")?
        .with_context(|| format!("failed to load pdfs from {}", args.data_dir.display()))?;
    info!(documents = documents.len(), dir = %args.data_dir.display(), "loaded documents");

    let embedder = args.embedding.load().await?;
    let store = args.store.open(config.batch_size)?;
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedder(Arc::new(embedder))
        .store(Arc::new(store))
        .build()?;

    let collection = args.store.collection.as_str();
    if args.recreate {
        info!(collection, "dropping collection");
        pipeline.delete_collection(collection).await.context("failed to drop collection")?;
    }
    pipeline.create_collection(collection).await.context("failed to create collection")?;

    let report = pipeline
        .ingest_batch(collection, &documents)
        .await
        .with_context(|| format!("ingestion into '{collection}' failed"))?;

    info!(
        collection,
        documents = report.documents,
        chunks = report.chunks,
        "vector db '{collection}' created successfully"
    );
    Ok(report)
}
