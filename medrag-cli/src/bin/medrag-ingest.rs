use clap::Parser;
use medrag_cli::{IngestArgs, ingest, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = IngestArgs::parse();
    init_logging("medrag-ingest", args.log_json)?;

    ingest::run(args).await.inspect_err(|e| tracing::error!(error = ?e, "ingestion failed"))?;
    Ok(())
}
