use clap::Parser;
use medrag_cli::{ServeArgs, init_logging, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServeArgs::parse();
    init_logging("medrag-serve", args.log_json)?;

    serve::run(args).await
}
