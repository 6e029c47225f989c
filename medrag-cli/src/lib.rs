//! Wiring for the `medrag-ingest` and `medrag-serve` binaries.
//!
//! The binaries are thin: they parse [`args`], initialise logging and call
//! [`ingest::run`] or [`serve::run`].

pub mod args;
pub mod ingest;
pub mod serve;

pub use args::{EmbeddingArgs, IngestArgs, ServeArgs, StoreArgs};

/// Initialise logging for a binary.
pub fn init_logging(service: &str, json: bool) -> anyhow::Result<()> {
    if json {
        medrag_telemetry::init_with_json(service)?;
    } else {
        medrag_telemetry::init_telemetry(service)?;
    }
    Ok(())
}
