//! # medrag-telemetry
//!
//! Structured logging for the medrag binaries, built on `tracing`.
//!
//! Call [`init_telemetry`] (human-readable) or [`init_with_json`] (one JSON
//! object per line) once at the top of `main`. The filter comes from
//! `RUST_LOG` and defaults to [`DEFAULT_FILTER`].
//!
//! ```rust,ignore
//! medrag_telemetry::init_telemetry("medrag-serve")?;
//! tracing::info!(port = 8000, "listening");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

// Re-export the macros so binaries need only this crate.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialise human-readable logging. Later calls are no-ops.
pub fn init_telemetry(service_name: &str) -> Result<()> {
    init(service_name, LogFormat::Pretty)
}

/// Initialise JSON logging. Later calls are no-ops.
pub fn init_with_json(service_name: &str) -> Result<()> {
    init(service_name, LogFormat::Json)
}

/// Initialise logging in the given format. Only the first call in a process
/// installs a subscriber.
pub fn init(service_name: &str, format: LogFormat) -> Result<()> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::info!(service.name = service_name, ?format, "telemetry initialized");
    Ok(())
}

/// `RUST_LOG` if set and valid, else [`DEFAULT_FILTER`].
pub fn env_filter() -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            EnvFilter::try_new(DEFAULT_FILTER).map_err(|e| TelemetryError::Filter(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(env_filter().is_ok());
    }

    #[tokio::test]
    async fn repeated_initialization_is_a_noop() {
        init_telemetry("medrag-test").unwrap();
        init_telemetry("medrag-test").unwrap();
        init_with_json("medrag-test").unwrap();

        let span = tracing::info_span!("qa.answer", collection = "vector_db_Medical");
        let _guard = span.enter();
        info!(doc = "aspirin.pdf", "answered question");
    }
}
