//! # medrag-mistralrs
//!
//! Local GGUF language model for medrag answers, running in-process on
//! [mistral.rs](https://github.com/EricLBuehler/mistral.rs).
//!
//! > **Note:** This crate is NOT published to crates.io because mistral.rs depends on
//! > unpublished git dependencies.
//!
//! [`MistralRsGenerator`] implements [`medrag_rag::Generator`] with the
//! sampling parameters fixed in [`GenerationConfig`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use medrag_mistralrs::{MistralRsConfig, MistralRsGenerator, ModelSource};
//! use medrag_rag::Generator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MistralRsConfig::builder()
//!         .model_source(ModelSource::gguf("models/meditron-7b.Q4_K_M.gguf"))
//!         .tokenizer_model_id("epfl-llm/meditron-7b")
//!         .build()?;
//!     let generator = MistralRsGenerator::new(config).await?;
//!     println!("{}", generator.generate("What reduces fever?").await?);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::*;
pub use config::*;
pub use error::*;
