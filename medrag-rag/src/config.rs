//! Configuration for the RAG pipeline, plus the fixed deployment defaults.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use crate::error::{RagError, Result};

/// Qdrant REST endpoint used when none is configured.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Collection holding the ingested medical documents.
pub const DEFAULT_COLLECTION: &str = "vector_db_Medical";

/// Sentence embedding model shared by ingestion and query time.
pub const DEFAULT_EMBEDDING_MODEL: &str = "NeuML/pubmedbert-base-embeddings";

/// Directory scanned for PDF files during ingestion.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Which chunking strategy the pipeline uses.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Splitter {
    /// Sliding character window, see [`FixedSizeChunker`].
    #[default]
    Fixed,
    /// Separator-aware splitting, see [`RecursiveChunker`].
    Recursive,
}

impl FromStr for Splitter {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "recursive" => Ok(Self::Recursive),
            other => Err(RagError::ConfigError(format!(
                "unknown splitter '{other}', expected 'fixed' or 'recursive'"
            ))),
        }
    }
}

/// Chunking and retrieval settings. Defaults reproduce the deployed service:
/// 1000-character chunks overlapping by 100, and the single best match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Characters per chunk, at most.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk.
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Hits scoring below this are dropped. `None` keeps every hit, including
    /// negative cosine scores.
    pub similarity_threshold: Option<f32>,
    /// Chunks per embedding call and per upsert request.
    pub batch_size: usize,
    pub splitter: Splitter,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 1,
            similarity_threshold: None,
            batch_size: 64,
            splitter: Splitter::Fixed,
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The chunker for [`RagConfig::splitter`].
    pub fn chunker(&self) -> Arc<dyn Chunker> {
        match self.splitter {
            Splitter::Fixed => Arc::new(FixedSizeChunker::new(self.chunk_size, self.chunk_overlap)),
            Splitter::Recursive => {
                Arc::new(RecursiveChunker::new(self.chunk_size, self.chunk_overlap))
            }
        }
    }

    /// Check that the settings can drive a pipeline.
    ///
    /// # Errors
    ///
    /// [`RagError::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.chunk_size == 0 {
            Some("chunk_size must be at least 1".to_string())
        } else if self.chunk_overlap >= self.chunk_size {
            Some(format!(
                "chunk_overlap {} leaves no room in chunk_size {}",
                self.chunk_overlap, self.chunk_size
            ))
        } else if self.top_k == 0 {
            Some("top_k must be at least 1".to_string())
        } else if self.similarity_threshold.is_some_and(f32::is_nan) {
            Some("similarity_threshold must be a number".to_string())
        } else if self.batch_size == 0 {
            Some("batch_size must be at least 1".to_string())
        } else {
            None
        };
        problem.map_or(Ok(()), |message| Err(RagError::ConfigError(message)))
    }
}

/// Starts from [`RagConfig::default`]; [`build`](RagConfigBuilder::build)
/// runs [`RagConfig::validate`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, chars: usize) -> Self {
        self.config.chunk_size = chars;
        self
    }

    pub fn chunk_overlap(mut self, chars: usize) -> Self {
        self.config.chunk_overlap = chars;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn similarity_threshold(mut self, min_score: f32) -> Self {
        self.config.similarity_threshold = Some(min_score);
        self
    }

    pub fn batch_size(mut self, chunks: usize) -> Self {
        self.config.batch_size = chunks;
        self
    }

    pub fn splitter(mut self, splitter: Splitter) -> Self {
        self.config.splitter = splitter;
        self
    }

    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 1);
        assert_eq!(config.similarity_threshold, None);
        assert_eq!(config.splitter, Splitter::Fixed);
        assert_eq!(RagConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn rejects_inconsistent_values() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().batch_size(0).build().is_err());
        assert!(RagConfig::builder().similarity_threshold(f32::NAN).build().is_err());
    }

    #[test]
    fn splitter_parses_case_insensitively() {
        assert_eq!("Recursive".parse::<Splitter>().unwrap(), Splitter::Recursive);
        assert_eq!("fixed".parse::<Splitter>().unwrap(), Splitter::Fixed);
        assert!("sentences".parse::<Splitter>().is_err());
    }
}
