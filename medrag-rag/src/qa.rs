//! Retrieval question answering: embed → retrieve one chunk → prompt → generate.
//!
//! [`RetrievalQa`] is built once at startup and shared across requests. It
//! holds no per-request state, so concurrent calls to
//! [`answer`](RetrievalQa::answer) are independent.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::document::Answer;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::pipeline::RagPipeline;
use crate::prompt::PromptTemplate;

/// Number of chunks used to ground an answer.
pub const ANSWER_TOP_K: usize = 1;

/// Placeholder reported when a chunk does not record its source file.
pub const UNKNOWN_SOURCE: &str = "N/A";

/// A retrieval-augmented question answering chain.
pub struct RetrievalQa {
    pipeline: Arc<RagPipeline>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    collection: String,
}

impl RetrievalQa {
    /// Create a chain answering from `collection` with the default prompt template.
    pub fn new(
        pipeline: Arc<RagPipeline>,
        generator: Arc<dyn Generator>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            generator,
            template: PromptTemplate::default(),
            collection: collection.into(),
        }
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// The collection answers are retrieved from.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The pipeline used for retrieval.
    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Answer `question` from the single best-matching chunk.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidQuery`] if the question is blank; nothing is embedded.
    /// - [`RagError::NoResults`] if retrieval returns no chunk.
    /// - embedding, vector store and generation errors are propagated unchanged.
    #[instrument(skip_all, fields(collection = %self.collection, model = self.generator.name()))]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidQuery("question must not be empty".to_string()));
        }

        let results = self.pipeline.retrieve(&self.collection, question, ANSWER_TOP_K).await?;
        let Some(best) = results.into_iter().next() else {
            info!("retrieval returned no chunks");
            return Err(RagError::NoResults { collection: self.collection.clone() });
        };
        debug!(chunk.id = %best.chunk.id, score = best.score, "retrieved context");

        let prompt = self.template.render(&best.chunk.text, question);
        let generated = self.generator.generate(&prompt).await.inspect_err(|e| {
            error!(error = %e, "generation failed");
        })?;

        let doc = best.chunk.source_file_name().unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
        info!(doc = %doc, answer_len = generated.len(), "answered question");

        Ok(Answer { answer: generated.trim().to_string(), source_document: best.chunk.text, doc })
    }
}
