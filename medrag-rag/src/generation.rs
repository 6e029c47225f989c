//! Generator trait for the language model that writes the final answer.

use async_trait::async_trait;

use crate::error::Result;

/// A text generator that completes a fully rendered prompt.
///
/// Sampling parameters are fixed when the implementation is constructed;
/// callers only supply the prompt. Implementations must be safe to share
/// across concurrent requests.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Identifier of the loaded model, used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`](crate::RagError::GenerationError)
    /// if the model fails to produce output.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
