//! Prompt template with `{context}` and `{question}` placeholders.

use crate::error::{RagError, Result};

/// The template used to ground answers in the retrieved chunk.
pub const DEFAULT_TEMPLATE: &str = "\
Use the following pieces of information to answer the user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.

Context: {context}
Question: {question}

Only return the helpful answer below and nothing else.
Helpful answer:
";

const CONTEXT: &str = "{context}";
const QUESTION: &str = "{question}";

/// A prompt template with exactly two placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string() }
    }
}

impl PromptTemplate {
    /// Create a template, checking both placeholders are present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `{context}` or `{question}` is missing.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT, QUESTION] {
            if !template.contains(placeholder) {
                return Err(RagError::ConfigError(format!(
                    "prompt template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute `context` and `question` into the template.
    ///
    /// Substitution is a single left-to-right pass, so placeholder text that
    /// appears inside the substituted values is left alone.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut rendered =
            String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        loop {
            let next = [(CONTEXT, context), (QUESTION, question)]
                .into_iter()
                .filter_map(|(placeholder, value)| {
                    rest.find(placeholder).map(|pos| (pos, placeholder, value))
                })
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, placeholder, value)) => {
                    rendered.push_str(&rest[..pos]);
                    rendered.push_str(value);
                    rest = &rest[pos + placeholder.len()..];
                }
                None => {
                    rendered.push_str(rest);
                    break;
                }
            }
        }

        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_renders_both_values() {
        let prompt =
            PromptTemplate::default().render("Aspirin reduces fever.", "What reduces fever?");
        assert!(prompt.contains("Context: Aspirin reduces fever.\n"));
        assert!(prompt.contains("Question: What reduces fever?\n"));
        assert!(prompt.ends_with("Helpful answer:\n"));
    }

    #[test]
    fn placeholders_in_values_are_not_expanded() {
        let template = PromptTemplate::new("[{context}] [{question}]").unwrap();
        assert_eq!(template.render("{question}", "{context}"), "[{question}] [{context}]");
    }

    #[test]
    fn rejects_template_without_placeholders() {
        assert!(PromptTemplate::new("Question: {question}").is_err());
        assert!(PromptTemplate::new("Context: {context}").is_err());
    }
}
