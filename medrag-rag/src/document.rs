//! Data types for documents, chunks, search results and answers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Separator inserted between pages when a document is flattened to text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A source document: one file with its page texts and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document. Defaults to the path as given;
    /// the PDF loader replaces it with the path relative to its directory.
    pub id: String,
    /// Path of the file the pages were extracted from.
    pub path: PathBuf,
    /// Extracted text, one entry per page, in page order.
    pub pages: Vec<String>,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Build a document for a file, filling in `source` and `file_name` metadata.
    pub fn from_pages(path: impl Into<PathBuf>, pages: Vec<String>) -> Self {
        let path = path.into();
        let id = path.display().to_string();
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), id.clone());
        if let Some(name) = path.file_name() {
            metadata.insert("file_name".to_string(), name.to_string_lossy().into_owned());
        }
        Self { id, path, pages, metadata }
    }

    /// Replace the identifier chunk ids are derived from.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// The whole document as one string, pages joined by [`PAGE_SEPARATOR`].
    pub fn text(&self) -> String {
        self.pages.join(PAGE_SEPARATOR)
    }

    /// Return `true` if no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    /// Return the 0-based page holding the character at `char_offset` of [`Document::text`].
    ///
    /// Offsets that fall on a separator are attributed to the following page;
    /// offsets past the end map to the last page.
    pub fn page_at(&self, char_offset: usize) -> usize {
        let separator_len = PAGE_SEPARATOR.chars().count();
        let mut page_end = 0;
        for (index, page) in self.pages.iter().enumerate() {
            page_end += page.chars().count();
            if char_offset < page_end {
                return index;
            }
            page_end += separator_len;
        }
        self.pages.len().saturating_sub(1)
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// File name of the originating document, if one can be determined.
    ///
    /// Prefers the `file_name` metadata field and falls back to the last
    /// component of `source`, which is all older collections carry.
    pub fn source_file_name(&self) -> Option<String> {
        if let Some(name) = self.metadata.get("file_name").filter(|n| !n.is_empty()) {
            return Some(name.clone());
        }
        let source = self.metadata.get("source").filter(|s| !s.is_empty())?;
        // Sources written on Windows use backslashes.
        let normalized = source.replace('\\', "/");
        Path::new(&normalized)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| Some(source.clone()))
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The reply to one question: generated text plus the chunk it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Text produced by the language model.
    pub answer: String,
    /// Raw text of the retrieved chunk.
    pub source_document: String,
    /// File name of the document the chunk came from, or `"N/A"`.
    pub doc: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: &[&str]) -> Document {
        Document::from_pages("data/guide.pdf", pages.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn from_pages_sets_source_metadata() {
        let d = doc(&["a"]);
        assert_eq!(d.id, "data/guide.pdf");
        assert_eq!(d.metadata.get("source").map(String::as_str), Some("data/guide.pdf"));
        assert_eq!(d.metadata.get("file_name").map(String::as_str), Some("guide.pdf"));
    }

    #[test]
    fn page_at_maps_offsets_across_separators() {
        let d = doc(&["abc", "de"]);
        assert_eq!(d.text(), "abc\n\nde");
        assert_eq!(d.page_at(0), 0);
        assert_eq!(d.page_at(2), 0);
        assert_eq!(d.page_at(3), 1);
        assert_eq!(d.page_at(5), 1);
        assert_eq!(d.page_at(100), 1);
    }

    #[test]
    fn blank_document() {
        assert!(doc(&["  ", "\n"]).is_blank());
        assert!(!doc(&["", "x"]).is_blank());
    }

    #[test]
    fn source_file_name_falls_back_to_source_path() {
        let mut chunk = Chunk {
            id: "c".into(),
            text: "t".into(),
            embedding: vec![],
            metadata: HashMap::new(),
            document_id: "d".into(),
        };
        assert_eq!(chunk.source_file_name(), None);

        chunk.metadata.insert("source".into(), r"C:\docs\data\aspirin.pdf".into());
        assert_eq!(chunk.source_file_name().as_deref(), Some("aspirin.pdf"));

        chunk.metadata.insert("file_name".into(), "fever.pdf".into());
        assert_eq!(chunk.source_file_name().as_deref(), Some("fever.pdf"));
    }
}
