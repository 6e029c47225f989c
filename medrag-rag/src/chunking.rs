//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: sliding character window with a fixed overlap
//! - [`RecursiveChunker`]: splits on paragraphs, lines, then words, merging
//!   pieces back up to the window size with trailing overlap
//!
//! Both measure lengths in characters (Unicode scalar values), never bytes.

use std::collections::VecDeque;

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Build a chunk for `document`, inheriting its metadata.
fn make_chunk(document: &Document, index: usize, text: String, page: usize) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert("chunk_index".to_string(), index.to_string());
    metadata.insert("page".to_string(), page.to_string());
    Chunk {
        id: format!("{}_{index}", document.id),
        text,
        embedding: Vec::new(),
        metadata,
        document_id: document.id.clone(),
    }
}

/// Splits text into fixed-size windows by character count with a fixed overlap.
///
/// Every window holds at most `chunk_size` characters and consecutive windows
/// share exactly `chunk_overlap` characters. The final window ends at the end
/// of the text, so every character lands in at least one chunk.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus `chunk_index` and `page` fields.
///
/// # Example
///
/// ```rust,ignore
/// use medrag_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 100);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.is_blank() {
            return Vec::new();
        }

        let text = document.text();
        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = boundaries.len() - 1;
        let window = self.chunk_size.max(1);

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + window).min(char_count);
            let chunk_text = text[boundaries[start]..boundaries[end]].to_string();
            chunks.push(make_chunk(document, chunks.len(), chunk_text, document.page_at(start)));

            if end == char_count {
                break;
            }
            start += self.step();
        }

        chunks
    }
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Text is split on the first separator that occurs in it. Pieces shorter
/// than `chunk_size` are merged back together (joined by that separator)
/// until the next piece would overflow; pieces that are too long on their own
/// are split again with the next separator. When a chunk is emitted, trailing
/// pieces totalling at most `chunk_overlap` characters are carried into the
/// next one.
///
/// # Example
///
/// ```rust,ignore
/// use medrag_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 100);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters carried into the next chunk
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                chunks.extend(self.merge_pieces(&short_pieces, separator));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_text(piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge_pieces(&short_pieces, separator));
        }

        chunks
    }

    fn merge_pieces(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        let joined_len = |total: usize, current: &VecDeque<&str>, next: usize| {
            total + next + if current.is_empty() { 0 } else { separator_len }
        };

        for piece in pieces {
            let len = char_len(piece);
            if joined_len(total, &current, len) > self.chunk_size && !current.is_empty() {
                push_trimmed(&mut chunks, &current, separator);
                while total > self.chunk_overlap
                    || (joined_len(total, &current, len) > self.chunk_size && total > 0)
                {
                    let Some(front) = current.pop_front() else { break };
                    total -= char_len(front) + if current.is_empty() { 0 } else { separator_len };
                }
            }
            total = joined_len(total, &current, len);
            current.push_back(piece);
        }

        push_trimmed(&mut chunks, &current, separator);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, pieces: &VecDeque<&str>, separator: &str) {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.is_blank() {
            return Vec::new();
        }

        let text = document.text();
        let raw_chunks = self.split_text(&text, &SEPARATORS);

        // Locate each chunk in the source text to attribute it to a page.
        let mut search_from = 0;
        raw_chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk_text)| {
                let page = match text[search_from..].find(&chunk_text) {
                    Some(found) => {
                        let start = search_from + found;
                        let first_len = chunk_text.chars().next().map_or(1, char::len_utf8);
                        search_from = (start + first_len).min(text.len());
                        document.page_at(char_len(&text[..start]))
                    }
                    None => document.page_at(char_len(&text[..search_from])),
                };
                make_chunk(document, i, chunk_text, page)
            })
            .collect()
    }
}
