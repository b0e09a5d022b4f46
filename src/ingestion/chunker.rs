//! Text cleaning and overlap-aware chunking.

use regex::Regex;
use tracing::info;

use crate::types::{Chunk, ChunkMetadata, Document};

/// Split separators in priority order. Paragraph breaks are preferred over
/// line breaks, sentence boundaries over plain spaces; a hard character cut
/// is the last resort when a window contains none of these.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Cleans document text and splits it into overlapping fixed-size chunks.
///
/// Pure over its input: [`TextChunker::process`] has no side effects beyond
/// the returned chunk sequence.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    whitespace: Regex,
    disallowed: Regex,
    repeated_dots: Regex,
}

impl TextChunker {
    /// Creates a chunker targeting `chunk_size` characters per chunk with
    /// `chunk_overlap` characters re-included at the start of the next
    /// chunk. The overlap is clamped below the chunk size so every step
    /// makes progress.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        Self {
            chunk_size,
            chunk_overlap,
            whitespace: Regex::new(r"\s+").expect("static regex"),
            disallowed: Regex::new(r#"[^\w\s.,!?;:()\-"]"#).expect("static regex"),
            repeated_dots: Regex::new(r"\.{2,}").expect("static regex"),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Normalizes raw document text: collapses whitespace runs to single
    /// spaces, strips characters outside word characters and basic
    /// punctuation, collapses repeated periods, and trims the edges.
    pub fn clean_text(&self, text: &str) -> String {
        let text = self.whitespace.replace_all(text, " ");
        let text = self.disallowed.replace_all(&text, "");
        let text = self.repeated_dots.replace_all(&text, ".");
        text.trim().to_string()
    }

    /// Cleans and chunks every document, attaching inherited metadata plus
    /// each chunk's position, sibling count, and character length.
    ///
    /// A document whose cleaned text is empty yields zero chunks.
    pub fn process(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for document in documents {
            let cleaned = self.clean_text(&document.text);
            if cleaned.is_empty() {
                continue;
            }

            let pieces = self.split_text(&cleaned);
            let total_chunks = pieces.len();
            for (chunk_id, content) in pieces.into_iter().enumerate() {
                let chunk_size = content.chars().count();
                chunks.push(Chunk {
                    content,
                    metadata: ChunkMetadata {
                        source: document.metadata.source.clone(),
                        file_name: document.metadata.file_name.clone(),
                        file_type: document.metadata.file_type.clone(),
                        loaded_at: document.metadata.loaded_at,
                        chunk_id,
                        total_chunks,
                        chunk_size,
                    },
                });
            }
        }

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "processed documents into chunks"
        );
        chunks
    }

    /// Splits cleaned text into windows of at most `chunk_size` characters,
    /// preferring to end each window at the highest-priority separator
    /// found inside it. The next window starts `chunk_overlap` characters
    /// before the previous one ended.
    fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut pieces = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let mut split = end;

            if end < chars.len() {
                for sep in SEPARATORS {
                    let sep_chars: Vec<char> = sep.chars().collect();
                    if let Some(pos) = rfind(&chars[start..end], &sep_chars) {
                        let candidate = start + pos + sep_chars.len();
                        if candidate > start {
                            split = candidate;
                            break;
                        }
                    }
                }
            }

            let piece: String = chars[start..split].iter().collect();
            if !piece.trim().is_empty() {
                pieces.push(piece);
            }

            if split >= chars.len() {
                break;
            }

            let next = split.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { split };
        }

        pieces
    }
}

/// Index of the last occurrence of `needle` in `haystack`, by character.
fn rfind(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}
