//! Sentence-aware text chunking
//!
//! Page text is cleaned, split into sentences and packed into chunks of at
//! most `chunk_size` bytes. Each chunk after the first starts with up to
//! `overlap_size` bytes carried over from the end of the previous one.

use crate::config::ChunkingConfig;
use crate::storage::{Chunk, Document, Metadata};
use serde_json::json;
use sha2::{Digest, Sha256};

/// A chunk of cleaned text before it is attached to a document
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Position among the emitted chunks of one text
    pub index: usize,
    pub text: String,
    /// Byte offset of the chunk in the cleaned text
    pub start: usize,
}

/// Splits text into overlapping chunks
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap_size: usize,
    min_chunk_size: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            overlap_size: config.overlap_size.min(config.chunk_size.saturating_sub(1)),
            min_chunk_size: config.min_chunk_size,
        }
    }

    /// Chunks a document's content into storable chunks
    ///
    /// Every chunk carries the document's title and URL in its metadata so the
    /// search backends can return them without a storage lookup.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.content)
            .into_iter()
            .map(|span| {
                let mut metadata = Metadata::new();
                metadata.insert("title".to_string(), json!(document.title));
                metadata.insert("url".to_string(), json!(document.url));
                metadata.insert("chunk_index".to_string(), json!(span.index));
                metadata.insert("chunk_size".to_string(), json!(span.text.len()));
                metadata.insert("start_pos".to_string(), json!(span.start));
                metadata.insert("end_pos".to_string(), json!(span.start + span.text.len()));

                Chunk {
                    id: chunk_id(span.index, &span.text),
                    document_id: document.id.clone(),
                    chunk_index: span.index,
                    text: span.text,
                    metadata,
                }
            })
            .collect()
    }

    /// Splits raw text into chunk spans
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(&cleaned) {
            for piece in split_oversized(sentence, self.chunk_size) {
                let needed = if current.is_empty() {
                    piece.len()
                } else {
                    current.len() + 1 + piece.len()
                };

                if needed > self.chunk_size && !current.is_empty() {
                    let overlap = overlap_tail(&current, self.overlap_size).to_string();
                    self.emit(&cleaned, &current, &mut spans);

                    current.clear();
                    if overlap.len() + 1 + piece.len() <= self.chunk_size {
                        current.push_str(&overlap);
                    }
                }

                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(piece);
            }
        }

        if !current.is_empty() {
            self.emit(&cleaned, &current, &mut spans);
        }

        spans
    }

    fn emit(&self, cleaned: &str, text: &str, spans: &mut Vec<TextSpan>) {
        let text = text.trim();
        if text.len() < self.min_chunk_size || text.is_empty() {
            return;
        }

        let start = cleaned.find(text).unwrap_or(0);
        spans.push(TextSpan {
            index: spans.len(),
            text: text.to_string(),
            start,
        });
    }
}

/// Stable chunk id: hex of the first 8 bytes of SHA-256(`"{index}-{text}"`)
pub fn chunk_id(index: usize, text: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}", index, text).as_bytes());
    hex::encode(&digest[..8])
}

/// Collapses whitespace runs to single spaces and drops control characters
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Splits cleaned text after runs of `.`, `!` or `?` followed by a space
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminator = false;

    for (i, c) in text.char_indices() {
        match c {
            '.' | '!' | '?' => in_terminator = true,
            ' ' if in_terminator => {
                let sentence = text[start..i].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = i + 1;
                in_terminator = false;
            }
            _ => in_terminator = false,
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// Breaks a sentence longer than `limit` bytes into word-aligned pieces
fn split_oversized(sentence: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = sentence;

    while rest.len() > limit {
        let mut cut = floor_char_boundary(rest, limit);
        if let Some(space) = rest[..cut].rfind(' ') {
            if space > 0 {
                cut = space;
            }
        }
        if cut == 0 {
            // A single character wider than the limit
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        pieces.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }

    pieces
}

/// Returns at most `max` trailing bytes of `text`, starting after a space
/// when one exists in that window
fn overlap_tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }

    let start = ceil_char_boundary(text, text.len() - max);
    let window = &text[start..];
    match window.find(' ') {
        Some(space) => &window[space + 1..],
        None => window,
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chunker(chunk_size: usize, overlap_size: usize, min_chunk_size: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size,
            overlap_size,
            min_chunk_size,
        })
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\n\n b\t c\u{7}d  "), "a b cd");
    }

    #[test]
    fn test_split_sentences_keeps_punctuation() {
        let sentences = split_sentences("One. Two!? Three v1.2 ok. Four");
        assert_eq!(sentences, vec!["One.", "Two!?", "Three v1.2 ok.", "Four"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunker(100, 20, 1).split("   \n ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let spans = chunker(100, 20, 1).split("Hello world. Bye.");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hello world. Bye.");
        assert_eq!(spans[0].start, 0);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota. Kappa lambda mu.";
        let spans = chunker(40, 15, 1).split(text);

        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.text.len() <= 40, "{:?}", span.text);
        }
        assert_eq!(spans.len(), 3);
        // Each chunk after the first opens with the tail of its predecessor
        assert!(spans[0].text.ends_with("epsilon zeta."));
        assert!(spans[1].text.starts_with("epsilon zeta."));
        assert_eq!(spans[2].text, "theta iota. Kappa lambda mu.");
        assert_eq!(spans[2].index, 2);
    }

    #[test]
    fn test_min_chunk_size_drops_small_chunks() {
        let spans = chunker(100, 10, 50).split("Too short.");
        assert!(spans.is_empty());
    }

    #[test]
    fn test_oversized_sentence_is_split_on_words() {
        let text = "word ".repeat(30);
        let spans = chunker(24, 0, 1).split(&text);

        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.text.len() <= 24);
            assert!(span.text.split(' ').all(|w| w == "word"));
        }
    }

    #[test]
    fn test_overlap_tail_respects_char_boundaries() {
        let text = "ééééé ééééé";
        let tail = overlap_tail(text, 7);
        assert!(text.ends_with(tail));
        assert!(tail.len() <= 7);
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let id = chunk_id(0, "hello");
        assert_eq!(id.len(), 16);
        assert_eq!(id, chunk_id(0, "hello"));
        assert_ne!(id, chunk_id(1, "hello"));
    }

    #[test]
    fn test_chunk_document_attaches_metadata() {
        let now = Utc::now();
        let document = Document {
            id: "doc-1".to_string(),
            url: "https://example.com/".to_string(),
            title: "Example".to_string(),
            content: "First sentence here. Second sentence here.".to_string(),
            meta_description: String::new(),
            content_hash: "doc-1".to_string(),
            depth: 0,
            created_at: now,
            updated_at: now,
        };

        let chunks = chunker(1000, 200, 1).chunk_document(&document);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, "doc-1");
        assert_eq!(chunks[0].id, chunk_id(0, &chunks[0].text));
        assert_eq!(chunks[0].metadata.get("title"), Some(&json!("Example")));
        assert_eq!(chunks[0].metadata.get("url"), Some(&json!("https://example.com/")));
    }
}
