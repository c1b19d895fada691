//! Text chunking for case law opinions
//!
//! Documents are split recursively on the highest-priority separator present
//! in the text, then the pieces are merged back up to the target size with a
//! bounded overlap between neighbouring chunks. Lengths are counted in
//! characters, never bytes.

mod boundaries;

pub use boundaries::*;

use crate::config::ChunkConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::store::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// A bounded text segment of a document with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Recursive separator-aware splitter
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    min_text_chars: usize,
}

impl Chunker {
    pub fn new(config: &ChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".into()));
        }
        if config.overlap >= config.chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be less than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            min_text_chars: config.min_text_chars,
        })
    }

    /// Split a document into metadata-tagged chunks.
    ///
    /// Documents with too little text yield no chunks.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let length = doc.plain_text.trim().chars().count();
        if length < self.min_text_chars {
            warn!(
                case_id = %doc.id,
                case_name = %doc.case_name,
                chars = length,
                "Case has insufficient text, skipping"
            );
            return Vec::new();
        }

        let texts = self.split_text(&doc.plain_text);
        let total = texts.len();
        debug!(case_id = %doc.id, chunks = total, "Chunked case");

        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                text,
                metadata: ChunkMetadata::for_document(doc, index, total),
            })
            .collect()
    }

    /// Chunk every document, logging corpus totals
    pub fn chunk_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = docs.iter().flat_map(|d| self.chunk_document(d)).collect();

        let average = if docs.is_empty() {
            0.0
        } else {
            chunks.len() as f64 / docs.len() as f64
        };
        info!(
            documents = docs.len(),
            chunks = chunks.len(),
            "Created {} chunks from {} cases (average {:.1} per case)",
            chunks.len(),
            docs.len(),
            average
        );
        chunks
    }

    /// Split raw text into trimmed, non-empty chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &Separator::PRIORITY)
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|s| s.occurs_in(text))
            .unwrap_or(separators.len().saturating_sub(1));
        let Some(&separator) = separators.get(position) else {
            return push_trimmed(Vec::new(), text);
        };
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in separator.split_keeping(text) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks = push_trimmed(chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Greedily join pieces up to the chunk size, keeping at most `overlap`
    /// characters of trailing context for the next chunk
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                chunks = push_trimmed(chunks, &join(&window));

                while total > self.overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            chunks = push_trimmed(chunks, &join(&window));
        }
        chunks
    }
}

/// Convenience wrapper: validate the config and chunk one document
pub fn chunk_document(doc: &Document, config: &ChunkConfig) -> Result<Vec<Chunk>> {
    Ok(Chunker::new(config)?.chunk_document(doc))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join(window: &VecDeque<(&str, usize)>) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(mut chunks: Vec<String>, text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    chunks
}
