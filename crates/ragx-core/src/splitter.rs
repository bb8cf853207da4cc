//! Token text splitter used at indexing time

use crate::{Error, Result};

/// Splits text into chunks of at most `chunk_size` tokens, where tokens are
/// the pieces produced by splitting on `separator`. Consecutive chunks share
/// `chunk_overlap` trailing tokens.
#[derive(Debug, Clone)]
pub struct TokenTextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TokenTextSplitter {
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { separator: separator.into(), chunk_size, chunk_overlap })
    }

    /// Whitespace-separated splitter with no overlap
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self> {
        Self::new(" ", chunk_size, 0)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split text into chunks, preserving original order
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text
            .split(self.separator.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let step = self.chunk_size - self.chunk_overlap;
        let mut start = 0;
        while start < tokens.len() {
            let end = (start + self.chunk_size).min(tokens.len());
            chunks.push(tokens[start..end].join(&self.separator));
            if end == tokens.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}
