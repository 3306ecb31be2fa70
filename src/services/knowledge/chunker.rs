//! Document Chunker
//!
//! Splits text into fixed-size character windows with overlap.
//!
//! Whitespace is normalized first (every run collapses to one space, ends
//! trimmed). Windows are measured in Unicode scalar values, so multi-byte
//! text never splits inside a character. Consecutive windows share exactly
//! `chunk_overlap` characters; the last window ends at the end of the text.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let chunker = WindowChunker::new(600, 120)?;
//! let chunks = chunker.chunk("Some long document ...");
//! ```

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Split `text` into overlapping windows.
///
/// Parameters are checked before the text so bad settings are reported even
/// for empty input.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> AppResult<Vec<String>> {
    Ok(WindowChunker::new(chunk_size, chunk_overlap)?.chunk(text))
}

/// Reusable chunker with validated parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl WindowChunker {
    /// `chunk_overlap` must be smaller than `chunk_size`, which rules out a
    /// zero size as well.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_overlap >= chunk_size {
            return Err(AppError::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = normalized.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(len);
            chunks.push(chars[start..end].iter().collect());
            if end == len {
                break;
            }
            // overlap < size keeps this strictly increasing
            start = end - self.chunk_overlap;
        }

        chunks
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
