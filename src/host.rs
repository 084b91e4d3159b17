//! Host Document Access
//!
//! The editor hosting the assistant is reached through [`HostDocument`], an
//! async, fallible surface. [`MemoryDocument`] backs it with an in-process
//! string for the CLI and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::context::text::{byte_offset, char_len, find_first, slice_chars};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Document unavailable: {0}")]
    Unavailable(String),
    #[error("Replace failed: {0}")]
    ReplaceFailed(String),
}

impl Serialize for HostError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[async_trait]
pub trait HostDocument: Send + Sync {
    /// Plain text of the current selection (empty for a bare cursor)
    async fn selection_text(&self) -> Result<String, HostError>;

    /// Plain text of the whole document body
    async fn document_text(&self) -> Result<String, HostError>;

    /// Text of the paragraphs touched by the selection, in order
    async fn paragraph_hints(&self) -> Result<Vec<String>, HostError>;

    /// Replace the selection (or insert at the cursor) with `content`
    async fn replace_selection(&self, content: &str) -> Result<(), HostError>;
}

struct MemoryState {
    text: String,
    /// Selected char range; empty range is a cursor
    selection: (usize, usize),
}

/// In-memory document with a char-range selection
pub struct MemoryDocument {
    state: Mutex<MemoryState>,
}

impl MemoryDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                text: text.into(),
                selection: (0, 0),
            }),
        }
    }

    /// Select `len` chars starting at `start`, clamped to the document
    pub fn select(&self, start: usize, len: usize) {
        let mut state = self.state.lock();
        let total = char_len(&state.text);
        let start = start.min(total);
        state.selection = (start, (start + len).min(total));
    }

    /// Select the first occurrence of `needle`; returns false if it is absent
    pub fn select_text(&self, needle: &str) -> bool {
        let found = find_first(&self.state.lock().text, needle);
        match found {
            Some(start) => {
                self.select(start, char_len(needle));
                true
            }
            None => false,
        }
    }

    /// Current document text
    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }
}

#[async_trait]
impl HostDocument for MemoryDocument {
    async fn selection_text(&self) -> Result<String, HostError> {
        let state = self.state.lock();
        let (start, end) = state.selection;
        Ok(slice_chars(&state.text, start, end).to_string())
    }

    async fn document_text(&self) -> Result<String, HostError> {
        Ok(self.text())
    }

    async fn paragraph_hints(&self) -> Result<Vec<String>, HostError> {
        let state = self.state.lock();
        let (start, end) = state.selection;
        let mut hints = Vec::new();
        let mut line_start = 0usize;
        for line in state.text.split('\n') {
            let line_end = line_start + char_len(line);
            let touches = if start == end {
                line_start <= start && start <= line_end
            } else {
                start <= line_end && end > line_start
            };
            if touches {
                hints.push(line.to_string());
            }
            line_start = line_end + 1;
        }
        Ok(hints)
    }

    async fn replace_selection(&self, content: &str) -> Result<(), HostError> {
        let mut state = self.state.lock();
        let (start, end) = state.selection;
        let from = byte_offset(&state.text, start);
        let to = byte_offset(&state.text, end);
        state.text.replace_range(from..to, content);
        state.selection = (start, start + char_len(content));
        Ok(())
    }
}
