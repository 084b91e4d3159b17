//! Page Segmentation
//!
//! Splits document text into page-sized pieces, either along explicit page
//! breaks or by a fixed char count when the text carries no breaks.

use serde::{Deserialize, Serialize};

use super::text::char_len;

/// Page break as it appears in plain-text document snapshots
pub const PAGE_BREAK: char = '\u{000C}';

/// Approximate page length used when the text has no explicit breaks
pub const DEFAULT_PAGE_CHARS: usize = 1_500;

/// Separator used to reassemble approximate pages
pub const APPROXIMATE_JOINER: &str = "\n\n";

/// Ordered pages of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSegments {
    pub pages: Vec<String>,
    /// Separator between pages in the source text (empty when approximate)
    pub delimiter: String,
    /// True when pages were cut by char count
    pub approximate: bool,
}

impl PageSegments {
    /// Char offset at which each page starts in the segmented text
    pub fn starts(&self) -> Vec<usize> {
        let delimiter_len = char_len(&self.delimiter);
        let mut starts = Vec::with_capacity(self.pages.len());
        let mut offset = 0usize;
        for page in &self.pages {
            starts.push(offset);
            offset += char_len(page) + delimiter_len;
        }
        starts
    }

    /// Index of the page containing `offset`: the last page starting at or before it
    pub fn page_index(&self, offset: usize) -> usize {
        self.starts()
            .iter()
            .rposition(|&start| start <= offset)
            .unwrap_or(0)
    }

    /// String used to join pages back together
    pub fn joiner(&self) -> &str {
        if self.approximate {
            APPROXIMATE_JOINER
        } else {
            &self.delimiter
        }
    }
}

/// Segment `document_text` into pages.
///
/// Always yields at least one page, so an empty document is a single empty page.
pub fn segment(document_text: &str, page_chars: usize) -> PageSegments {
    if document_text.contains(PAGE_BREAK) {
        return PageSegments {
            pages: document_text.split(PAGE_BREAK).map(str::to_string).collect(),
            delimiter: PAGE_BREAK.to_string(),
            approximate: false,
        };
    }

    let page_chars = page_chars.max(1);
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for ch in document_text.chars() {
        current.push(ch);
        current_len += 1;
        if current_len == page_chars {
            pages.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() || pages.is_empty() {
        pages.push(current);
    }

    PageSegments {
        pages,
        delimiter: String::new(),
        approximate: true,
    }
}
