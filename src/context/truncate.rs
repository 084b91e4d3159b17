//! Context Truncation
//!
//! Bounds the document text before any windowing so every mode works on at
//! most `max_chars` chars, keeping the selection offset valid for the cut.

use serde::{Deserialize, Serialize};

use super::text::{char_len, slice_chars};

/// Maximum document chars considered when building context
pub const MAX_CONTEXT_CHARS: usize = 12_000;

pub const NOTE_TRUNCATED_FROM_START: &str =
    "Document truncated to the first part because the selection could not be located.";
pub const NOTE_TRUNCATED_AROUND_SELECTION: &str = "Document truncated around the selection.";

/// Bounded document text with the selection offset re-expressed against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truncated {
    pub text: String,
    pub adjusted_offset: Option<usize>,
    /// Chars removed from the front of the document
    pub removed_front: usize,
    pub note: String,
}

/// Truncate `document_text` to `max_chars`, centered on `selection_offset`
pub fn truncate(document_text: &str, selection_offset: Option<usize>, max_chars: usize) -> Truncated {
    let len = char_len(document_text);
    if len <= max_chars {
        return Truncated {
            text: document_text.to_string(),
            adjusted_offset: selection_offset,
            removed_front: 0,
            note: String::new(),
        };
    }

    let Some(offset) = selection_offset else {
        return Truncated {
            text: slice_chars(document_text, 0, max_chars).to_string(),
            adjusted_offset: None,
            removed_front: 0,
            note: NOTE_TRUNCATED_FROM_START.to_string(),
        };
    };

    let offset = offset.min(len);
    let mut start = offset.saturating_sub(max_chars / 2);
    let end = (start + max_chars).min(len);
    start = end.saturating_sub(max_chars);

    Truncated {
        text: slice_chars(document_text, start, end).to_string(),
        adjusted_offset: Some(offset - start),
        removed_front: start,
        note: NOTE_TRUNCATED_AROUND_SELECTION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_document_untouched() {
        let result = truncate("short text", Some(3), 100);
        assert_eq!(result.text, "short text");
        assert_eq!(result.adjusted_offset, Some(3));
        assert!(result.note.is_empty());
    }

    #[test]
    fn test_centered_on_selection() {
        let doc: String = (0..20_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let result = truncate(&doc, Some(15_000), MAX_CONTEXT_CHARS);

        assert_eq!(char_len(&result.text), MAX_CONTEXT_CHARS);
        // 9_000..21_000 overruns the end, so the window slides back to 8_000..20_000
        assert_eq!(result.removed_front, 8_000);
        assert_eq!(result.adjusted_offset, Some(7_000));
        assert_eq!(&result.text[7_000..7_001], &doc[15_000..15_001]);
        assert_eq!(result.note, NOTE_TRUNCATED_AROUND_SELECTION);
    }

    #[test]
    fn test_window_clamped_to_document_end() {
        let doc = "x".repeat(1_000);
        let result = truncate(&doc, Some(990), 100);

        assert_eq!(char_len(&result.text), 100);
        assert_eq!(result.removed_front, 900);
        assert_eq!(result.adjusted_offset, Some(90));
    }

    #[test]
    fn test_window_clamped_to_document_start() {
        let doc = "y".repeat(1_000);
        let result = truncate(&doc, Some(10), 100);

        assert_eq!(result.removed_front, 0);
        assert_eq!(result.adjusted_offset, Some(10));
    }

    #[test]
    fn test_unknown_offset_keeps_prefix() {
        let doc = "z".repeat(500);
        let result = truncate(&doc, None, 120);

        assert_eq!(char_len(&result.text), 120);
        assert_eq!(result.adjusted_offset, None);
        assert_eq!(result.note, NOTE_TRUNCATED_FROM_START);
    }

    #[test]
    fn test_removed_front_matches_offset_shift() {
        let doc = "é".repeat(3_000);
        for offset in [0, 700, 1_500, 2_999, 3_000] {
            let result = truncate(&doc, Some(offset), 1_000);
            assert!(char_len(&result.text) <= 1_000);
            assert_eq!(offset - result.adjusted_offset.unwrap(), result.removed_front);
        }
    }
}
