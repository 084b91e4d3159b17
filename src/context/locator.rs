//! Selection Locator
//!
//! Finds where the user's selection sits inside the plain-text snapshot of
//! the document. The host only hands us the selected text, so repeated
//! passages are disambiguated with the paragraph the selection lives in.

use super::text::{char_len, find_all, find_first};

/// First paragraph hint that is not blank
fn primary_paragraph(paragraph_hints: &[String]) -> Option<&str> {
    paragraph_hints
        .iter()
        .map(String::as_str)
        .find(|hint| !hint.trim().is_empty())
}

/// Offset of the cursor when nothing is selected.
///
/// Uses the first non-blank paragraph hint; falls back to the start of the
/// document when no hint can be found in it.
pub fn locate_cursor(document_text: &str, paragraph_hints: &[String]) -> usize {
    primary_paragraph(paragraph_hints)
        .and_then(|paragraph| find_first(document_text, paragraph))
        .unwrap_or(0)
}

/// Char offset of `selection_text` within `document_text`, or `None` when
/// the selection does not occur in the snapshot.
///
/// With several occurrences, the first one inside an occurrence of the
/// primary paragraph wins; without a usable paragraph the first occurrence
/// is returned. That fallback is a heuristic and is wrong for documents
/// that repeat the selected passage in different paragraphs.
pub fn locate(document_text: &str, selection_text: &str, paragraph_hints: &[String]) -> Option<usize> {
    if selection_text.is_empty() {
        return Some(locate_cursor(document_text, paragraph_hints));
    }

    let occurrences = find_all(document_text, selection_text);
    match occurrences.as_slice() {
        [] => None,
        [only] => Some(*only),
        [first, ..] => Some(disambiguate(document_text, &occurrences, paragraph_hints).unwrap_or(*first)),
    }
}

fn disambiguate(document_text: &str, occurrences: &[usize], paragraph_hints: &[String]) -> Option<usize> {
    let paragraph = primary_paragraph(paragraph_hints)?;
    let paragraph_len = char_len(paragraph);
    let paragraph_starts = find_all(document_text, paragraph);

    occurrences.iter().copied().find(|&offset| {
        paragraph_starts
            .iter()
            .any(|&start| offset >= start && offset <= start + paragraph_len)
    })
}
