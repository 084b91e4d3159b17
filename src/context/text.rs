//! Char-offset helpers
//!
//! Every offset in the context engine counts Unicode scalar values, so
//! slicing never lands inside a multi-byte sequence.

/// Number of chars in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte position of the `char_idx`-th char (clamped to `text.len()`)
pub fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(pos, _)| pos)
        .unwrap_or(text.len())
}

/// Slice `text` by char positions, clamping both ends to the text
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let from = byte_offset(text, start);
    let to = byte_offset(text, end);
    &text[from..to]
}

/// Char offsets of every occurrence of `needle` in `haystack`.
///
/// After each match the scan resumes one char later, so overlapping
/// occurrences are all reported.
pub fn find_all(haystack: &str, needle: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    if needle.is_empty() {
        return hits;
    }

    let mut byte_pos = 0usize;
    let mut char_pos = 0usize;
    while byte_pos <= haystack.len() {
        let Some(rel) = haystack[byte_pos..].find(needle) else {
            break;
        };
        let hit = byte_pos + rel;
        char_pos += char_len(&haystack[byte_pos..hit]);
        hits.push(char_pos);

        let step = haystack[hit..].chars().next().map(char::len_utf8).unwrap_or(1);
        byte_pos = hit + step;
        char_pos += 1;
    }
    hits
}

/// Char offset of the first occurrence of `needle`
pub fn find_first(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|pos| char_len(&haystack[..pos]))
}
