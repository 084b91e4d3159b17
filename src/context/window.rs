//! Context Window Builder
//!
//! Turns a document snapshot into the marked context string sent alongside a
//! rewrite request. The selection (or cursor) is wrapped in sentinel tokens
//! the rewrite service understands; genuine occurrences of those tokens in
//! the document are not escaped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::locator::locate;
use super::pages::{segment, DEFAULT_PAGE_CHARS};
use super::text::{char_len, slice_chars};
use super::truncate::{truncate, MAX_CONTEXT_CHARS};

/// Opens the rewritten span
pub const EDIT_START: &str = "[[EDIT_START]]";
/// Closes the rewritten span
pub const EDIT_END: &str = "[[EDIT_END]]";
/// Pure insertion point
pub const CURSOR: &str = "[[CURSOR]]";

/// Fallback window size in chars for `Chars`
pub const DEFAULT_CHAR_WINDOW: usize = 200;
/// Fallback window size in pages for `Pages`
pub const DEFAULT_PAGE_WINDOW: usize = 1;

pub const NOTE_SELECTION_NOT_FOUND: &str =
    "Selection not found in document text; its position in the context is approximate.";
pub const NOTE_APPROXIMATE_PAGES: &str = "Page boundaries approximated by characters.";

/// How much surrounding text accompanies a rewrite request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    /// No context is sent
    #[default]
    None,
    /// Whole (bounded) document
    Full,
    /// A fixed number of chars either side of the selection
    Chars,
    /// A number of pages either side of the selection's page
    Pages,
}

impl ContextMode {
    /// Name sent as `context_mode`; `None` is never sent
    pub fn wire_name(&self) -> Option<&'static str> {
        match self {
            ContextMode::None => None,
            ContextMode::Full => Some("full"),
            ContextMode::Chars => Some("chars"),
            ContextMode::Pages => Some("pages"),
        }
    }

    /// Whether the full document text has to be fetched for this mode
    pub fn needs_document(&self) -> bool {
        !matches!(self, ContextMode::None)
    }

    /// Window size used when the requested one is missing or invalid
    pub fn fallback_size(&self) -> usize {
        match self {
            ContextMode::Pages => DEFAULT_PAGE_WINDOW,
            _ => DEFAULT_CHAR_WINDOW,
        }
    }

    /// Resolve a raw user-entered size; non-positive or unparseable input
    /// falls back to the mode's default
    pub fn window_size(&self, raw: Option<&str>) -> usize {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|&value| value > 0)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or_else(|| self.fallback_size())
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name().unwrap_or("none"))
    }
}

impl FromStr for ContextMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(ContextMode::None),
            "full" => Ok(ContextMode::Full),
            "chars" => Ok(ContextMode::Chars),
            "pages" => Ok(ContextMode::Pages),
            other => Err(format!("unknown context mode: {}", other)),
        }
    }
}

/// Plain-text view of the host document taken once per operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub selection_text: String,
    /// Empty when no context mode needed the full document
    pub document_text: String,
    pub paragraph_hints: Vec<String>,
}

/// Marked context plus an advisory note (empty when there is no caveat)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResult {
    pub context_text: String,
    pub note: String,
}

impl ContextResult {
    pub fn is_empty(&self) -> bool {
        self.context_text.is_empty() && self.note.is_empty()
    }
}

/// Limits applied while building a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimits {
    /// Document chars considered before windowing
    pub max_chars: usize,
    /// Page length when the document carries no page breaks
    pub page_chars: usize,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            max_chars: MAX_CONTEXT_CHARS,
            page_chars: DEFAULT_PAGE_CHARS,
        }
    }
}

/// Selection position inside the bounded document text
struct Anchor<'a> {
    text: &'a str,
    /// `None` when the selection could not be located
    offset: Option<usize>,
    selection: &'a str,
}

impl Anchor<'_> {
    fn is_cursor(&self) -> bool {
        self.selection.is_empty()
    }

    /// Marked rendering of `page` (a slice of `text` starting at `page_start`)
    /// with `before`/`after` limited to `reach` chars either side
    fn mark_within(&self, page: &str, page_start: usize, reach: Option<usize>) -> String {
        let page_len = char_len(page);
        let Some(offset) = self.offset else {
            let after_end = reach.map_or(page_len, |n| n.min(page_len));
            return mark("", self.selection, slice_chars(page, 0, after_end), self.is_cursor());
        };

        let start = offset.saturating_sub(page_start).min(page_len);
        let end = (start + char_len(self.selection)).min(page_len);
        let before_start = reach.map_or(0, |n| start.saturating_sub(n));
        let after_end = reach.map_or(page_len, |n| end.saturating_add(n).min(page_len));

        mark(
            slice_chars(page, before_start, start),
            slice_chars(page, start, end),
            slice_chars(page, end, after_end),
            self.is_cursor(),
        )
    }
}

fn mark(before: &str, selection: &str, after: &str, cursor: bool) -> String {
    if cursor {
        format!("{}{}{}", before, CURSOR, after)
    } else {
        format!("{}{}{}{}{}", before, EDIT_START, selection, EDIT_END, after)
    }
}

fn join_notes(notes: &[&str]) -> String {
    notes
        .iter()
        .filter(|note| !note.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the marked context for `snapshot` under `mode`.
///
/// `size` counts chars for `Chars` and pages for `Pages`; it is ignored by
/// the other modes. A zero size falls back to the mode's default.
pub fn build_context(snapshot: &DocumentSnapshot, mode: ContextMode, size: usize, limits: &WindowLimits) -> ContextResult {
    if mode == ContextMode::None {
        return ContextResult::default();
    }
    let size = if size == 0 { mode.fallback_size() } else { size };

    let offset = locate(&snapshot.document_text, &snapshot.selection_text, &snapshot.paragraph_hints);
    let locator_note = if offset.is_none() { NOTE_SELECTION_NOT_FOUND } else { "" };

    let bounded = truncate(&snapshot.document_text, offset, limits.max_chars);
    let anchor = Anchor {
        text: &bounded.text,
        offset: bounded.adjusted_offset,
        selection: &snapshot.selection_text,
    };

    let (context_text, mode_note) = match mode {
        ContextMode::None => (String::new(), ""),
        ContextMode::Full => (anchor.mark_within(anchor.text, 0, None), ""),
        ContextMode::Chars => (anchor.mark_within(anchor.text, 0, Some(size)), ""),
        ContextMode::Pages => build_pages(&anchor, size, limits.page_chars),
    };

    debug!(
        mode = %mode,
        size = size,
        located = offset.is_some(),
        truncated = !bounded.note.is_empty(),
        context_chars = char_len(&context_text),
        "Built context window"
    );

    ContextResult {
        context_text,
        note: join_notes(&[locator_note, bounded.note.as_str(), mode_note]),
    }
}

fn build_pages(anchor: &Anchor<'_>, size: usize, page_chars: usize) -> (String, &'static str) {
    let segments = segment(anchor.text, page_chars);
    let starts = segments.starts();
    let current = segments.page_index(anchor.offset.unwrap_or(0));
    let first = current.saturating_sub(size);
    let last = current.saturating_add(size).min(segments.pages.len() - 1);

    let rendered: Vec<String> = (first..=last)
        .map(|index| {
            if index == current {
                anchor.mark_within(&segments.pages[index], starts[index], None)
            } else {
                segments.pages[index].clone()
            }
        })
        .collect();

    let note = if segments.approximate { NOTE_APPROXIMATE_PAGES } else { "" };
    (rendered.join(segments.joiner()), note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::truncate::NOTE_TRUNCATED_FROM_START;
    use pretty_assertions::assert_eq;

    fn snapshot(document: &str, selection: &str) -> DocumentSnapshot {
        DocumentSnapshot {
            selection_text: selection.to_string(),
            document_text: document.to_string(),
            paragraph_hints: Vec::new(),
        }
    }

    fn build(snap: &DocumentSnapshot, mode: ContextMode, size: usize) -> ContextResult {
        build_context(snap, mode, size, &WindowLimits::default())
    }

    #[test]
    fn test_full_mode_wraps_selection() {
        let result = build(&snapshot("AAA[SEL]BBB", "[SEL]"), ContextMode::Full, 0);
        assert_eq!(result.context_text, "AAA[[EDIT_START]][SEL][[EDIT_END]]BBB");
        assert_eq!(result.note, "");
    }

    #[test]
    fn test_full_mode_cursor() {
        let snap = DocumentSnapshot {
            selection_text: String::new(),
            document_text: "First.\nSecond.".to_string(),
            paragraph_hints: vec!["Second.".to_string()],
        };
        let result = build(&snap, ContextMode::Full, 0);
        assert_eq!(result.context_text, "First.\n[[CURSOR]]Second.");
    }

    #[test]
    fn test_full_mode_unlocated_selection() {
        let result = build(&snapshot("Body text.", "missing"), ContextMode::Full, 0);
        assert_eq!(result.context_text, "[[EDIT_START]]missing[[EDIT_END]]Body text.");
        assert_eq!(result.note, NOTE_SELECTION_NOT_FOUND);
    }

    #[test]
    fn test_chars_mode_window_lengths() {
        let doc = "0123456789abcdefghijklmnopqrstuvwxyz";
        let selection = "klm";
        let offset = 20;
        let len = char_len(doc);
        for n in [0, 1, 5, 18, 40] {
            let result = build(&snapshot(doc, selection), ContextMode::Chars, n);
            let (before, rest) = result.context_text.split_once(EDIT_START).unwrap();
            let (_, after) = rest.split_once(EDIT_END).unwrap();
            let reach = if n == 0 { DEFAULT_CHAR_WINDOW } else { n };
            assert_eq!(char_len(before), reach.min(offset));
            assert_eq!(char_len(after), reach.min(len - offset - selection.len()));
        }
    }

    #[test]
    fn test_zero_size_uses_mode_default() {
        let doc = format!("{}SEL{}", "a".repeat(300), "b".repeat(300));
        let result = build(&snapshot(&doc, "SEL"), ContextMode::Chars, 0);
        assert_eq!(
            result.context_text,
            format!("{}[[EDIT_START]]SEL[[EDIT_END]]{}", "a".repeat(200), "b".repeat(200))
        );

        let result = build(&snapshot("p1\u{000C}p2 SEL\u{000C}p3", "SEL"), ContextMode::Pages, 0);
        assert_eq!(
            result.context_text,
            "p1\u{000C}p2 [[EDIT_START]]SEL[[EDIT_END]]\u{000C}p3"
        );
    }

    #[test]
    fn test_huge_size_covers_whole_document() {
        let result = build(&snapshot("Hi there", "i"), ContextMode::Chars, usize::MAX);
        assert_eq!(result.context_text, "H[[EDIT_START]]i[[EDIT_END]] there");

        let result = build(&snapshot("p1\u{000C}p2 SEL\u{000C}p3", "SEL"), ContextMode::Pages, usize::MAX);
        assert_eq!(
            result.context_text,
            "p1\u{000C}p2 [[EDIT_START]]SEL[[EDIT_END]]\u{000C}p3"
        );
    }

    #[test]
    fn test_chars_mode_unlocated_selection() {
        let result = build(&snapshot("Body text.", "missing"), ContextMode::Chars, 4);
        assert_eq!(result.context_text, "[[EDIT_START]]missing[[EDIT_END]]Body");
        assert_eq!(result.note, NOTE_SELECTION_NOT_FOUND);
    }

    #[test]
    fn test_pages_mode_cursor() {
        let snap = DocumentSnapshot {
            selection_text: String::new(),
            document_text: "p1\u{000C}p2\u{000C}p3 here\u{000C}p4\u{000C}p5".to_string(),
            paragraph_hints: vec!["p3 here".to_string()],
        };
        let result = build(&snap, ContextMode::Pages, 1);
        assert_eq!(result.context_text, "p2\u{000C}[[CURSOR]]p3 here\u{000C}p4");
        assert_eq!(result.note, "");
    }

    #[test]
    fn test_chars_mode_clamps_at_start() {
        let result = build(&snapshot("Hi there", "i"), ContextMode::Chars, 3);
        assert_eq!(result.context_text, "H[[EDIT_START]]i[[EDIT_END]] th");
    }

    #[test]
    fn test_chars_mode_cursor() {
        let snap = DocumentSnapshot {
            selection_text: String::new(),
            document_text: "Hi there".to_string(),
            paragraph_hints: vec!["there".to_string()],
        };
        let result = build(&snap, ContextMode::Chars, 2);
        assert_eq!(result.context_text, "i [[CURSOR]]th");
    }

    #[test]
    fn test_pages_mode_approximate() {
        let mut doc = String::new();
        doc.push_str(&"a".repeat(1_500));
        doc.push_str(&"b".repeat(700));
        doc.push_str("TARGET");
        doc.push_str(&"b".repeat(794));
        doc.push_str(&"c".repeat(1_000));
        assert_eq!(char_len(&doc), 4_000);

        let result = build(&snapshot(&doc, "TARGET"), ContextMode::Pages, 1);
        let expected = format!(
            "{}\n\n{}[[EDIT_START]]TARGET[[EDIT_END]]{}\n\n{}",
            "a".repeat(1_500),
            "b".repeat(700),
            "b".repeat(794),
            "c".repeat(1_000)
        );
        assert_eq!(result.context_text, expected);
        assert_eq!(result.note, NOTE_APPROXIMATE_PAGES);
    }

    #[test]
    fn test_pages_mode_explicit_breaks() {
        let doc = "p1\u{000C}p2\u{000C}p3 with pick\u{000C}p4\u{000C}p5";
        let result = build(&snapshot(doc, "pick"), ContextMode::Pages, 1);
        assert_eq!(
            result.context_text,
            "p2\u{000C}p3 with [[EDIT_START]]pick[[EDIT_END]]\u{000C}p4"
        );
        assert_eq!(result.note, "");
    }

    #[test]
    fn test_pages_mode_clamps_to_document() {
        let doc = "only\u{000C}two";
        let result = build(&snapshot(doc, "only"), ContextMode::Pages, 5);
        assert_eq!(result.context_text, "[[EDIT_START]]only[[EDIT_END]]\u{000C}two");
    }

    #[test]
    fn test_none_mode_is_empty() {
        let result = build(&snapshot("whatever", "missing"), ContextMode::None, 10);
        assert!(result.is_empty());
    }

    #[test]
    fn test_notes_are_joined_in_order() {
        let doc = "q".repeat(MAX_CONTEXT_CHARS + 10);
        let result = build(&snapshot(&doc, "absent"), ContextMode::Pages, 1);
        assert_eq!(
            result.note,
            format!("{} {} {}", NOTE_SELECTION_NOT_FOUND, NOTE_TRUNCATED_FROM_START, NOTE_APPROXIMATE_PAGES)
        );
    }

    #[test]
    fn test_truncated_full_context_is_bounded() {
        let doc = "w".repeat(20_000);
        let mut snap = snapshot(&doc, "");
        snap.paragraph_hints = vec!["not present".to_string()];
        let result = build(&snap, ContextMode::Full, 0);
        assert_eq!(char_len(&result.context_text), MAX_CONTEXT_CHARS + CURSOR.len());
    }

    #[test]
    fn test_window_size_fallbacks() {
        assert_eq!(ContextMode::Chars.window_size(Some("350")), 350);
        assert_eq!(ContextMode::Chars.window_size(Some("-4")), DEFAULT_CHAR_WINDOW);
        assert_eq!(ContextMode::Chars.window_size(Some("lots")), DEFAULT_CHAR_WINDOW);
        assert_eq!(ContextMode::Pages.window_size(Some("0")), DEFAULT_PAGE_WINDOW);
        assert_eq!(ContextMode::Pages.window_size(None), DEFAULT_PAGE_WINDOW);
        assert_eq!(
            ContextMode::Chars.window_size(Some("4294967296")),
            usize::try_from(4_294_967_296i64).unwrap_or(DEFAULT_CHAR_WINDOW)
        );
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Pages".parse::<ContextMode>(), Ok(ContextMode::Pages));
        assert_eq!("".parse::<ContextMode>(), Ok(ContextMode::None));
        assert!("paragraphs".parse::<ContextMode>().is_err());
        assert_eq!(ContextMode::None.wire_name(), None);
    }
}
