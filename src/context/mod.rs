//! Context Extraction Module
//!
//! Locates the selection inside a plain-text document snapshot and builds a
//! bounded, marked context window for the rewrite service.

pub mod locator;
pub mod pages;
pub mod text;
pub mod truncate;
pub mod window;

// Re-export public types for external use
pub use locator::{locate, locate_cursor};
pub use pages::{segment, PageSegments, DEFAULT_PAGE_CHARS, PAGE_BREAK};
pub use truncate::{truncate, Truncated, MAX_CONTEXT_CHARS};
pub use window::{build_context, ContextMode, ContextResult, DocumentSnapshot, WindowLimits};
pub use window::{CURSOR, EDIT_END, EDIT_START};
