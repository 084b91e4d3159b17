// Wordsmith Library
// Exports core modules for use by the CLI binary and editor hosts

pub mod config;
pub mod context;
pub mod controller;
pub mod host;
pub mod service;

// Re-export commonly used types for CLI
pub use config::{AppConfig, ConfigError, DEFAULT_TIMEOUT_SECS, DEFAULT_WEB_SEARCH_TIMEOUT_SECS};

pub use context::{
    build_context, locate, locate_cursor, segment, truncate,
    ContextMode, ContextResult, DocumentSnapshot, PageSegments, Truncated, WindowLimits,
    CURSOR, DEFAULT_PAGE_CHARS, EDIT_END, EDIT_START, MAX_CONTEXT_CHARS, PAGE_BREAK,
};

pub use controller::{
    ControllerError, DisplayState, Phase, RequestId, RewriteController, RewriteInput,
    RewriteOutcome, RewriteResult,
};

pub use host::{HostDocument, HostError, MemoryDocument};

pub use service::{
    normalize_provider, ModelList, RewriteClient, RewriteRequest, RewriteResponse,
    RewriteTransport, ServiceError, DEFAULT_PROVIDER, DEFAULT_SERVICE_URL, KNOWN_PROVIDERS,
};
