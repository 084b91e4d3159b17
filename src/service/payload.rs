//! Rewrite Service Wire Types
//!
//! Request/response bodies for `POST /rewrite` and `GET /models`. Optional
//! context fields are attached only through [`RewriteRequest::with_context`].

use serde::{Deserialize, Serialize};

use crate::context::{ContextMode, ContextResult};

/// Provider used when none is configured
pub const DEFAULT_PROVIDER: &str = "openai";

/// Providers the rewrite service knows how to route
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "ollama"];

/// Trim and lowercase a provider id, defaulting blanks to [`DEFAULT_PROVIDER`]
pub fn normalize_provider(provider: &str) -> String {
    let normalized = provider.trim().to_lowercase();
    if normalized.is_empty() {
        DEFAULT_PROVIDER.to_string()
    } else {
        normalized
    }
}

/// Body of `POST /rewrite`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub text: String,
    pub instruction: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub use_web_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_mode: Option<ContextMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_note: Option<String>,
}

impl RewriteRequest {
    pub fn new(text: impl Into<String>, instruction: impl Into<String>, provider: &str) -> Self {
        Self {
            text: text.into(),
            instruction: instruction.into(),
            provider: normalize_provider(provider),
            model: None,
            use_web_search: false,
            context_mode: None,
            context_text: None,
            context_note: None,
        }
    }

    /// Explicit model override; blank names are dropped
    pub fn with_model(mut self, model: Option<&str>) -> Self {
        self.model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.use_web_search = enabled;
        self
    }

    /// Attach built context.
    ///
    /// `context_mode` is sent only for a real mode with some text or note;
    /// the note travels even without context text so caveats still reach
    /// the service.
    pub fn with_context(mut self, mode: ContextMode, context: &ContextResult) -> Self {
        if mode == ContextMode::None || context.is_empty() {
            return self;
        }
        self.context_mode = Some(mode);
        if !context.context_text.is_empty() {
            self.context_text = Some(context.context_text.clone());
        }
        if !context.note.is_empty() {
            self.context_note = Some(context.note.clone());
        }
        self
    }
}

/// Success body of `POST /rewrite`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResponse {
    pub rewritten_text: String,
    /// Set when the service substituted a different model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_note: Option<String>,
}

/// Failure body returned alongside a non-2xx status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub provider: Option<String>,
    pub models: Vec<String>,
}
