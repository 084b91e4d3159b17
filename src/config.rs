//! Application Configuration
//!
//! Defaults, overlaid by `<config_dir>/wordsmith/config.json` when it exists,
//! then by `WORDSMITH_*` environment variables.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{ContextMode, WindowLimits, DEFAULT_PAGE_CHARS, MAX_CONTEXT_CHARS};
use crate::service::{DEFAULT_PROVIDER, DEFAULT_SERVICE_URL, KNOWN_PROVIDERS};

/// Time budget for a plain rewrite
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;
/// Web-search rewrites take an extra hop on the service side
pub const DEFAULT_WEB_SEARCH_TIMEOUT_SECS: u64 = 120;

const APP_DIR: &str = "wordsmith";
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config directory not found")]
    NoConfigDir,
}

impl Serialize for ConfigError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub service_url: String,
    pub provider: String,
    pub model: Option<String>,
    pub use_web_search: bool,
    pub context_mode: ContextMode,
    /// Raw window size; invalid values fall back per mode
    pub context_size: Option<String>,
    pub timeout_secs: u64,
    pub web_search_timeout_secs: u64,
    pub max_context_chars: usize,
    pub approx_page_chars: usize,
    /// Write the rewrite back into the document
    pub replace_selection: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            model: None,
            use_web_search: false,
            context_mode: ContextMode::None,
            context_size: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            web_search_timeout_secs: DEFAULT_WEB_SEARCH_TIMEOUT_SECS,
            max_context_chars: MAX_CONTEXT_CHARS,
            approx_page_chars: DEFAULT_PAGE_CHARS,
            replace_selection: true,
        }
    }
}

impl AppConfig {
    /// Location of the user config file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Read a config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults, then the user config file, then the environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Ok(path) => Self::from_file(&path)?,
            Err(e) => {
                warn!(error = %e, "Skipping config file");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.warn_unknown_provider();
        Ok(config)
    }

    /// Apply `WORDSMITH_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("WORDSMITH_SERVICE_URL").filter(|v| !v.trim().is_empty()) {
            self.service_url = url.trim().to_string();
        }
        if let Some(provider) = lookup("WORDSMITH_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.provider = provider.trim().to_lowercase();
        }
        if let Some(model) = lookup("WORDSMITH_MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = Some(model.trim().to_string());
        }
    }

    fn warn_unknown_provider(&self) {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            warn!(provider = %self.provider, "Provider not recognized by the rewrite service");
        }
    }

    /// Budget for one rewrite request
    pub fn timeout(&self, use_web_search: bool) -> Duration {
        if use_web_search {
            Duration::from_secs(self.web_search_timeout_secs)
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    pub fn window_limits(&self) -> WindowLimits {
        WindowLimits {
            max_chars: self.max_context_chars,
            page_chars: self.approx_page_chars,
        }
    }

    /// Effective window size for the configured mode
    pub fn window_size(&self) -> usize {
        self.context_mode.window_size(self.context_size.as_deref())
    }
}
