//! Rewrite Service HTTP Client
//!
//! Direct reqwest client for the rewrite service's REST API. The overall
//! time budget of a rewrite is owned by the controller, so only a connect
//! timeout is configured here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use super::payload::{normalize_provider, ErrorBody, ModelList, RewriteRequest, RewriteResponse};

/// Default rewrite service address
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {status}{}", .detail.as_ref().map(|d| format!(" - {}", d)).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },
    #[error("Model returned empty output.")]
    EmptyOutput,
    #[error("Invalid response: {0}")]
    Deserialize(String),
}

impl Serialize for ServiceError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Deserialize(e.to_string())
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

/// Outbound side of a rewrite, abstracted so the controller can run
/// against any transport
#[async_trait]
pub trait RewriteTransport: Send + Sync {
    /// Send a rewrite request
    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse, ServiceError>;

    /// List models available for `provider`
    async fn list_models(&self, provider: &str) -> Result<Vec<String>, ServiceError>;
}

/// Rewrite service HTTP client
#[derive(Clone)]
pub struct RewriteClient {
    http: Client,
    base_url: String,
}

impl RewriteClient {
    pub fn new(base_url: &str) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a status error, pulling `{ "error": ... }` out of the body if present
    fn status_error(status: StatusCode, body: &str) -> ServiceError {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|d| !d.trim().is_empty());
        ServiceError::Status {
            status: status.as_u16(),
            detail,
        }
    }
}

#[async_trait]
impl RewriteTransport for RewriteClient {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse, ServiceError> {
        debug!(
            provider = %request.provider,
            web_search = request.use_web_search,
            context_mode = ?request.context_mode,
            "Sending rewrite request"
        );
        let resp = self.http.post(format!("{}/rewrite", self.base_url))
            .json(request)
            .send().await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            error!(status = %status, body = %text, "Rewrite service error");
            return Err(Self::status_error(status, &text));
        }

        let body: RewriteResponse = serde_json::from_str(&text)
            .map_err(|e| ServiceError::Deserialize(format!("{}: {}", e, text)))?;
        if body.rewritten_text.trim().is_empty() {
            return Err(ServiceError::EmptyOutput);
        }

        info!(chars = body.rewritten_text.chars().count(), "Rewrite received");
        Ok(body)
    }

    async fn list_models(&self, provider: &str) -> Result<Vec<String>, ServiceError> {
        let provider = normalize_provider(provider);
        let resp = self.http.get(format!("{}/models", self.base_url))
            .query(&[("provider", provider.as_str())])
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Model listing failed");
            return Err(Self::status_error(status, &text));
        }

        let list: ModelList = resp.json().await.map_err(|e| ServiceError::Deserialize(e.to_string()))?;
        debug!(provider = %provider, count = list.models.len(), "Listed models");
        Ok(list.models)
    }
}
