//! Rewrite Service Integration
//!
//! Wire types and the HTTP client for the remote rewriting service.

pub mod client;
pub mod payload;

pub use client::{RewriteClient, RewriteTransport, ServiceError, DEFAULT_SERVICE_URL};
pub use payload::{normalize_provider, ModelList, RewriteRequest, RewriteResponse, DEFAULT_PROVIDER, KNOWN_PROVIDERS};
