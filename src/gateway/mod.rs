//! Multi-provider LLM gateway.
//!
//! Providers are tried in priority order; rate-limited backends are put on
//! a per-provider cooldown and skipped within the same call. Every failure
//! mode is absorbed here — callers receive `Some(result)` or `None`, never
//! an error.

pub mod client;
pub mod cooldown;
pub mod json_extract;
pub mod provider;
pub mod types;

pub use client::LlmGateway;
pub use cooldown::CooldownTracker;
pub use types::{ChatMessage, ChatProvider};

use thiserror::Error;

/// Provider-level failures. All variants are absorbed by the gateway and
/// degrade to "try next provider", then to `None`.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The backend asked us to back off. `message` is the human-readable
    /// retry hint (e.g. "Please try again in 18m17.498s."); the gateway
    /// parses the interval out of it.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("backend returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
