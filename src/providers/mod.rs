//! Provider adapters: one implementation per third-party chat-completion
//! API, all funneling into the same `(config, payload) -> raw text`
//! contract. Request-building and response-classifying quirks live in
//! narrow pure functions so each provider's wire behavior is testable
//! without a network.

pub mod custom;
pub mod gemini;
pub mod openai_compat;
pub mod perplexity;

pub use custom::CustomAdapter;
pub use gemini::GeminiAdapter;
pub use openai_compat::OpenAiCompatAdapter;
pub use perplexity::PerplexityAdapter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clinical::ClinicalPayload;
use crate::config::ModelConfig;

/// Hard failures. Parse degradation is deliberately absent — malformed
/// provider text degrades inside the normalizer instead of erroring here.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No usable key after decryption. Short-circuits before any network I/O.
    #[error("API key not configured")]
    ApiKeyMissing,

    /// The configuration is present but switched off.
    #[error("Model configuration is disabled")]
    ModelDisabled,

    /// Base URL absent where the provider has no default (custom).
    #[error("Base URL is required for custom providers")]
    MissingBaseUrl,

    /// Provider name not in the registry. No network call attempted.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Timeout or connection failure. Single attempt, never retried.
    #[error("{0}")]
    Transport(String),

    /// Non-2xx HTTP status with the best message we could extract from the
    /// provider's error envelope.
    #[error("API error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Provider-specific rejection with a fixed user-facing message
    /// (Gemini safety block, Perplexity HTML error page, empty envelope).
    #[error("{0}")]
    Rejected(String),
}

/// One provider's wire protocol behind the canonical call contract.
/// Implementations are stateless between calls and safe for concurrent use.
pub trait ProviderAdapter: Send + Sync {
    /// Lowercase registry key ("openai", "gemini", ...).
    fn name(&self) -> &'static str;

    /// Build the provider request, perform one blocking HTTP call, and
    /// return the model's raw response text.
    fn call(&self, config: &ModelConfig, payload: &ClinicalPayload)
        -> Result<String, GatewayError>;
}

// ── Shared wire types (OpenAI-compatible family) ────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: String,
}

// ── Shared HTTP helpers ─────────────────────────────────────

/// Longest provider error body we carry into an error message.
pub(crate) const MAX_ERROR_BODY_LEN: usize = 500;

/// Blocking client with the adapter's timeout baked in.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to create HTTP client")
}

/// Map a reqwest failure onto the transport error channel.
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Transport(format!("Request timed out after {timeout_secs}s"))
    } else if e.is_connect() {
        GatewayError::Transport(format!("Connection failed: {e}"))
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Non-2xx status → extract `error.message` (or top-level `message`) from
/// the JSON body, falling back to the raw body, truncated.
pub(crate) fn provider_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| truncate(body, MAX_ERROR_BODY_LEN));
    GatewayError::Provider { status, message }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
