//! Perplexity adapter.
//!
//! Two quirks: the requested model is validated against a fixed whitelist
//! (invalid names are silently replaced before sending), and the response
//! body is sniffed for HTML error pages — Perplexity's edge serves those
//! with assorted statuses, so classification happens on the body text
//! before any JSON handling.

use std::sync::Arc;

use crate::clinical::ClinicalPayload;
use crate::config::ModelConfig;
use crate::crypto::CredentialVault;
use crate::prompt;

use super::{
    http_client, provider_error, transport_error, ChatCompletionRequest, ChatCompletionResponse,
    ChatMessage, GatewayError, ProviderAdapter,
};

const TIMEOUT_SECS: u64 = 30;
const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const FALLBACK_MODEL: &str = "sonar-medium-chat";

pub(crate) const VALID_MODELS: &[&str] = &[
    "sonar-pro",
    "sonar",
    "sonar-large-chat",
    "sonar-small-online",
    "sonar-medium-online",
    "sonar-large-online",
];

/// Whitelist check; anything unknown is silently replaced.
pub(crate) fn resolve_model(requested: &str) -> &str {
    if VALID_MODELS.contains(&requested) {
        requested
    } else {
        FALLBACK_MODEL
    }
}

/// Classify an HTML error page into a specific user-facing message by
/// scanning for known failure substrings (and their status digits).
pub(crate) fn classify_html_error(body: &str, status: u16) -> String {
    let lower = body.to_lowercase();
    if lower.contains("unauthorized") || body.contains("401") {
        "Authentication Error: Invalid API key or unauthorized access".to_string()
    } else if lower.contains("rate limit") || body.contains("429") {
        "Rate Limit Error: Too many requests to the API".to_string()
    } else if lower.contains("not found") || body.contains("404") {
        "Endpoint Error: API endpoint not found".to_string()
    } else if lower.contains("server error") || body.contains("500") {
        "Server Error: API server issue".to_string()
    } else {
        format!("HTML Error Page (Status: {status})")
    }
}

pub struct PerplexityAdapter {
    vault: Arc<CredentialVault>,
    client: reqwest::blocking::Client,
}

impl PerplexityAdapter {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self {
            vault,
            client: http_client(TIMEOUT_SECS),
        }
    }

    fn endpoint(config: &ModelConfig) -> String {
        let base = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

impl ProviderAdapter for PerplexityAdapter {
    fn name(&self) -> &'static str {
        "perplexity"
    }

    fn call(
        &self,
        config: &ModelConfig,
        payload: &ClinicalPayload,
    ) -> Result<String, GatewayError> {
        let api_key = self.vault.decrypt(&config.api_key_encrypted);
        if api_key.is_empty() {
            return Err(GatewayError::ApiKeyMissing);
        }

        let model = resolve_model(&config.model_name);
        if model != config.model_name {
            tracing::warn!(
                requested = %config.model_name,
                substituted = model,
                "unknown Perplexity model, substituting"
            );
        }

        let user_prompt = prompt::build_user_prompt(payload);
        let body = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: Some(0.9),
            stream: Some(false),
        };

        let response = self
            .client
            .post(Self::endpoint(config))
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .map_err(|e| transport_error(e, TIMEOUT_SECS))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        let text = response
            .text()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // HTML sniffing comes before status handling: error pages arrive
        // with 200s often enough that the body is the real signal.
        if text.trim_start().starts_with('<') {
            tracing::error!(status = status.as_u16(), "HTML error page from Perplexity");
            return Err(GatewayError::Rejected(classify_html_error(
                &text,
                status.as_u16(),
            )));
        }
        if content_type.contains("text/html") {
            return Err(GatewayError::Rejected(format!(
                "HTML Error Page (Content-Type: {content_type}, Status: {})",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            return Err(provider_error(status.as_u16(), &text));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            GatewayError::Rejected(format!("Invalid JSON response from Perplexity API: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                GatewayError::Rejected("Perplexity API returned no choices in response".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelisted_models_pass_through() {
        for model in VALID_MODELS {
            assert_eq!(resolve_model(model), *model);
        }
    }

    #[test]
    fn unknown_model_substituted() {
        assert_eq!(resolve_model("gpt-4"), "sonar-medium-chat");
        assert_eq!(resolve_model(""), "sonar-medium-chat");
        assert_eq!(resolve_model("sonar-medium-chat"), "sonar-medium-chat");
    }

    #[test]
    fn unauthorized_html_page_classified() {
        let message =
            classify_html_error("<html><body>401 Unauthorized</body></html>", 401);
        assert_eq!(
            message,
            "Authentication Error: Invalid API key or unauthorized access"
        );
    }

    #[test]
    fn rate_limit_page_classified() {
        let message = classify_html_error("<html>Rate limit exceeded</html>", 429);
        assert_eq!(message, "Rate Limit Error: Too many requests to the API");
    }

    #[test]
    fn not_found_and_server_error_classified() {
        assert_eq!(
            classify_html_error("<h1>Not Found</h1>", 404),
            "Endpoint Error: API endpoint not found"
        );
        assert_eq!(
            classify_html_error("<h1>Internal Server Error</h1>", 500),
            "Server Error: API server issue"
        );
    }

    #[test]
    fn unrecognized_html_gets_generic_message() {
        assert_eq!(
            classify_html_error("<html><body>something odd</body></html>", 418),
            "HTML Error Page (Status: 418)"
        );
    }

    #[test]
    fn default_endpoint() {
        let config = ModelConfig {
            provider_name: "perplexity".into(),
            base_url: None,
            model_name: "sonar".into(),
            api_key_encrypted: String::new(),
            temperature: 0.7,
            max_tokens: 1000,
            enabled: true,
        };
        assert_eq!(
            PerplexityAdapter::endpoint(&config),
            "https://api.perplexity.ai/chat/completions"
        );
    }

    #[test]
    fn missing_key_short_circuits() {
        let adapter = PerplexityAdapter::new(Arc::new(CredentialVault::new("s")));
        let config = ModelConfig {
            provider_name: "perplexity".into(),
            base_url: None,
            model_name: "sonar".into(),
            api_key_encrypted: String::new(),
            temperature: 0.7,
            max_tokens: 1000,
            enabled: true,
        };
        let result = adapter.call(&config, &ClinicalPayload::default());
        assert!(matches!(result, Err(GatewayError::ApiKeyMissing)));
    }
}
