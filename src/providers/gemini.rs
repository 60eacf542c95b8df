//! Google Gemini adapter.
//!
//! Gemini departs from the OpenAI shape in every way that matters: the key
//! rides as a URL query parameter, system and user prompts are concatenated
//! into one `contents` part, the endpoint version flips to v1beta for 1.5
//! models, and the response content can appear in three different JSON
//! shapes — all three are tried, in order, before declaring the content
//! empty.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::clinical::ClinicalPayload;
use crate::config::ModelConfig;
use crate::crypto::CredentialVault;
use crate::prompt;

use super::{http_client, provider_error, transport_error, GatewayError, ProviderAdapter};

// Gemini gets double the usual budget; its long-output generations
// routinely exceed 30s.
const TIMEOUT_SECS: u64 = 60;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
const V1BETA_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini 1.0-era models have no JSON mode, so the schema is enforced
/// through the prompt alone.
const JSON_ENFORCEMENT_SUFFIX: &str = "\n\nCRITICAL: Your response MUST be a COMPLETE, VALID \
     JSON object. Do not include any text outside the JSON. Start with { and end with }. \
     Do not use markdown code blocks.";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_ONLY_HIGH",
    })
    .collect()
}

/// Strip the `models/` prefix users sometimes paste from the API console.
pub(crate) fn resolve_model(model_name: &str) -> &str {
    model_name.strip_prefix("models/").unwrap_or(model_name)
}

/// Pick the API version: Gemini 1.5 models live on v1beta unless the
/// caller already configured a v1beta URL.
pub(crate) fn resolve_base_url(configured: Option<&str>, model: &str) -> String {
    let base = configured
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    if !base.contains("v1beta") && model.contains("gemini-1.5") {
        V1BETA_BASE_URL.to_string()
    } else {
        base.trim_end_matches('/').to_string()
    }
}

/// Endpoint with the key as a query parameter — Gemini's auth scheme.
/// Never log the returned URL.
pub(crate) fn build_endpoint(base: &str, model: &str, api_key: &str) -> String {
    format!("{base}/models/{model}:generateContent?key={api_key}")
}

/// Map a terminal `finishReason` to its fixed user-facing error.
pub(crate) fn finish_reason_error(reason: &str) -> Option<GatewayError> {
    let message = match reason {
        "SAFETY" => "AI declined to analyze due to safety filters.",
        "RECITATION" => "Response blocked due to recitation policy.",
        "MAX_TOKENS" => "Response truncated due to token limit.",
        _ => return None,
    };
    Some(GatewayError::Rejected(message.to_string()))
}

/// Extract candidate text, trying the three known response shapes in
/// order: `content.parts[].text`, `content.text`, `text`. Returns `""`
/// when the matched shape carries no text.
pub(crate) fn extract_candidate_text(candidate: &Value) -> String {
    if let Some(parts) = candidate.pointer("/content/parts").and_then(Value::as_array) {
        return parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
    }
    if let Some(text) = candidate.pointer("/content/text").and_then(Value::as_str) {
        return text.to_string();
    }
    if let Some(text) = candidate.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    String::new()
}

pub struct GeminiAdapter {
    vault: Arc<CredentialVault>,
    client: reqwest::blocking::Client,
}

impl GeminiAdapter {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self {
            vault,
            client: http_client(TIMEOUT_SECS),
        }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
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
        let base = resolve_base_url(config.base_url.as_deref(), model);
        let endpoint = build_endpoint(&base, model, &api_key);

        let full_prompt = format!(
            "{}{}\n\n{}",
            prompt::system_prompt(),
            JSON_ENFORCEMENT_SUFFIX,
            prompt::build_user_prompt(payload)
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: full_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
            safety_settings: safety_settings(),
        };

        tracing::debug!(model, base = %base, "sending Gemini generateContent request");

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .map_err(|e| transport_error(e, TIMEOUT_SECS))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(provider_error(status.as_u16(), &text));
        }

        let result: Value = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Rejected(format!("Invalid JSON response: {e}")))?;

        let candidates = result.get("candidates").and_then(Value::as_array);
        let Some(candidate) = candidates.and_then(|c| c.first()) else {
            // No candidates — surface the embedded error message if Gemini
            // sent one.
            if let Some(message) = result.pointer("/error/message").and_then(Value::as_str) {
                return Err(GatewayError::Rejected(format!("Gemini API error: {message}")));
            }
            return Err(GatewayError::Rejected(
                "No candidates in Gemini API response".to_string(),
            ));
        };

        if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
            if let Some(err) = finish_reason_error(reason) {
                return Err(err);
            }
        }

        let content = extract_candidate_text(candidate);
        if content.is_empty() {
            return Err(GatewayError::Rejected(
                "Empty content in Gemini API response".to_string(),
            ));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn models_prefix_stripped() {
        assert_eq!(resolve_model("models/gemini-pro"), "gemini-pro");
        assert_eq!(resolve_model("gemini-pro"), "gemini-pro");
    }

    #[test]
    fn gemini_15_switches_to_v1beta() {
        assert_eq!(
            resolve_base_url(None, "gemini-1.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(
            resolve_base_url(
                Some("https://generativelanguage.googleapis.com/v1"),
                "gemini-1.5-flash"
            ),
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn configured_v1beta_url_kept_as_is() {
        assert_eq!(
            resolve_base_url(
                Some("https://generativelanguage.googleapis.com/v1beta"),
                "gemini-1.5-pro"
            ),
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn gemini_10_stays_on_v1() {
        assert_eq!(
            resolve_base_url(None, "gemini-pro"),
            "https://generativelanguage.googleapis.com/v1"
        );
    }

    #[test]
    fn endpoint_puts_key_in_query() {
        let url = build_endpoint(
            "https://generativelanguage.googleapis.com/v1",
            "gemini-pro",
            "AIza-test",
        );
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent?key=AIza-test"
        );
    }

    #[test]
    fn finish_reasons_map_to_distinct_errors() {
        assert_eq!(
            finish_reason_error("SAFETY").unwrap().to_string(),
            "AI declined to analyze due to safety filters."
        );
        assert_eq!(
            finish_reason_error("RECITATION").unwrap().to_string(),
            "Response blocked due to recitation policy."
        );
        assert_eq!(
            finish_reason_error("MAX_TOKENS").unwrap().to_string(),
            "Response truncated due to token limit."
        );
        assert!(finish_reason_error("STOP").is_none());
    }

    #[test]
    fn standard_parts_shape_concatenated() {
        let candidate = json!({
            "content": {"parts": [{"text": "Hello "}, {"text": "world"}]}
        });
        assert_eq!(extract_candidate_text(&candidate), "Hello world");
    }

    #[test]
    fn alternative_content_text_shape() {
        let candidate = json!({"content": {"text": "alt shape"}});
        assert_eq!(extract_candidate_text(&candidate), "alt shape");
    }

    #[test]
    fn direct_text_shape() {
        let candidate = json!({"text": "direct"});
        assert_eq!(extract_candidate_text(&candidate), "direct");
    }

    #[test]
    fn unknown_shape_yields_empty() {
        assert_eq!(extract_candidate_text(&json!({"foo": "bar"})), "");
    }

    #[test]
    fn missing_key_short_circuits() {
        let adapter = GeminiAdapter::new(Arc::new(CredentialVault::new("s")));
        let config = ModelConfig {
            provider_name: "gemini".into(),
            base_url: None,
            model_name: "gemini-pro".into(),
            api_key_encrypted: String::new(),
            temperature: 0.7,
            max_tokens: 1000,
            enabled: true,
        };
        let result = adapter.call(&config, &ClinicalPayload::default());
        assert!(matches!(result, Err(GatewayError::ApiKeyMissing)));
    }
}
