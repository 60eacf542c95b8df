//! Custom-endpoint adapter for self-hosted or proxied models.
//!
//! Sends an OpenAI-shaped request but tolerates unknown response
//! envelopes: content is tried as `choices[0].message.content`, then a
//! top-level `content` field, then the whole body stringified. The API key
//! is optional — local deployments often run without auth.

use std::sync::Arc;

use serde_json::Value;

use crate::clinical::ClinicalPayload;
use crate::config::ModelConfig;
use crate::crypto::CredentialVault;
use crate::prompt;

use super::{
    http_client, provider_error, transport_error, ChatCompletionRequest, ChatMessage, GatewayError,
    ProviderAdapter,
};

const TIMEOUT_SECS: u64 = 30;

/// Pull the response text out of whatever envelope came back.
pub(crate) fn extract_content(body: &Value) -> String {
    if let Some(content) = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return content.to_string();
    }
    if let Some(content) = body.get("content").and_then(Value::as_str) {
        return content.to_string();
    }
    body.to_string()
}

pub struct CustomAdapter {
    vault: Arc<CredentialVault>,
    client: reqwest::blocking::Client,
}

impl CustomAdapter {
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        Self {
            vault,
            client: http_client(TIMEOUT_SECS),
        }
    }
}

impl ProviderAdapter for CustomAdapter {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn call(
        &self,
        config: &ModelConfig,
        payload: &ClinicalPayload,
    ) -> Result<String, GatewayError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(GatewayError::MissingBaseUrl)?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        // Key optional here — Bearer auth only when one decrypts.
        let api_key = self.vault.decrypt(&config.api_key_encrypted);

        let user_prompt = prompt::build_user_prompt(payload);
        let body = ChatCompletionRequest {
            model: &config.model_name,
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
            top_p: None,
            stream: Some(false),
        };

        let mut request = self.client.post(&endpoint).json(&body);
        if !api_key.is_empty() {
            request = request.bearer_auth(&api_key);
        }

        let response = request
            .send()
            .map_err(|e| transport_error(e, TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(provider_error(status.as_u16(), &text));
        }

        let parsed: Value = response
            .json()
            .map_err(|e| GatewayError::Rejected(format!("Invalid JSON response: {e}")))?;
        Ok(extract_content(&parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_envelope_preferred() {
        let body = json!({
            "choices": [{"message": {"content": "from choices"}}],
            "content": "from content"
        });
        assert_eq!(extract_content(&body), "from choices");
    }

    #[test]
    fn bare_content_field_accepted() {
        let body = json!({"content": "bare content"});
        assert_eq!(extract_content(&body), "bare content");
    }

    #[test]
    fn unknown_envelope_stringified() {
        let body = json!({"output": {"text": "nested"}});
        let content = extract_content(&body);
        assert!(content.contains("nested"));
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let adapter = CustomAdapter::new(Arc::new(CredentialVault::new("s")));
        let config = ModelConfig {
            provider_name: "custom".into(),
            base_url: None,
            model_name: "local-model".into(),
            api_key_encrypted: String::new(),
            temperature: 0.7,
            max_tokens: 1000,
            enabled: true,
        };
        let result = adapter.call(&config, &ClinicalPayload::default());
        assert!(matches!(result, Err(GatewayError::MissingBaseUrl)));
    }
}
