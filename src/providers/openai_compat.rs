//! The OpenAI-compatible chat-completions family.
//!
//! OpenAI, Grok, DeepSeek, and GLM all speak the same wire shape and
//! differ only in default base URL (and whether an explicit
//! `stream: false` is sent), so one adapter type covers all four.

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

pub struct OpenAiCompatAdapter {
    name: &'static str,
    default_base_url: &'static str,
    send_stream_flag: bool,
    vault: Arc<CredentialVault>,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatAdapter {
    pub fn openai(vault: Arc<CredentialVault>) -> Self {
        Self::build("openai", "https://api.openai.com/v1", false, vault)
    }

    pub fn grok(vault: Arc<CredentialVault>) -> Self {
        Self::build("grok", "https://api.x.ai/v1", true, vault)
    }

    pub fn deepseek(vault: Arc<CredentialVault>) -> Self {
        Self::build("deepseek", "https://api.deepseek.com", true, vault)
    }

    pub fn glm(vault: Arc<CredentialVault>) -> Self {
        Self::build("glm", "https://open.bigmodel.cn/api/paas/v4", true, vault)
    }

    fn build(
        name: &'static str,
        default_base_url: &'static str,
        send_stream_flag: bool,
        vault: Arc<CredentialVault>,
    ) -> Self {
        Self {
            name,
            default_base_url,
            send_stream_flag,
            vault,
            client: http_client(TIMEOUT_SECS),
        }
    }

    fn endpoint(&self, config: &ModelConfig) -> String {
        let base = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(self.default_base_url);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

impl ProviderAdapter for OpenAiCompatAdapter {
    fn name(&self) -> &'static str {
        self.name
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
            stream: self.send_stream_flag.then_some(false),
        };

        tracing::debug!(provider = self.name, model = %config.model_name, "sending chat completion request");

        let response = self
            .client
            .post(self.endpoint(config))
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .map_err(|e| transport_error(e, TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(provider_error(status.as_u16(), &text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| GatewayError::Rejected(format!("Invalid JSON response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::Rejected("API returned no choices in response".to_string()))
    }
}
