//! Provider model configuration.
//!
//! A `ModelConfig` is owned by the caller's settings store; the gateway
//! reads it per call and never mutates it. The API key travels only in its
//! encrypted form — display surfaces go through `ModelConfigView`, which
//! carries a masked rendering instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::crypto::CredentialVault;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MIN_MAX_TOKENS: u32 = 100;
pub const MAX_MAX_TOKENS: u32 = 4000;

/// One configured provider/model pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Lowercase provider key: openai, gemini, perplexity, grok, deepseek,
    /// glm, or custom.
    pub provider_name: String,
    /// Override for the provider's default endpoint. Required for `custom`.
    #[serde(default)]
    pub base_url: Option<String>,
    pub model_name: String,
    /// Opaque ciphertext from `CredentialVault::encrypt`. Never logged.
    #[serde(default)]
    pub api_key_encrypted: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_enabled() -> bool {
    true
}

impl ModelConfig {
    /// Validate field constraints. Returns a field-keyed error map; empty
    /// means valid.
    pub fn validate(&self) -> HashMap<&'static str, String> {
        let mut errors = HashMap::new();

        if self.provider_name.trim().is_empty() {
            errors.insert("provider_name", "Provider name is required".to_string());
        }

        if self.model_name.trim().is_empty() {
            errors.insert("model_name", "Model name is required".to_string());
        }

        if self.provider_name == "custom"
            && self
                .base_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            errors.insert(
                "base_url",
                "Base URL is required for custom providers".to_string(),
            );
        }

        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            errors.insert(
                "temperature",
                "Temperature must be between 0 and 2".to_string(),
            );
        }

        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            errors.insert(
                "max_tokens",
                "Max tokens must be between 100 and 4000".to_string(),
            );
        }

        errors
    }

    /// Display form with the key masked. Safe to serialize to a settings UI.
    pub fn to_view(&self, vault: &CredentialVault) -> ModelConfigView {
        ModelConfigView {
            provider_name: self.provider_name.clone(),
            base_url: self.base_url.clone(),
            model_name: self.model_name.clone(),
            api_key_masked: vault.mask(&vault.decrypt(&self.api_key_encrypted)),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            enabled: self.enabled,
        }
    }
}

/// Masked rendering of a `ModelConfig` — no cleartext, no ciphertext.
#[derive(Debug, Clone, Serialize)]
pub struct ModelConfigView {
    pub provider_name: String,
    pub base_url: Option<String>,
    pub model_name: String,
    pub api_key_masked: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub enabled: bool,
}

/// A predefined provider/model entry for settings screens.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderTemplate {
    pub provider_name: &'static str,
    pub base_url: &'static str,
    pub model_name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

/// Fixed catalogue of known-good provider/model combinations.
pub fn provider_templates() -> Vec<ProviderTemplate> {
    vec![
        ProviderTemplate {
            provider_name: "openai",
            base_url: "https://api.openai.com/v1",
            model_name: "gpt-4",
            display_name: "OpenAI GPT-4",
            description: "Most capable GPT-4 model",
        },
        ProviderTemplate {
            provider_name: "openai",
            base_url: "https://api.openai.com/v1",
            model_name: "gpt-3.5-turbo",
            display_name: "OpenAI GPT-3.5 Turbo",
            description: "Fast and cost-effective model",
        },
        ProviderTemplate {
            provider_name: "gemini",
            base_url: "https://generativelanguage.googleapis.com/v1",
            model_name: "gemini-1.5-pro",
            display_name: "Google Gemini 1.5 Pro",
            description: "Google Gemini 1.5 Pro model",
        },
        ProviderTemplate {
            provider_name: "gemini",
            base_url: "https://generativelanguage.googleapis.com/v1",
            model_name: "gemini-1.5-flash",
            display_name: "Google Gemini 1.5 Flash",
            description: "Google Gemini 1.5 Flash model",
        },
        ProviderTemplate {
            provider_name: "perplexity",
            base_url: "https://api.perplexity.ai",
            model_name: "sonar-medium-chat",
            display_name: "Perplexity Sonar Medium Chat",
            description: "Perplexity Sonar Medium Chat model",
        },
        ProviderTemplate {
            provider_name: "perplexity",
            base_url: "https://api.perplexity.ai",
            model_name: "sonar-small-chat",
            display_name: "Perplexity Sonar Small Chat",
            description: "Perplexity Sonar Small Chat model",
        },
        ProviderTemplate {
            provider_name: "grok",
            base_url: "https://api.x.ai/v1",
            model_name: "grok-beta",
            display_name: "xAI Grok Beta",
            description: "xAI Grok model",
        },
        ProviderTemplate {
            provider_name: "deepseek",
            base_url: "https://api.deepseek.com",
            model_name: "deepseek-chat",
            display_name: "DeepSeek Chat",
            description: "DeepSeek Chat model",
        },
        ProviderTemplate {
            provider_name: "glm",
            base_url: "https://open.bigmodel.cn/api/paas/v4",
            model_name: "glm-4",
            display_name: "GLM-4",
            description: "GLM-4 model",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ModelConfig {
        ModelConfig {
            provider_name: "openai".into(),
            base_url: None,
            model_name: "gpt-4".into(),
            api_key_encrypted: String::new(),
            temperature: 0.7,
            max_tokens: 1000,
            enabled: true,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_empty());
    }

    #[test]
    fn blank_provider_and_model_rejected() {
        let mut config = valid_config();
        config.provider_name = "  ".into();
        config.model_name = String::new();
        let errors = config.validate();
        assert_eq!(errors["provider_name"], "Provider name is required");
        assert_eq!(errors["model_name"], "Model name is required");
    }

    #[test]
    fn custom_provider_requires_base_url() {
        let mut config = valid_config();
        config.provider_name = "custom".into();
        let errors = config.validate();
        assert_eq!(
            errors["base_url"],
            "Base URL is required for custom providers"
        );

        config.base_url = Some("https://llm.internal.example".into());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn temperature_bounds_enforced() {
        let mut config = valid_config();
        config.temperature = 2.1;
        assert!(config.validate().contains_key("temperature"));
        config.temperature = -0.1;
        assert!(config.validate().contains_key("temperature"));
        config.temperature = 2.0;
        assert!(config.validate().is_empty());
        config.temperature = f64::NAN;
        assert!(config.validate().contains_key("temperature"));
    }

    #[test]
    fn max_tokens_bounds_enforced() {
        let mut config = valid_config();
        config.max_tokens = 99;
        assert!(config.validate().contains_key("max_tokens"));
        config.max_tokens = 4001;
        assert!(config.validate().contains_key("max_tokens"));
        config.max_tokens = 4000;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn deserialization_fills_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"provider_name": "glm", "model_name": "glm-4"}"#).unwrap();
        assert!((config.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.max_tokens, 1000);
        assert!(config.enabled);
        assert!(config.api_key_encrypted.is_empty());
    }

    #[test]
    fn templates_cover_all_builtin_providers() {
        let templates = provider_templates();
        for provider in ["openai", "gemini", "perplexity", "grok", "deepseek", "glm"] {
            assert!(
                templates.iter().any(|t| t.provider_name == provider),
                "missing template for {provider}"
            );
        }
    }

    #[test]
    fn view_masks_the_key() {
        let vault = CredentialVault::new("unit-test-secret");
        let mut config = valid_config();
        config.api_key_encrypted = vault.encrypt("sk-live-0123456789abcdef");
        let view = config.to_view(&vault);
        assert!(!view.api_key_masked.contains("0123456789"));
        assert!(view.api_key_masked.starts_with("sk-l"));
        assert!(view.api_key_masked.contains('•'));
    }
}
