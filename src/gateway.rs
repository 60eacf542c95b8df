//! Gateway dispatcher: provider name → adapter → normalized result.
//!
//! The registry is built once and read-only afterwards; the gateway holds
//! no per-call state, so one instance serves concurrent dispatches
//! (one blocking call each, bounded by the adapter's timeout).

use std::collections::HashMap;
use std::sync::Arc;

use crate::clinical::{ClinicalPayload, SuggestionResult};
use crate::config::ModelConfig;
use crate::crypto::CredentialVault;
use crate::normalize;
use crate::providers::{
    CustomAdapter, GatewayError, GeminiAdapter, OpenAiCompatAdapter, PerplexityAdapter,
    ProviderAdapter,
};

pub struct Gateway {
    adapters: HashMap<&'static str, Box<dyn ProviderAdapter>>,
}

impl Gateway {
    /// Build the fixed seven-adapter registry, all sharing one vault.
    pub fn new(vault: Arc<CredentialVault>) -> Self {
        let adapters: Vec<Box<dyn ProviderAdapter>> = vec![
            Box::new(OpenAiCompatAdapter::openai(Arc::clone(&vault))),
            Box::new(GeminiAdapter::new(Arc::clone(&vault))),
            Box::new(PerplexityAdapter::new(Arc::clone(&vault))),
            Box::new(OpenAiCompatAdapter::grok(Arc::clone(&vault))),
            Box::new(OpenAiCompatAdapter::deepseek(Arc::clone(&vault))),
            Box::new(OpenAiCompatAdapter::glm(Arc::clone(&vault))),
            Box::new(CustomAdapter::new(vault)),
        ];
        Self {
            adapters: adapters
                .into_iter()
                .map(|adapter| (adapter.name(), adapter))
                .collect(),
        }
    }

    /// Registered provider names.
    pub fn providers(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.adapters.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Resolve the provider, perform one call, and normalize the raw text.
    ///
    /// Configuration problems (disabled model, unknown provider) return
    /// before any network I/O. Adapter failures propagate as
    /// `GatewayError`; whatever text a provider returns — complete JSON or
    /// not — always normalizes into a full `SuggestionResult`.
    pub fn dispatch(
        &self,
        config: &ModelConfig,
        payload: &ClinicalPayload,
    ) -> Result<SuggestionResult, GatewayError> {
        if !config.enabled {
            return Err(GatewayError::ModelDisabled);
        }

        let provider = config.provider_name.to_lowercase();
        let adapter = self
            .adapters
            .get(provider.as_str())
            .ok_or_else(|| GatewayError::UnsupportedProvider(provider.clone()))?;

        tracing::debug!(provider = %provider, model = %config.model_name, "dispatching suggestion request");
        let raw = adapter.call(config, payload)?;
        Ok(normalize::parse(&raw))
    }
}
