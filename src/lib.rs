//! Oculara — multi-provider AI suggestion gateway for diabetic
//! retinopathy clinical summaries.
//!
//! The gateway accepts a [`ClinicalPayload`], retrieves the configured
//! provider credential from the [`CredentialVault`], performs one blocking
//! chat-completion call against the configured provider, and normalizes
//! whatever text comes back into a canonical [`SuggestionResult`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use oculara::{ClinicalPayload, CredentialVault, Gateway, ModelConfig};
//!
//! let vault = Arc::new(CredentialVault::new("process-secret"));
//! let config = ModelConfig {
//!     provider_name: "openai".into(),
//!     base_url: None,
//!     model_name: "gpt-4".into(),
//!     api_key_encrypted: vault.encrypt("sk-..."),
//!     temperature: 0.7,
//!     max_tokens: 1000,
//!     enabled: true,
//! };
//!
//! let gateway = Gateway::new(vault);
//! match gateway.dispatch(&config, &ClinicalPayload::default()) {
//!     Ok(result) => println!("{}", result.summary_for_doctor),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

pub mod clinical;
pub mod config;
pub mod crypto;
pub mod gateway;
pub mod normalize;
pub mod prompt;
pub mod providers;

pub use clinical::{
    ClassificationResult, ClinicalPayload, ErrorResult, PatientInfo, SuggestionResult,
};
pub use config::{provider_templates, ModelConfig, ModelConfigView, ProviderTemplate};
pub use crypto::CredentialVault;
pub use gateway::Gateway;
pub use providers::{GatewayError, ProviderAdapter};
