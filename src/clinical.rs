//! Clinical data exchanged with the gateway.
//!
//! `ClinicalPayload` arrives from the caller (web layer, classification
//! pipeline) and is consumed read-only for the duration of one dispatch.
//! `SuggestionResult` is the canonical eight-field output shape every
//! provider response is normalized into — the three clinical fields are
//! structurally always present, so callers can render something even when
//! the provider returned garbage.

use serde::{Deserialize, Serialize};

use crate::providers::GatewayError;

/// Patient demographics. All fields optional — the prompt layer fills in
/// "Unknown Patient" / "Not specified" fallbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// One per-image classification outcome from the retinal analysis model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub class_name: String,
    pub confidence_percent: f64,
}

/// Everything the gateway needs to build a suggestion request.
/// Constructed fresh per call; never stored by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalPayload {
    #[serde(default)]
    pub patient_info: PatientInfo,
    /// Per-image results, in acquisition order.
    #[serde(default)]
    pub results: Vec<ClassificationResult>,
    #[serde(default)]
    pub conclusion: String,
    #[serde(default)]
    pub clinical_notes: Option<String>,
}

/// Canonical suggestion output.
///
/// Invariant: all eight fields are always populated. When the provider's
/// text cannot supply one of the three clinical fields
/// (`summary_for_doctor`, `patient_friendly_summary`, `treatment_plan`),
/// the normalizer substitutes a placeholder naming the field; the remaining
/// five default to safe values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub summary_for_doctor: String,
    pub patient_friendly_summary: String,
    pub treatment_plan: Vec<String>,
    pub medication_suggestions: Vec<String>,
    pub lifestyle_recommendations: Vec<String>,
    pub followup_interval: String,
    pub red_flag_warnings: Vec<String>,
    pub disclaimer: String,
}

/// Wire shape for hard failures: `{"error": "<message>"}`.
///
/// Configuration, transport, and provider failures surface through this
/// shape. Parse degradation never does — the normalizer always produces a
/// full `SuggestionResult` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl From<GatewayError> for ErrorResult {
    fn from(err: GatewayError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}
