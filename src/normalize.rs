//! Response normalization: raw provider text → canonical `SuggestionResult`.
//!
//! Layered recovery, never an error:
//! 1. strip markdown code fences
//! 2. slice from first `{` to last `}` (drops conversational filler)
//! 3. strict JSON parse, defaulting optional fields
//! 4. on parse failure, regex-based partial extraction with per-field
//!    placeholder text
//!
//! The partial-extraction regexes are deliberately simple (first quoted
//! string after a key; quoted strings after the array bracket to end of
//! text). They can mismatch nested quotes in adversarial truncations —
//! accepted imprecision of a best-effort fallback. Callers detect
//! degradation by inspecting field values, not an error channel.

use regex::Regex;
use serde_json::Value;

use crate::clinical::SuggestionResult;

pub const DEFAULT_FOLLOWUP: &str = "Refer to ophthalmologist";
pub const DEFAULT_DISCLAIMER: &str = "AI-generated. Consult a professional.";
pub const TRUNCATED_DISCLAIMER: &str = "This response was truncated and may be incomplete.";
const TRUNCATED_FOLLOWUP: &str = "Unable to determine from truncated response";

const REQUIRED_FIELDS: [&str; 3] = [
    "summary_for_doctor",
    "patient_friendly_summary",
    "treatment_plan",
];

/// Parse raw provider text into a `SuggestionResult`. Never fails; calling
/// twice on the same input yields identical output.
pub fn parse(raw: &str) -> SuggestionResult {
    if raw.trim().is_empty() {
        tracing::warn!("empty provider response, returning placeholder result");
        return truncated_fallback();
    }

    let cleaned = strip_code_fences(raw);
    let sliced = slice_json_span(&cleaned);

    match serde_json::from_str::<Value>(sliced) {
        Ok(Value::Object(map)) => from_parsed(&map),
        Ok(_) | Err(_) => {
            let head: String = cleaned.chars().take(100).collect();
            tracing::warn!(
                "strict JSON parse failed, falling back to partial extraction (head: {head:?})"
            );
            extract_partial(&cleaned)
        }
    }
}

/// Remove ```json / ``` fences, case-insensitive.
fn strip_code_fences(text: &str) -> String {
    let json_fence = Regex::new(r"(?i)```json\s*").unwrap();
    let bare_fence = Regex::new(r"```\s*").unwrap();
    let without_json = json_fence.replace_all(text, "");
    bare_fence.replace_all(&without_json, "").into_owned()
}

/// Slice to the span between the first `{` and the last `}`, when both
/// exist. Discards leading/trailing prose around the JSON object.
fn slice_json_span(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &text[start..=end],
        _ => text,
    }
}

/// Build the result from a successfully parsed JSON object, substituting
/// placeholders for absent required fields and defaults for the rest.
fn from_parsed(map: &serde_json::Map<String, Value>) -> SuggestionResult {
    SuggestionResult {
        summary_for_doctor: required_string(map, REQUIRED_FIELDS[0]),
        patient_friendly_summary: required_string(map, REQUIRED_FIELDS[1]),
        treatment_plan: required_list(map, REQUIRED_FIELDS[2]),
        medication_suggestions: optional_list(map, "medication_suggestions"),
        lifestyle_recommendations: optional_list(map, "lifestyle_recommendations"),
        followup_interval: optional_string(map, "followup_interval", DEFAULT_FOLLOWUP),
        red_flag_warnings: optional_list(map, "red_flag_warnings"),
        disclaimer: optional_string(map, "disclaimer", DEFAULT_DISCLAIMER),
    }
}

fn missing_field_placeholder(field: &str) -> String {
    format!("Information for {field} was not generated.")
}

fn required_string(map: &serde_json::Map<String, Value>, field: &str) -> String {
    match map.get(field).and_then(Value::as_str) {
        Some(s) => s.to_string(),
        None => missing_field_placeholder(field),
    }
}

fn required_list(map: &serde_json::Map<String, Value>, field: &str) -> Vec<String> {
    // A present-but-empty array counts as supplied; only an absent or
    // non-array field earns the placeholder.
    match map.get(field).and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => vec![missing_field_placeholder(field)],
    }
}

fn optional_string(map: &serde_json::Map<String, Value>, field: &str, default: &str) -> String {
    map.get(field)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn optional_list(map: &serde_json::Map<String, Value>, field: &str) -> Vec<String> {
    map.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Regex-based recovery for malformed/truncated JSON.
fn extract_partial(content: &str) -> SuggestionResult {
    let summary = first_quoted_after(content, "summary_for_doctor")
        .unwrap_or_else(|| "Partial summary extracted from truncated response".to_string());
    let patient = first_quoted_after(content, "patient_friendly_summary").unwrap_or_else(|| {
        "Patient-friendly summary not available in truncated response".to_string()
    });

    SuggestionResult {
        summary_for_doctor: summary,
        patient_friendly_summary: patient,
        treatment_plan: extract_treatment_plan(content),
        medication_suggestions: vec![],
        lifestyle_recommendations: vec![],
        followup_interval: TRUNCATED_FOLLOWUP.to_string(),
        red_flag_warnings: vec![],
        disclaimer: TRUNCATED_DISCLAIMER.to_string(),
    }
}

/// First quoted string following `"key":`. Tolerates a missing closing
/// quote so a value cut off mid-string still yields its prefix.
fn first_quoted_after(content: &str, key: &str) -> Option<String> {
    let pattern = format!(r#""{key}"\s*:\s*"([^"]*)"#);
    let re = Regex::new(&pattern).unwrap();
    re.captures(content).map(|cap| cap[1].to_string())
}

/// Quoted strings following `"treatment_plan": [` to end of text.
fn extract_treatment_plan(content: &str) -> Vec<String> {
    let key_re = Regex::new(r#""treatment_plan"\s*:\s*\["#).unwrap();
    let Some(m) = key_re.find(content) else {
        return vec!["Treatment plan not available in truncated response".to_string()];
    };

    let item_re = Regex::new(r#""([^"]*?)""#).unwrap();
    let items: Vec<String> = item_re
        .captures_iter(&content[m.end()..])
        .map(|cap| cap[1].to_string())
        .collect();

    if items.is_empty() {
        vec!["Treatment plan not fully available in truncated response".to_string()]
    } else {
        items
    }
}

/// Last-resort result when nothing at all could be recovered.
fn truncated_fallback() -> SuggestionResult {
    SuggestionResult {
        summary_for_doctor: "Could not parse truncated response".to_string(),
        patient_friendly_summary: "Response was truncated".to_string(),
        treatment_plan: vec!["Response was incomplete".to_string()],
        medication_suggestions: vec![],
        lifestyle_recommendations: vec![],
        followup_interval: TRUNCATED_FOLLOWUP.to_string(),
        red_flag_warnings: vec![],
        disclaimer: TRUNCATED_DISCLAIMER.to_string(),
    }
}
