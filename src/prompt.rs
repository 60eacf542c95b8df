//! Prompt construction for suggestion requests.
//!
//! The system prompt pins the exact eight-field JSON schema the normalizer
//! expects. The user prompt restates the patient's name, age, and gender in
//! its closing instructions — intentional repetition that steers models
//! toward personalized output, not redundant data.

use crate::clinical::ClinicalPayload;

pub const SYSTEM_PROMPT: &str = r#"You are a medical AI assistant specializing in diabetic retinopathy.
Provide structured treatment suggestions and clinical guidance based on retinal analysis results.

Always respond in this exact JSON format and ensure the entire response is complete (do not truncate):
{
    "summary_for_doctor": "Clinical summary for healthcare provider that includes patient name, age, gender and references clinical notes",
    "patient_friendly_summary": "Patient-friendly explanation that includes patient name",
    "treatment_plan": ["Step 1", "Step 2", ...],
    "medication_suggestions": ["Medication 1", "Medication 2", ...],
    "lifestyle_recommendations": ["Recommendation 1", "Recommendation 2", ...],
    "followup_interval": "Follow-up timing recommendation",
    "red_flag_warnings": ["Warning 1", "Warning 2", ...],
    "disclaimer": "Appropriate medical disclaimer"
}

CRITICAL INSTRUCTIONS:
1. In the "summary_for_doctor", ALWAYS include the patient's name, age, and gender at the beginning
2. Reference the clinical notes and observations provided in the summary
3. In the "patient_friendly_summary", ALWAYS include the patient's name to personalize the response
4. Make all recommendations specific to the patient's demographic and clinical context
5. Ensure treatment plans are personalized based on the patient's age, gender, and clinical presentation
6. Respond with the COMPLETE JSON object - do not truncate or cut off the response
7. Double-check that all JSON brackets and quotation marks are properly closed
8. Ensure ALL arrays (treatment_plan, medication_suggestions, lifestyle_recommendations, red_flag_warnings) are complete and not cut off mid-list
9. Verify that all text fields contain complete sentences and are not truncated
10. UNDER NO CIRCUMSTANCES should you truncate the response due to token limits - use all available space to provide a complete response
11. If you feel you are approaching token limits, prioritize completing the arrays over shortening individual items
12. Always return a valid, complete JSON object regardless of length

Be concise, clinical, and evidence-based in your recommendations. Focus on diabetic retinopathy management and treatment."#;

const NO_NOTES_FALLBACK: &str =
    "No additional clinical observations or current medications provided";

/// The fixed system instruction shared by every provider.
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Resolve a display name from optional first/last names.
fn patient_name(first: Option<&str>, last: Option<&str>) -> String {
    let first = first.map(str::trim).filter(|s| !s.is_empty());
    let last = last.map(str::trim).filter(|s| !s.is_empty());
    match (first, last) {
        (Some(f), Some(l)) => format!("{f} {l}"),
        (Some(f), None) => f.to_string(),
        (None, Some(l)) => l.to_string(),
        (None, None) => "Unknown Patient".to_string(),
    }
}

/// Build the per-call user prompt from the clinical payload.
pub fn build_user_prompt(payload: &ClinicalPayload) -> String {
    let info = &payload.patient_info;
    let name = patient_name(info.first_name.as_deref(), info.last_name.as_deref());
    let age = info
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Not specified".to_string());
    let gender = info
        .gender
        .as_deref()
        .filter(|g| !g.trim().is_empty())
        .unwrap_or("Not specified");

    let mut prompt = format!(
        "\nPATIENT DEMOGRAPHICS:\n\
         - Name: {name}\n\
         - Age: {age}\n\
         - Gender: {gender}\n\n\
         DIABETIC RETINOPATHY ANALYSIS RESULTS:\n"
    );

    for (i, result) in payload.results.iter().enumerate() {
        prompt.push_str(&format!(
            "- Image {}: {} (Confidence: {:.1}%)\n",
            i + 1,
            result.class_name,
            result.confidence_percent
        ));
    }

    let notes = payload
        .clinical_notes
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(NO_NOTES_FALLBACK);

    prompt.push_str(&format!(
        "\nCLINICAL CONCLUSION FROM ANALYSIS:\n{}\n\n\
         CLINICAL OBSERVATIONS & CURRENT MEDICATIONS:\n{notes}\n\n\
         SPECIFIC INSTRUCTIONS FOR AI RESPONSE:\n\
         1. Personalize ALL summaries with the patient's name: {name}\n\
         2. Consider the patient's age ({age}) and gender ({gender}) in your recommendations\n\
         3. Reference the clinical observations in your treatment plan\n\
         4. Make medication suggestions appropriate for {age} year old {gender} patient\n\
         5. Tailor lifestyle recommendations based on patient demographics\n\n\
         ADDITIONAL MEDICAL CONTEXT:\n\
         Please consider standard diabetic retinopathy treatment protocols including:\n\
         - Anti-VEGF medications (Ranibizumab/Lucentis, Aflibercept/Eylea, Bevacizumab/Avastin)\n\
         - Corticosteroids (Dexamethasone, Triamcinolone)\n\
         - Laser treatments (Panretinal photocoagulation, Focal laser)\n\
         - Systemic medications for diabetes management\n\
         - Blood pressure control medications\n\
         - Lipid-lowering agents\n\n\
         Based on this comprehensive clinical information for {name}, please provide structured \
         treatment suggestions and clinical guidance specific to this {age} year old {gender} patient.\n",
        payload.conclusion
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::{ClassificationResult, PatientInfo};

    fn sample_payload() -> ClinicalPayload {
        ClinicalPayload {
            patient_info: PatientInfo {
                first_name: Some("Jane".into()),
                last_name: Some("Doe".into()),
                age: Some(54),
                gender: Some("female".into()),
            },
            results: vec![ClassificationResult {
                class_name: "Mild".into(),
                confidence_percent: 82.3,
            }],
            conclusion: "Mild non-proliferative diabetic retinopathy".into(),
            clinical_notes: Some("On metformin 500mg".into()),
        }
    }

    #[test]
    fn system_prompt_pins_the_schema() {
        let prompt = system_prompt();
        for field in [
            "summary_for_doctor",
            "patient_friendly_summary",
            "treatment_plan",
            "medication_suggestions",
            "lifestyle_recommendations",
            "followup_interval",
            "red_flag_warnings",
            "disclaimer",
        ] {
            assert!(prompt.contains(field), "system prompt missing {field}");
        }
        assert!(prompt.contains("do not truncate"));
    }

    #[test]
    fn user_prompt_contains_name_confidence_and_image_index() {
        let prompt = build_user_prompt(&sample_payload());
        assert!(prompt.contains("Jane Doe"));
        assert!(prompt.contains("82.3%"));
        assert!(prompt.contains("Image 1"));
        assert!(prompt.contains("Mild non-proliferative diabetic retinopathy"));
        assert!(prompt.contains("On metformin 500mg"));
    }

    #[test]
    fn name_restated_in_closing_instructions() {
        let prompt = build_user_prompt(&sample_payload());
        // Demographics block plus personalization instructions plus closing line.
        assert!(prompt.matches("Jane Doe").count() >= 3);
        assert!(prompt.contains("54 year old female patient"));
    }

    #[test]
    fn results_enumerated_in_order_one_decimal() {
        let mut payload = sample_payload();
        payload.results.push(ClassificationResult {
            class_name: "Severe".into(),
            confidence_percent: 67.0,
        });
        let prompt = build_user_prompt(&payload);
        let first = prompt.find("Image 1: Mild (Confidence: 82.3%)").unwrap();
        let second = prompt.find("Image 2: Severe (Confidence: 67.0%)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn name_resolution_fallbacks() {
        assert_eq!(patient_name(Some("Jane"), Some("Doe")), "Jane Doe");
        assert_eq!(patient_name(Some("Jane"), None), "Jane");
        assert_eq!(patient_name(None, Some("Doe")), "Doe");
        assert_eq!(patient_name(None, None), "Unknown Patient");
        assert_eq!(patient_name(Some("  "), Some("")), "Unknown Patient");
    }

    #[test]
    fn missing_notes_get_literal_fallback() {
        let mut payload = sample_payload();
        payload.clinical_notes = None;
        let prompt = build_user_prompt(&payload);
        assert!(prompt.contains(NO_NOTES_FALLBACK));

        payload.clinical_notes = Some("   ".into());
        assert!(build_user_prompt(&payload).contains(NO_NOTES_FALLBACK));
    }

    #[test]
    fn missing_demographics_not_specified() {
        let payload = ClinicalPayload::default();
        let prompt = build_user_prompt(&payload);
        assert!(prompt.contains("Unknown Patient"));
        assert!(prompt.contains("Age: Not specified"));
        assert!(prompt.contains("Gender: Not specified"));
    }
}
