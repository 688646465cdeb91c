//! Placeholder extraction: locates placeholders in an uploaded package and
//! enriches them with semantic descriptions.
//!
//! Detection is deterministic (`document::find_placeholders`). Enrichment is
//! pluggable: `LlmPlaceholderDescriber` asks the model, `HeuristicDescriber`
//! derives hints from the field type. Enrichment never adds, removes, renames
//! or reorders placeholders.

pub mod prompts;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::document::{extract_text, find_placeholders, DocxError, DocxPackage};
use crate::errors::AppError;
use crate::extraction::prompts::{DESCRIBE_PROMPT_TEMPLATE, DESCRIBE_SYSTEM};
use crate::llm_client::prompts::{fill_template, EXACT_NAMES_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::{FieldType, Placeholder};

/// Characters of document text sent along with the enrichment prompt.
const MAX_PROMPT_DOCUMENT_CHARS: usize = 6000;

/// Result of opening an upload: its plain text and detected placeholders.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub placeholders: Vec<Placeholder>,
}

/// Opens the package and detects placeholders in document order.
pub fn extract_placeholders(document: &[u8]) -> Result<Extraction, DocxError> {
    let package = DocxPackage::from_bytes(document)?;
    let text = extract_text(&package)?;
    let placeholders = find_placeholders(&text);
    Ok(Extraction { text, placeholders })
}

/// What the describer learned about one placeholder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceholderInsight {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inferred_name: Option<String>,
    #[serde(default)]
    pub inference_confidence: Option<f32>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    #[serde(default)]
    placeholders: Vec<PlaceholderInsight>,
}

/// Enrichment backend. Carried in `AppState` as `Arc<dyn PlaceholderDescriber>`.
#[async_trait]
pub trait PlaceholderDescriber: Send + Sync {
    async fn describe(
        &self,
        document_text: &str,
        placeholders: &[Placeholder],
    ) -> Result<Vec<PlaceholderInsight>, AppError>;

    /// "llm" | "heuristic"
    fn backend(&self) -> &'static str;
}

/// Merges insights into the list by name. Unknown names are ignored.
pub fn apply_insights(placeholders: &mut [Placeholder], insights: Vec<PlaceholderInsight>) {
    for insight in insights {
        let Some(target) = placeholders.iter_mut().find(|p| p.name == insight.name) else {
            debug!("Ignoring insight for unknown placeholder '{}'", insight.name);
            continue;
        };

        if let Some(field_type) = insight.field_type {
            target.field_type = field_type;
        }
        if let Some(description) = insight.description.filter(|d| !d.trim().is_empty()) {
            target.description = Some(description.trim().to_string());
        }
        target.inferred_name = insight
            .inferred_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty() && *n != target.name);
        target.inference_confidence = insight.inference_confidence.map(|c| c.clamp(0.0, 1.0));
        target.reasoning = insight.reasoning.filter(|r| !r.trim().is_empty());
    }
}

/// Runs the describer and merges what it returns. Failures are logged and the
/// placeholders keep their default descriptions.
pub async fn enrich(
    describer: &dyn PlaceholderDescriber,
    document_text: &str,
    placeholders: &mut [Placeholder],
) {
    if placeholders.is_empty() {
        return;
    }
    match describer.describe(document_text, placeholders).await {
        Ok(insights) => apply_insights(placeholders, insights),
        Err(e) => warn!(
            "Placeholder enrichment ({}) failed, keeping defaults: {e}",
            describer.backend()
        ),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicDescriber: default when no API key is configured
// ────────────────────────────────────────────────────────────────────────────

pub struct HeuristicDescriber;

#[async_trait]
impl PlaceholderDescriber for HeuristicDescriber {
    async fn describe(
        &self,
        _document_text: &str,
        placeholders: &[Placeholder],
    ) -> Result<Vec<PlaceholderInsight>, AppError> {
        Ok(placeholders
            .iter()
            .map(|p| {
                let field_type = FieldType::infer(&p.name);
                PlaceholderInsight {
                    name: p.name.clone(),
                    field_type: Some(field_type),
                    description: Some(describe_type(&p.name, field_type)),
                    ..PlaceholderInsight::default()
                }
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "heuristic"
    }
}

fn describe_type(name: &str, field_type: FieldType) -> String {
    let lower = name.to_lowercase();
    match field_type {
        FieldType::Date => format!("The {lower} (e.g. January 1, 2025)"),
        FieldType::Currency => format!("The {lower}, including the currency (e.g. $50,000)"),
        FieldType::PersonName => format!("Full legal name for {lower}"),
        FieldType::CompanyName => format!("Registered legal name for {lower}"),
        FieldType::Address => format!("Full postal address for {lower}"),
        FieldType::Email => format!("Email address for {lower}"),
        FieldType::Phone => format!("Phone number for {lower}"),
        FieldType::Number => format!("A number for {lower}"),
        FieldType::Text => format!("Please provide: {lower}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmPlaceholderDescriber
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmPlaceholderDescriber(pub LlmClient);

#[async_trait]
impl PlaceholderDescriber for LlmPlaceholderDescriber {
    async fn describe(
        &self,
        document_text: &str,
        placeholders: &[Placeholder],
    ) -> Result<Vec<PlaceholderInsight>, AppError> {
        let prompt = build_describe_prompt(document_text, placeholders)?;
        let response: DescribeResponse = self
            .0
            .call_json(&prompt, DESCRIBE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Placeholder analysis failed: {e}")))?;
        debug!(
            "LLM described {} of {} placeholders",
            response.placeholders.len(),
            placeholders.len()
        );
        Ok(response.placeholders)
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

fn build_describe_prompt(
    document_text: &str,
    placeholders: &[Placeholder],
) -> Result<String, AppError> {
    let names: Vec<&str> = placeholders.iter().map(|p| p.name.as_str()).collect();
    let names_json = serde_json::to_string_pretty(&names)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize names: {e}")))?;
    let excerpt: String = document_text.chars().take(MAX_PROMPT_DOCUMENT_CHARS).collect();

    Ok(fill_template(
        DESCRIBE_PROMPT_TEMPLATE,
        &[
            ("exact_names_instruction", EXACT_NAMES_INSTRUCTION),
            ("names_json", names_json.as_str()),
            ("document_text", excerpt.as_str()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::docx_from_lines;

    struct FailingDescriber;

    #[async_trait]
    impl PlaceholderDescriber for FailingDescriber {
        async fn describe(
            &self,
            _document_text: &str,
            _placeholders: &[Placeholder],
        ) -> Result<Vec<PlaceholderInsight>, AppError> {
            Err(AppError::Llm("offline".to_string()))
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    fn names(placeholders: &[Placeholder]) -> Vec<&str> {
        placeholders.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_extract_placeholders_from_upload() {
        let bytes = docx_from_lines(&[
            "SAFE between [Company Name] and [Investor Name]",
            "Purchase amount: [Purchase Amount] on [Date]",
        ]);
        let extraction = extract_placeholders(&bytes).unwrap();
        assert_eq!(
            names(&extraction.placeholders),
            ["Company Name", "Investor Name", "Purchase Amount", "Date"]
        );
        assert!(extraction.text.contains("SAFE between"));
    }

    #[test]
    fn test_extract_rejects_non_docx() {
        assert!(extract_placeholders(b"%PDF-1.7").is_err());
    }

    #[test]
    fn test_apply_insights_never_changes_names_or_order() {
        let mut placeholders = vec![Placeholder::new("A", ""), Placeholder::new("B", "")];
        apply_insights(
            &mut placeholders,
            vec![
                PlaceholderInsight {
                    name: "B".to_string(),
                    field_type: Some(FieldType::Date),
                    description: Some("Signing date".to_string()),
                    inferred_name: Some("Signing Date".to_string()),
                    inference_confidence: Some(1.7),
                    reasoning: Some("near signature block".to_string()),
                },
                PlaceholderInsight {
                    name: "Invented".to_string(),
                    ..PlaceholderInsight::default()
                },
            ],
        );

        assert_eq!(names(&placeholders), ["A", "B"]);
        let b = &placeholders[1];
        assert_eq!(b.field_type, FieldType::Date);
        assert_eq!(b.description.as_deref(), Some("Signing date"));
        assert_eq!(b.inferred_name.as_deref(), Some("Signing Date"));
        assert_eq!(b.inference_confidence, Some(1.0));
        assert_eq!(placeholders[0].description.as_deref(), Some("Please provide: a"));
    }

    #[test]
    fn test_inferred_name_equal_to_name_is_dropped() {
        let mut placeholders = vec![Placeholder::new("Date", "")];
        apply_insights(
            &mut placeholders,
            vec![PlaceholderInsight {
                name: "Date".to_string(),
                inferred_name: Some("Date".to_string()),
                ..PlaceholderInsight::default()
            }],
        );
        assert!(placeholders[0].inferred_name.is_none());
    }

    #[test]
    fn test_llm_response_deserializes_with_missing_fields() {
        let json = r#"{"placeholders": [{"name": "Date", "type": "date"}, {"name": "X", "type": "weird"}]}"#;
        let response: DescribeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.placeholders[0].field_type, Some(FieldType::Date));
        assert_eq!(response.placeholders[1].field_type, Some(FieldType::Text));
        assert!(response.placeholders[0].description.is_none());
    }

    #[test]
    fn test_describe_prompt_lists_names_and_truncates_text() {
        let text = "z".repeat(MAX_PROMPT_DOCUMENT_CHARS + 500);
        let prompt = build_describe_prompt(&text, &[Placeholder::new("Company Name", "")]).unwrap();
        assert!(prompt.contains("\"Company Name\""));
        assert!(prompt.contains(EXACT_NAMES_INSTRUCTION));
        assert_eq!(prompt.matches('z').count(), MAX_PROMPT_DOCUMENT_CHARS);
    }

    #[tokio::test]
    async fn test_heuristic_describer_sets_type_specific_hints() {
        let mut placeholders = vec![
            Placeholder::new("Effective Date", ""),
            Placeholder::new("Purchase Amount", ""),
        ];
        enrich(&HeuristicDescriber, "", &mut placeholders).await;
        assert_eq!(
            placeholders[0].description.as_deref(),
            Some("The effective date (e.g. January 1, 2025)")
        );
        assert_eq!(placeholders[1].field_type, FieldType::Currency);
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_defaults() {
        let mut placeholders = vec![Placeholder::new("Company Name", "")];
        let before = placeholders.clone();
        enrich(&FailingDescriber, "text", &mut placeholders).await;
        assert_eq!(placeholders, before);
    }
}
