use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SNIPPET_MAX_LEN;

/// Categorical trust level in an extracted field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Outcome of a single field extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldResult {
    pub value: Option<String>,
    pub confidence: Confidence,
}

impl FieldResult {
    pub fn found(value: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            value: Some(value.into()),
            confidence,
        }
    }

    /// "Not determined"; a missing value is never paired with high
    /// confidence.
    pub fn not_found() -> Self {
        Self {
            value: None,
            confidence: Confidence::Low,
        }
    }
}

/// The five extracted policy fields. `None` means "not determined".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyFields {
    pub return_window: Option<String>,
    pub condition_requirements: Option<String>,
    pub fees: Option<String>,
    pub return_shipping: Option<String>,
    pub exclusions: Option<String>,
}

impl PolicyFields {
    /// Whether any field carries a non-empty value. Used to decide whether a
    /// remote extraction response is worth keeping.
    pub fn has_any_value(&self) -> bool {
        [
            &self.return_window,
            &self.condition_requirements,
            &self.fees,
            &self.return_shipping,
            &self.exclusions,
        ]
        .into_iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Per-field confidence, parallel to [`PolicyFields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfidence {
    pub return_window: Confidence,
    pub condition_requirements: Confidence,
    pub fees: Confidence,
    pub return_shipping: Confidence,
    pub exclusions: Confidence,
}

impl Default for PolicyConfidence {
    fn default() -> Self {
        Self {
            return_window: Confidence::Low,
            condition_requirements: Confidence::Low,
            fees: Confidence::Low,
            return_shipping: Confidence::Low,
            exclusions: Confidence::Low,
        }
    }
}

/// Structured, confidence-scored summary of one store's return policy.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub domain: String,
    pub policy_url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<Url>,
    pub extracted_at: DateTime<Utc>,
    pub fields: PolicyFields,
    pub confidence: PolicyConfidence,
    pub raw_text_snippet: String,
}

impl PolicySummary {
    pub fn new(
        domain: impl Into<String>,
        policy_url: Url,
        page_url: Option<Url>,
        fields: PolicyFields,
        confidence: PolicyConfidence,
        text: &str,
    ) -> Self {
        Self {
            domain: domain.into(),
            policy_url,
            page_url,
            extracted_at: Utc::now(),
            fields,
            confidence,
            raw_text_snippet: snippet(text),
        }
    }
}

/// First [`SNIPPET_MAX_LEN`] characters of the source text.
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_MAX_LEN) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
