//! Exclusion extraction ("final sale", "cannot be returned", ...).

use crate::extractor::model::{Confidence, FieldResult};
use crate::extractor::{sentences, truncate_display};

const DISPLAY_LEN: usize = 250;
const MAX_SENTENCES: usize = 3;

const KEYWORDS: &[&str] = &[
    "final sale",
    "cannot be returned",
    "non-returnable",
    "not eligible for return",
    "cannot be exchanged",
    "excluded from",
    "gift card",
    "clearance",
    "personalized",
    "custom-made",
    "intimates",
    "perishable",
    "opened software",
];

/// Signals strong enough to force high confidence on their own.
const STRONG_SIGNALS: &[&str] = &["final sale", "cannot be returned", "non-returnable"];

pub fn extract(text: &str) -> FieldResult {
    let mut picked: Vec<&str> = Vec::new();
    let mut confidence = Confidence::Medium;

    for sentence in sentences(text) {
        if !KEYWORDS.iter().any(|k| sentence.contains(k)) {
            continue;
        }
        if picked.contains(&sentence) {
            continue;
        }
        if STRONG_SIGNALS.iter().any(|s| sentence.contains(s)) {
            confidence = Confidence::High;
        }
        picked.push(sentence);
        if picked.len() == MAX_SENTENCES {
            break;
        }
    }

    if picked.is_empty() {
        return FieldResult::not_found();
    }

    FieldResult::found(truncate_display(&picked.join("; "), DISPLAY_LEN), confidence)
}
