//! Condition-requirement extraction ("unworn, tags attached, ...").

use crate::extractor::model::{Confidence, FieldResult};
use crate::extractor::{sentences, truncate_display};

const DISPLAY_LEN: usize = 200;
const MAX_SENTENCES: usize = 2;

const KEYWORDS: &[&str] = &[
    "unworn",
    "unused",
    "unwashed",
    "unopened",
    "tags",
    "original packaging",
    "original condition",
    "proof of purchase",
    "receipt",
    "resalable",
    "resellable",
];

/// Phrases that make a qualifying sentence an explicit requirement.
const ANCHOR_PHRASES: &[&str] = &["must be", "items must", "needs to be", "required to be"];

const NEGATIONS: &[&str] = &["not eligible", "no longer", "cannot be", "will not be"];

pub fn extract(text: &str) -> FieldResult {
    let mut picked: Vec<&str> = Vec::new();
    let mut confidence = Confidence::Medium;
    let mut negated = false;

    for sentence in sentences(text) {
        let hits = KEYWORDS.iter().filter(|k| sentence.contains(*k)).count();
        if hits == 0 {
            continue;
        }
        if picked.contains(&sentence) {
            continue;
        }

        if hits >= 2 || ANCHOR_PHRASES.iter().any(|a| sentence.contains(a)) {
            confidence = Confidence::High;
        }
        if NEGATIONS.iter().any(|n| sentence.contains(n)) {
            negated = true;
        }

        picked.push(sentence);
        if picked.len() == MAX_SENTENCES {
            break;
        }
    }

    if picked.is_empty() {
        return FieldResult::not_found();
    }

    // Negated requirements read as exclusions, not conditions; keep the text
    // but drop the trust one level.
    if negated {
        confidence = match confidence {
            Confidence::High => Confidence::Medium,
            _ => Confidence::Low,
        };
    }

    FieldResult::found(truncate_display(&picked.join("; "), DISPLAY_LEN), confidence)
}
