//! Local heuristic field extraction.
//!
//! Five independent extractors run over normalized, lower-cased text and
//! each report a value plus a confidence level. They are pure and
//! order-insensitive, so running them in any order (or in parallel) yields
//! the same result. This module is the fallback when the remote extractor
//! is unavailable or returns nothing usable.

pub mod condition;
pub mod exclusions;
pub mod fees;
pub mod model;
pub mod shipping;
pub mod window;

#[cfg(test)]
mod tests;

pub use model::{Confidence, FieldResult, PolicyConfidence, PolicyFields, PolicySummary};

/// Run all five extractors over normalized text.
pub fn extract_fields(text: &str) -> (PolicyFields, PolicyConfidence) {
    let lower = text.to_lowercase();

    let window = window::extract(&lower);
    let condition = condition::extract(&lower);
    let fees = fees::extract(&lower);
    let shipping = shipping::extract(&lower);
    let exclusions = exclusions::extract(&lower);

    let fields = PolicyFields {
        return_window: window.value,
        condition_requirements: condition.value,
        fees: fees.value,
        return_shipping: shipping.value,
        exclusions: exclusions.value,
    };
    let confidence = PolicyConfidence {
        return_window: window.confidence,
        condition_requirements: condition.confidence,
        fees: fees.confidence,
        return_shipping: shipping.confidence,
        exclusions: exclusions.confidence,
    };

    (fields, confidence)
}

/// Split normalized text into sentence-like units. A period between two
/// digits ("$7.50") is not a boundary.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        let boundary = match ch {
            '!' | '?' | '\n' => true,
            '.' => {
                let prev_digit = idx > 0 && bytes[idx - 1].is_ascii_digit();
                let next_digit = bytes.get(idx + 1).is_some_and(u8::is_ascii_digit);
                !(prev_digit && next_digit)
            }
            _ => false,
        };
        if boundary {
            let piece = text[start..idx].trim();
            if !piece.is_empty() {
                out.push(piece);
            }
            start = idx + ch.len_utf8();
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Truncate to a display length without splitting a character.
pub(crate) fn truncate_display(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}
