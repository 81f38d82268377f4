//! Heuristic rating of whether fetched text is usable policy content.
//!
//! The score gates two decisions: whether a page that claims to already be a
//! policy page is trusted (>= [`QUALITY_ACCEPT_SCORE`]), and whether probing
//! further candidates can stop early (>= [`QUALITY_EARLY_STOP_SCORE`]).
//! Generic shell and help-center landing pages mention "returns" once or
//! twice at most; real policy bodies repeat the vocabulary and carry a
//! duration, which is what separates the two gates.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{MIN_EXTRACTABLE_LEN, QUALITY_ACCEPT_SCORE, QUALITY_EARLY_STOP_SCORE};

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}\s*(?:business\s+)?(?:day|week|month)s?\b").unwrap());

/// Vocabulary terms with per-term occurrence caps. Caps keep a single
/// keyword-stuffed paragraph from dominating the score.
const VOCABULARY: &[(&str, i32)] = &[
    ("return", 3),
    ("refund", 3),
    ("exchange", 2),
    ("policy", 1),
];

const STRUCTURAL_CUES: &[&str] = &[
    "must be",
    "original condition",
    "original packaging",
    "restocking",
    "return shipping",
    "return label",
];

/// Integer quality score for normalized, length-capped text.
pub fn score(text: &str) -> i32 {
    if text.trim().chars().count() < MIN_EXTRACTABLE_LEN {
        return 0;
    }

    let lower = text.to_lowercase();
    let mut total = 0;

    for (term, cap) in VOCABULARY {
        total += (lower.matches(term).count() as i32).min(*cap);
    }

    if DURATION.is_match(&lower) {
        total += 2;
    }

    if STRUCTURAL_CUES.iter().any(|cue| lower.contains(cue)) {
        total += 1;
    }

    total
}

/// Whether text may be accepted as "the" policy text.
pub fn is_acceptable(quality: i32) -> bool {
    quality >= QUALITY_ACCEPT_SCORE
}

/// Whether a candidate is good enough to stop probing the rest.
pub fn clears_early_stop(quality: i32) -> bool {
    quality >= QUALITY_EARLY_STOP_SCORE
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_TEXT: &str = "Our return policy: returns are accepted within 30 days of \
        delivery. To request a refund, items must be in original condition. Refunds are \
        issued within 5 business days. Exchanges are processed the same way and return \
        shipping is free for store credit.";

    #[test]
    fn short_text_is_non_extractable() {
        assert_eq!(score("returns"), 0);
        assert_eq!(score(""), 0);
    }

    #[test]
    fn real_policy_clears_early_stop() {
        let q = score(POLICY_TEXT);
        assert!(clears_early_stop(q), "score was {q}");
    }

    #[test]
    fn shell_page_fails_accept_gate() {
        let shell = "Welcome to our help center. Search our articles or contact support. \
            Popular topics: orders, shipping, account settings, gift cards and more.";
        let q = score(shell);
        assert!(!is_acceptable(q), "score was {q}");
    }

    #[test]
    fn vocabulary_contribution_is_capped() {
        let stuffed = format!("{} end of page", "return return return return ".repeat(20));
        let restrained = "Returns and refunds: our return policy gives you 30 days from \
            delivery to send items back for a refund or exchange.";
        assert!(score(restrained) > score(&stuffed));
    }
}
