//! Restocking/processing fee extraction.
//!
//! Specific fee-bearing patterns are matched before generic no-fee phrases:
//! a policy that says both ("free returns, except a 15% restocking fee on
//! opened items") has conditional fees and is reported as the mixed clause
//! at medium confidence.

use std::sync::LazyLock;

use regex::Regex;

use crate::extractor::model::{Confidence, FieldResult};
use crate::extractor::sentences;

static SPECIFIC_FEES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{1,3}\s*%[^.\n]{0,40}(?:restock\w*|fee)",
        r"(?:restock\w*|handling|processing)\s+fee[^.\n]{0,40}?(?:\d{1,3}\s*%|\$\s*\d+)",
        r"\$\s*\d+(?:\.\d{2})?[^.\n]{0,40}(?:restock\w*|fee)",
        r"deducted from (?:your |the )?refund",
        r"fee of \$?\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const NO_FEE_PHRASES: &[&str] = &[
    "no restocking fee",
    "free returns",
    "no fee",
    "free of charge",
    "at no cost",
    "no charge",
];

pub fn extract(text: &str) -> FieldResult {
    let fee_clause = SPECIFIC_FEES.iter().find_map(|re| {
        let m = re.find(text)?;
        sentence_containing(text, m.as_str())
    });
    let no_fee_clause = NO_FEE_PHRASES
        .iter()
        .find_map(|phrase| sentence_containing(text, phrase));

    match (fee_clause, no_fee_clause) {
        // Conditional fees: report the fee-bearing clause, hedged.
        (Some(fee), Some(_)) => FieldResult::found(fee, Confidence::Medium),
        (Some(fee), None) => FieldResult::found(fee, Confidence::High),
        (None, Some(free)) => FieldResult::found(free, Confidence::Medium),
        (None, None) => FieldResult::not_found(),
    }
}

fn sentence_containing(text: &str, needle: &str) -> Option<String> {
    sentences(text)
        .into_iter()
        .find(|s| s.contains(needle))
        .map(str::to_string)
}
