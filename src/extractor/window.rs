//! Return-window extraction.
//!
//! Hard negatives ("all sales final") are checked first: with no duration
//! anywhere in the text they are the answer, at high confidence. Otherwise
//! spelled-out numbers are normalized to digits and every `<n> day/week/month`
//! occurrence is scored against nearby anchor vocabulary. An unanchored
//! duration ("ships in 2 days") is never accepted as a return window.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{WINDOW_SCORE_HIGH, WINDOW_SCORE_MEDIUM};
use crate::extractor::model::{Confidence, FieldResult};
use crate::extractor::sentences;

/// Bytes inspected on each side of a duration match.
const ANCHOR_WINDOW: usize = 90;
/// An anchor this close to the duration earns the proximity bonus.
const NEAR_ANCHOR: usize = 40;

const NEGATIVE_PHRASES: &[&str] = &[
    "all sales are final",
    "all sales final",
    "no returns",
    "no refunds",
    "non-refundable",
    "do not accept returns",
    "not accept returns",
];

const ANCHORS: &[&str] = &["return", "refund", "exchange", "replacement"];

const QUALIFIERS: &[&str] = &[
    "from delivery",
    "of delivery",
    "after delivery",
    "of purchase",
    "of receipt",
    "after receiving",
];

const OPEN_ENDED: &[&str] = &[
    "returns are accepted",
    "returns accepted",
    "we accept returns",
    "case-by-case",
    "case by case",
    "contact us to start a return",
];

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3})\s*(?:\(\s*\d{1,3}\s*\)\s*)?(business\s+)?(day|week|month)s?\b").unwrap()
});

static SPELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(one|two|three|four|five|six|seven|eight|nine|ten|fourteen|fifteen|twenty|twenty-one|thirty|forty-five|forty five|sixty|ninety)\b(\s*\(\s*\d{1,3}\s*\))?(\s+(?:business\s+)?(?:day|week|month)s?)\b",
    )
    .unwrap()
});

pub fn extract(text: &str) -> FieldResult {
    let digits = normalize_number_words(text);

    let negative = NEGATIVE_PHRASES
        .iter()
        .find(|phrase| digits.contains(*phrase));
    let has_duration = DURATION.is_match(&digits);

    if let Some(phrase) = negative
        && !has_duration
    {
        let clause = sentences(&digits)
            .into_iter()
            .find(|s| s.contains(phrase))
            .unwrap_or(phrase)
            .to_string();
        return FieldResult::found(clause, Confidence::High);
    }

    if let Some((value, score)) = best_anchored_duration(&digits) {
        let confidence = if score >= WINDOW_SCORE_HIGH {
            Confidence::High
        } else if score >= WINDOW_SCORE_MEDIUM {
            Confidence::Medium
        } else {
            Confidence::Low
        };
        return FieldResult::found(value, confidence);
    }

    // Open-ended policies carry no duration at all.
    if let Some(phrase) = OPEN_ENDED.iter().find(|phrase| digits.contains(*phrase)) {
        let clause = sentences(&digits)
            .into_iter()
            .find(|s| s.contains(phrase))
            .unwrap_or(phrase)
            .to_string();
        return FieldResult::found(clause, Confidence::Medium);
    }

    FieldResult::not_found()
}

/// Scan every duration occurrence and keep the best-scoring anchored one.
fn best_anchored_duration(text: &str) -> Option<(String, i32)> {
    let mut best: Option<(String, i32)> = None;

    for caps in DURATION.captures_iter(text) {
        let m = caps.get(0)?;
        let (lo, hi) = widen(text, m.start(), m.end(), ANCHOR_WINDOW);
        let window = &text[lo..hi];
        let rel_start = m.start() - lo;
        let rel_end = m.end() - lo;

        let Some(gap) = nearest_anchor_gap(window, rel_start, rel_end) else {
            continue;
        };

        let mut score = 1;
        score += if gap <= NEAR_ANCHOR { 2 } else { 1 };
        if QUALIFIERS.iter().any(|q| window.contains(q)) {
            score += 2;
        }
        if window.contains(" if ") || window.contains("unless") || window.contains("except") {
            score -= 1;
        }
        // "within <n> days" is the strongest phrasing shape.
        if text[..m.start()].trim_end().ends_with("within") {
            score += 1;
        }

        let value = format_duration(&caps);
        match &best {
            Some((_, top)) if *top >= score => {}
            _ => best = Some((value, score)),
        }
    }

    best
}

/// Byte gap between the duration match and the closest anchor word in the
/// window, or `None` when no anchor is present.
fn nearest_anchor_gap(window: &str, rel_start: usize, rel_end: usize) -> Option<usize> {
    let mut nearest: Option<usize> = None;
    for anchor in ANCHORS {
        for (pos, hit) in window.match_indices(anchor) {
            let gap = if pos + hit.len() <= rel_start {
                rel_start - (pos + hit.len())
            } else if pos >= rel_end {
                pos - rel_end
            } else {
                0
            };
            nearest = Some(nearest.map_or(gap, |n| n.min(gap)));
        }
    }
    nearest
}

fn format_duration(caps: &regex::Captures<'_>) -> String {
    let n: u32 = caps[1].parse().unwrap_or(0);
    let business = caps.get(2).is_some();
    let unit = &caps[3];
    let plural = if n == 1 { "" } else { "s" };
    if business {
        format!("{n} business {unit}{plural}")
    } else {
        format!("{n} {unit}{plural}")
    }
}

/// Replace spelled-out numbers with digits when a duration unit follows
/// ("thirty (30) days" -> "30 days").
fn normalize_number_words(text: &str) -> String {
    SPELLED
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let digit = word_to_digit(&caps[1]).unwrap_or("0");
            format!("{}{}", digit, &caps[3])
        })
        .into_owned()
}

fn word_to_digit(word: &str) -> Option<&'static str> {
    Some(match word {
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "ten" => "10",
        "fourteen" => "14",
        "fifteen" => "15",
        "twenty" => "20",
        "twenty-one" => "21",
        "thirty" => "30",
        "forty-five" | "forty five" => "45",
        "sixty" => "60",
        "ninety" => "90",
        _ => return None,
    })
}

fn widen(text: &str, start: usize, end: usize, margin: usize) -> (usize, usize) {
    let mut lo = start.saturating_sub(margin);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + margin).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    (lo, hi)
}
