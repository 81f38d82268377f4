use crate::extractor::extract_fields;
use crate::extractor::model::Confidence;

const FULL_POLICY: &str = "Returns are accepted within 30 days of delivery. Items must be \
    unworn with tags. A 15% restocking fee applies. Customer pays return shipping. Final \
    sale items cannot be returned.";

const ALL_SALES_FINAL: &str = "All sales are final. No returns or exchanges.";

#[test]
fn full_policy_extracts_all_five_fields() {
    let (fields, confidence) = extract_fields(FULL_POLICY);

    assert_eq!(fields.return_window.as_deref(), Some("30 days"));
    assert_eq!(confidence.return_window, Confidence::High);

    let conditions = fields.condition_requirements.unwrap();
    assert!(conditions.contains("unworn"));
    assert!(confidence.condition_requirements >= Confidence::Medium);

    let fees = fields.fees.unwrap();
    assert!(fees.contains("15%"));
    assert!(fees.contains("restocking"));
    assert_eq!(confidence.fees, Confidence::High);

    assert_eq!(fields.return_shipping.as_deref(), Some("Customer pays"));
    assert_eq!(confidence.return_shipping, Confidence::High);

    let exclusions = fields.exclusions.unwrap();
    assert!(exclusions.contains("final sale"));
    assert!(exclusions.contains("cannot be returned"));
    assert_eq!(confidence.exclusions, Confidence::High);
}

#[test]
fn all_sales_final_is_the_return_window_answer() {
    let (fields, confidence) = extract_fields(ALL_SALES_FINAL);

    let window = fields.return_window.unwrap();
    assert!(window.contains("final"));
    assert_eq!(confidence.return_window, Confidence::High);

    // The other fields carry no signal here; none of them may claim high
    // confidence for a value they did not find.
    for (value, conf) in [
        (&fields.condition_requirements, confidence.condition_requirements),
        (&fields.fees, confidence.fees),
        (&fields.return_shipping, confidence.return_shipping),
    ] {
        if value.is_none() {
            assert_eq!(conf, Confidence::Low);
        }
    }
}

#[test]
fn null_return_window_pairs_with_low_confidence() {
    let (fields, confidence) = extract_fields("we make candles from local beeswax");
    assert!(fields.return_window.is_none());
    assert_eq!(confidence.return_window, Confidence::Low);
}

#[test]
fn extraction_is_case_insensitive() {
    let (lower, _) = extract_fields(&FULL_POLICY.to_lowercase());
    let (upper, _) = extract_fields(&FULL_POLICY.to_uppercase());
    assert_eq!(lower.return_window, upper.return_window);
    assert_eq!(lower.return_shipping, upper.return_shipping);
}

#[test]
fn empty_input_extracts_nothing() {
    let (fields, confidence) = extract_fields("");
    assert!(!fields.has_any_value());
    assert_eq!(confidence.return_window, Confidence::Low);
    assert_eq!(confidence.exclusions, Confidence::Low);
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn extract_never_panics(text in ".{0,2000}") {
            let _ = extract_fields(&text);
        }

        #[test]
        fn missing_values_never_claim_high(text in ".{0,2000}") {
            let (fields, confidence) = extract_fields(&text);
            if fields.return_window.is_none() {
                prop_assert!(confidence.return_window < Confidence::High);
            }
            if fields.exclusions.is_none() {
                prop_assert!(confidence.exclusions < Confidence::High);
            }
        }
    }
}
