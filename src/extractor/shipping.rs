//! Return-shipping classification.
//!
//! Classifies into `Free returns | Seller pays | Customer pays | Varies by
//! item/reason` from three phrase sets plus a defective/damaged/incorrect
//! carve-out. When a waived-cost phrase and a customer-pays phrase coexist
//! with a carve-out, that is a coherent combined rule, not a contradiction.

use crate::extractor::model::{Confidence, FieldResult};

const FREE_PHRASES: &[&str] = &[
    "free returns",
    "free return shipping",
    "return shipping is free",
    "returns are free",
    "prepaid return label",
    "prepaid label",
];

const SELLER_PHRASES: &[&str] = &[
    "we pay for return shipping",
    "we cover return shipping",
    "we'll cover the return shipping",
    "we provide a return label",
    "return label provided",
    "at our expense",
];

const CUSTOMER_PHRASES: &[&str] = &[
    "customer pays",
    "customers pay",
    "buyer pays",
    "customer is responsible",
    "customers are responsible",
    "you are responsible for return shipping",
    "responsible for return shipping",
    "at your own cost",
    "at your own expense",
    "at your expense",
];

const DEFECT_CARVE_OUTS: &[&str] = &[
    "defective",
    "damaged",
    "wrong item",
    "incorrect item",
    "our error",
    "our mistake",
];

pub fn extract(text: &str) -> FieldResult {
    let free = contains_any(text, FREE_PHRASES);
    let seller = contains_any(text, SELLER_PHRASES);
    let customer = contains_any(text, CUSTOMER_PHRASES);
    let defect = contains_any(text, DEFECT_CARVE_OUTS);

    match (customer, free || seller, defect) {
        (true, true, true) => FieldResult::found(
            "Customer pays; seller covers defective or incorrect items",
            Confidence::High,
        ),
        (true, true, false) => FieldResult::found("Varies by item/reason", Confidence::Medium),
        (true, false, _) => FieldResult::found("Customer pays", Confidence::High),
        (false, true, _) => {
            if free {
                FieldResult::found("Free returns", Confidence::High)
            } else {
                FieldResult::found("Seller pays", Confidence::High)
            }
        }
        (false, false, true) => FieldResult::found("Varies by item/reason", Confidence::Medium),
        (false, false, false) => FieldResult::not_found(),
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}
