//! Canonical route conventions for storefront policy pages.

use url::Url;

/// Policy page families the resolver knows how to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyType {
    Refund,
    Shipping,
    Privacy,
    Terms,
}

/// Historically-known canonical paths, most likely first.
pub fn canonical_paths(policy: PolicyType) -> &'static [&'static str] {
    match policy {
        PolicyType::Refund => &[
            "/policies/refund-policy",
            "/pages/return-policy",
            "/pages/returns",
            "/pages/refund-policy",
            "/pages/returnpolicy",
            "/pages/refund",
        ],
        PolicyType::Shipping => &[
            "/policies/shipping-policy",
            "/pages/shipping-policy",
            "/pages/shipping",
        ],
        PolicyType::Privacy => &["/policies/privacy-policy", "/pages/privacy-policy"],
        PolicyType::Terms => &["/policies/terms-of-service", "/pages/terms-of-service"],
    }
}

/// Candidate URLs from route conventions, joined against the page origin.
pub fn candidate_urls(page_url: &Url, policy: PolicyType) -> Vec<Url> {
    let Some(origin) = origin_of(page_url) else {
        return Vec::new();
    };
    canonical_paths(policy)
        .iter()
        .filter_map(|path| origin.join(path).ok())
        .collect()
}

/// Self-classification by path shape: whether this URL already is a policy
/// page, and of which type.
pub fn classify_policy_page(url: &Url) -> Option<PolicyType> {
    let path = url.path().to_lowercase();

    let shape = path.starts_with("/policies/")
        || path.starts_with("/pages/return")
        || path.starts_with("/pages/refund")
        || path.starts_with("/pages/shipping");
    if !shape {
        return None;
    }

    if path.contains("refund") || path.contains("return") {
        Some(PolicyType::Refund)
    } else if path.contains("shipping") {
        Some(PolicyType::Shipping)
    } else if path.contains("privacy") {
        Some(PolicyType::Privacy)
    } else if path.contains("terms") {
        Some(PolicyType::Terms)
    } else {
        None
    }
}

fn origin_of(url: &Url) -> Option<Url> {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Some(origin)
}
