//! Candidate policy-URL resolution.
//!
//! Runs against the currently-open page (via [`DocumentLike`]) and builds a
//! ranked candidate list for the refund/return policy from three sources:
//! canonical route conventions, scored footer links, and help-center deep
//! links rewritten to known refund-article slugs. Shipping, privacy and
//! terms get a single best guess each. No network traffic happens here;
//! candidates are probed later, sequentially, by the orchestrator.

pub mod routes;

use std::collections::HashSet;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use url::Url;

use crate::dom::{DocumentLike, Link};
pub use routes::{PolicyType, classify_policy_page};

const POSITIVE_KEYWORDS: &[&str] = &["return", "refund", "exchange"];
const NEGATIVE_KEYWORDS: &[&str] = &["privacy", "terms", "shipping", "faq", "contact", "warranty"];

/// Query keys that embed a help-center sub-path.
const HELP_QUERY_KEYS: &[&str] = &["page", "article", "topic"];

/// Article slugs worth trying when a help-center link points somewhere
/// unrelated.
const REFUND_SLUGS: &[&str] = &["returns", "return-policy", "refund-policy"];

const FOOTER_SELECTORS: &[&str] = &["footer", ".footer", "#footer", "[class*='footer']"];

/// Characters escaped when rebuilding a query string.
const QUERY_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b'&').add(b'=').add(b'#').add(b'+');

/// Ranked refund candidates plus single best guesses for the other policy
/// types. Built once per page visit, superseded (never mutated) by a fresh
/// resolution.
#[derive(Debug, Clone, Default)]
pub struct PolicyUrlCandidates {
    pub refund: Vec<Url>,
    pub shipping: Option<Url>,
    pub privacy: Option<Url>,
    pub terms: Option<Url>,
}

impl PolicyUrlCandidates {
    /// Whether the refund list contains a known low-yield shape that
    /// justifies the hidden-render fallback when nothing clears the bar.
    pub fn has_help_center_shape(&self) -> bool {
        self.refund.iter().any(is_help_center_link)
    }
}

/// Build the full candidate set for the document's origin.
pub fn resolve(doc: &dyn DocumentLike) -> PolicyUrlCandidates {
    let page_url = doc.url();
    let footer = footer_links(doc);

    let mut refund: Vec<Url> = routes::candidate_urls(page_url, PolicyType::Refund);

    let mut scored: Vec<(i32, &Link)> = footer
        .iter()
        .map(|link| (score_refund_link(link), link))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, link) in &scored {
        refund.push(link.href.clone());
    }
    for (_, link) in &scored {
        refund.extend(expand_help_center(&link.href));
    }

    PolicyUrlCandidates {
        refund: dedupe(refund),
        shipping: single_best(page_url, &footer, PolicyType::Shipping, "shipping"),
        privacy: single_best(page_url, &footer, PolicyType::Privacy, "privacy"),
        terms: single_best(page_url, &footer, PolicyType::Terms, "terms"),
    }
}

/// Same-origin links from the page footer, falling back to all links when
/// no footer-shaped container exists.
fn footer_links(doc: &dyn DocumentLike) -> Vec<Link> {
    let host = doc.url().host_str().map(str::to_string);
    let mut links = Vec::new();
    for selector in FOOTER_SELECTORS {
        links = doc.links_in(selector);
        if !links.is_empty() {
            break;
        }
    }
    if links.is_empty() {
        links = doc.links();
    }
    links
        .into_iter()
        .filter(|link| link.href.host_str().map(str::to_string) == host)
        .collect()
}

fn score_refund_link(link: &Link) -> i32 {
    let text = link.text.to_lowercase();
    let href = link.href.path().to_lowercase();
    let mut score = 0;

    for keyword in POSITIVE_KEYWORDS {
        if text.contains(keyword) {
            score += 3;
        }
        if href.contains(keyword) {
            score += 2;
        }
    }
    for keyword in NEGATIVE_KEYWORDS {
        if text.contains(keyword) || href.contains(keyword) {
            score -= 2;
        }
    }
    if classify_policy_page(&link.href) == Some(PolicyType::Refund) {
        score += 4;
    }

    score
}

/// Whether a URL has a help-center shape (deep-link path or query-embedded
/// sub-path). These frequently hydrate their content with JavaScript.
pub fn is_help_center_link(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    if path.contains("/hc/") || path.contains("/help") {
        return true;
    }
    url.query_pairs()
        .any(|(key, _)| HELP_QUERY_KEYS.contains(&key.as_ref()))
}

/// Rewrite a query-embedded sub-path to known refund-article slugs when the
/// current sub-path looks unrelated (mentions neither returns nor refunds).
fn expand_help_center(url: &Url) -> Vec<Url> {
    if !is_help_center_link(url) {
        return Vec::new();
    }

    let Some((key, value)) = url
        .query_pairs()
        .find(|(key, _)| HELP_QUERY_KEYS.contains(&key.as_ref()))
    else {
        return Vec::new();
    };
    let current = value.to_lowercase();
    if current.contains("return") || current.contains("refund") {
        return Vec::new();
    }

    let key = key.into_owned();
    REFUND_SLUGS
        .iter()
        .filter_map(|slug| rewrite_query_value(url, &key, slug))
        .collect()
}

fn rewrite_query_value(url: &Url, key: &str, new_value: &str) -> Option<Url> {
    let rebuilt: Vec<String> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if k == key { new_value } else { v.as_ref() };
            format!(
                "{}={}",
                utf8_percent_encode(&k, QUERY_ESCAPE),
                utf8_percent_encode(value, QUERY_ESCAPE)
            )
        })
        .collect();

    let mut out = url.clone();
    out.set_query(Some(&rebuilt.join("&")));
    Some(out)
}

fn single_best(
    page_url: &Url,
    footer: &[Link],
    policy: PolicyType,
    keyword: &str,
) -> Option<Url> {
    if let Some(canonical) = routes::candidate_urls(page_url, policy).into_iter().next() {
        return Some(canonical);
    }
    footer
        .iter()
        .find(|link| {
            link.text.to_lowercase().contains(keyword)
                || link.href.path().to_lowercase().contains(keyword)
        })
        .map(|link| link.href.clone())
}

/// De-duplicate preserving resolver-derived priority order.
fn dedupe(urls: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlDocument;

    fn page(html: &str, url: &str) -> HtmlDocument {
        HtmlDocument::parse(html, Url::parse(url).unwrap())
    }

    #[test]
    fn canonical_routes_come_first() {
        let doc = page(
            r#"<body><footer><a href="/pages/our-returns">Returns</a></footer></body>"#,
            "https://shop.example.com/products/hat",
        );
        let candidates = resolve(&doc);
        assert_eq!(
            candidates.refund[0].as_str(),
            "https://shop.example.com/policies/refund-policy"
        );
        assert!(
            candidates
                .refund
                .iter()
                .any(|u| u.path() == "/pages/our-returns")
        );
    }

    #[test]
    fn candidates_are_deduplicated() {
        // Footer link matches a canonical route exactly.
        let doc = page(
            r#"<body><footer><a href="/policies/refund-policy">Refund policy</a></footer></body>"#,
            "https://shop.example.com/",
        );
        let candidates = resolve(&doc);
        let mut seen = HashSet::new();
        for url in &candidates.refund {
            assert!(seen.insert(url.as_str()), "duplicate candidate: {url}");
        }
    }

    #[test]
    fn negative_keywords_push_links_out() {
        let doc = page(
            r#"<body><footer>
                <a href="/pages/privacy-policy">Privacy policy</a>
                <a href="/pages/contact">Contact us</a>
            </footer></body>"#,
            "https://shop.example.com/",
        );
        let candidates = resolve(&doc);
        assert!(
            candidates
                .refund
                .iter()
                .all(|u| !u.path().contains("privacy") && !u.path().contains("contact"))
        );
    }

    #[test]
    fn cross_origin_links_are_ignored() {
        let doc = page(
            r#"<body><footer><a href="https://elsewhere.com/returns">Returns</a></footer></body>"#,
            "https://shop.example.com/",
        );
        let candidates = resolve(&doc);
        assert!(
            candidates
                .refund
                .iter()
                .all(|u| u.host_str() == Some("shop.example.com"))
        );
    }

    #[test]
    fn help_center_links_are_expanded_with_refund_slugs() {
        let doc = page(
            r#"<body><footer>
                <a href="/a/help?page=shipping-options">Returns and more</a>
            </footer></body>"#,
            "https://shop.example.com/",
        );
        let candidates = resolve(&doc);
        assert!(candidates.has_help_center_shape());
        assert!(
            candidates
                .refund
                .iter()
                .any(|u| u.query().is_some_and(|q| q.contains("return")))
        );
    }

    #[test]
    fn help_center_link_already_about_returns_is_not_rewritten() {
        let url = Url::parse("https://shop.example.com/a/help?page=returns").unwrap();
        assert!(expand_help_center(&url).is_empty());
    }

    #[test]
    fn shipping_resolves_to_canonical_route() {
        let doc = page("<body></body>", "https://shop.example.com/");
        let candidates = resolve(&doc);
        assert_eq!(
            candidates.shipping.unwrap().as_str(),
            "https://shop.example.com/policies/shipping-policy"
        );
    }
}
