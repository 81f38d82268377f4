//! HTML to bounded plain text reduction.
//!
//! The normalizer is a pure function of its input: it strips boilerplate and
//! overlay-widget subtrees, converts block boundaries to newlines, decodes
//! the common named entities, collapses whitespace and caps total length so
//! every downstream consumer works on bounded input. Normalizing output a
//! second time is a no-op, which lets rendered-text and fetched-markup paths
//! share one entry point.

use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::config::MAX_TEXT_LEN;

/// Subtrees that never contain policy prose.
const STRIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "iframe", "svg", "noscript", "form", "button",
    "select", "template",
];

/// Elements whose boundaries should become line breaks.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article", "tr",
    "table", "blockquote", "pre", "dd", "dt",
];

/// Ordered preference list for a policy-body-shaped content container.
/// The first one yielding non-trivial text wins.
const CONTENT_SELECTORS: &[&str] = &[
    ".shopify-policy__body",
    ".policy",
    ".rte",
    "#MainContent",
    "main",
    "article",
    "[role='main']",
    "#content",
    ".content",
];

/// A container below this much extracted text is not trusted to hold the
/// policy body.
const MIN_CONTAINER_LEN: usize = 200;

static OVERLAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)chat|cookie|consent|modal|popup|newsletter|gdpr|overlay").unwrap()
});

static SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\x0B\x0C\u{A0}]+").unwrap());

static NEWLINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*").unwrap());

/// A tag the HTML parser would act on. Decoded entities can leave stray
/// angle-bracket tokens ("<unworn>") in plain text; those must not trip
/// this.
static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:html|head|body|title|meta|link|div|p|a|span|br|ul|ol|li|h[1-6]|main|article|section|header|footer|nav|table|tr|td|th|blockquote|pre|dd|dt|form|button|select|template|iframe|svg|noscript|script|style|img)\b",
    )
    .unwrap()
});

/// Reduce raw markup (or already-normalized text) to capped plain text.
pub fn normalize(input: &str) -> String {
    // Already-plain text never goes back through the HTML parser: the
    // parser would eat angle-bracket tokens left by entity decoding.
    if !MARKUP_TAG.is_match(input) {
        let decoded = decode_entities(input);
        let collapsed = collapse_whitespace(&decoded);
        return truncate_chars(&collapsed, MAX_TEXT_LEN);
    }

    let document = Html::parse_document(input);

    let mut out = String::new();
    match pick_container(&document) {
        Some(container) => collect_text(*container, &mut out),
        None => {
            for child in document.tree.root().children() {
                collect_text(child, &mut out);
            }
        }
    }

    let decoded = decode_entities(&out);
    let collapsed = collapse_whitespace(&decoded);
    truncate_chars(&collapsed, MAX_TEXT_LEN)
}

/// Prefer a policy-shaped container; fall back to the document body.
fn pick_container(document: &Html) -> Option<ElementRef<'_>> {
    for raw in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let mut probe = String::new();
            collect_text(*element, &mut probe);
            if probe.trim().chars().count() > MIN_CONTAINER_LEN {
                return Some(element);
            }
        }
    }

    let body = Selector::parse("body").ok()?;
    document.select(&body).next()
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&text.text),
        Node::Element(el) => {
            let name = el.name();
            if STRIP_TAGS.contains(&name) || is_overlay(el) {
                return;
            }
            if name == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            for child in node.children() {
                collect_text(child, out);
            }
            if block {
                out.push('\n');
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Overlay widgets (chat, cookie banners, consent modals) are matched by
/// class or id rather than tag.
fn is_overlay(el: &scraper::node::Element) -> bool {
    if let Some(id) = el.id()
        && OVERLAY_PATTERN.is_match(id)
    {
        return true;
    }
    el.classes().any(|class| OVERLAY_PATTERN.is_match(class))
}

/// Decode the five common named entities (plus nbsp). `&amp;` goes last so a
/// single pass never manufactures new entities to decode.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse space runs and newline runs, preserving single newlines.
fn collapse_whitespace(text: &str) -> String {
    let spaced = SPACE_RUNS.replace_all(text, " ");
    let lined = NEWLINE_RUNS.replace_all(&spaced, "\n");
    lined.trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_boilerplate_blocks() {
        let html = r#"<html><head><title>x</title><style>p{}</style></head>
            <body><nav>Home Shop</nav>
            <p>Returns are accepted within 30 days.</p>
            <script>track();</script>
            <footer>Footer links</footer></body></html>"#;
        let text = normalize(html);
        assert!(text.contains("Returns are accepted within 30 days."));
        assert!(!text.contains("track()"));
        assert!(!text.contains("Home Shop"));
        assert!(!text.contains("Footer links"));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn strips_overlay_widgets_by_class() {
        let html = r#"<body><div class="cookie-banner">We use cookies</div>
            <div id="chat-widget">Chat with us</div>
            <p>Refunds are issued to the original payment method.</p></body>"#;
        let text = normalize(html);
        assert!(!text.contains("cookies"));
        assert!(!text.contains("Chat with us"));
        assert!(text.contains("Refunds are issued"));
    }

    #[test]
    fn block_boundaries_become_newlines() {
        let html = "<body><p>First</p><p>Second</p></body>";
        assert_eq!(normalize(html), "First\nSecond");
    }

    #[test]
    fn decodes_named_entities() {
        let html = "<body><p>Socks &amp; shoes &quot;as-is&quot; &lt;unworn&gt;</p></body>";
        let text = normalize(html);
        assert!(text.contains("Socks & shoes \"as-is\" <unworn>"));
    }

    #[test]
    fn prefers_policy_container_over_body() {
        let filler = "Our return policy allows refunds within 30 days of delivery. ".repeat(5);
        let html = format!(
            r#"<body><div class="sidebar">Unrelated sidebar text</div>
               <main><p>{filler}</p></main></body>"#
        );
        let text = normalize(&html);
        assert!(text.contains("return policy"));
        assert!(!text.contains("Unrelated sidebar"));
    }

    #[test]
    fn caps_total_length() {
        let html = format!("<body><p>{}</p></body>", "word ".repeat(5000));
        let text = normalize(&html);
        assert!(text.chars().count() <= MAX_TEXT_LEN);
    }

    #[test]
    fn idempotent_on_own_output() {
        let html = r#"<body><main><p>Returns within 30 days.</p>
            <p>Items must be unworn &amp; unwashed.</p></main></body>"#;
        let once = normalize(html);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn idempotent_when_entities_decode_to_brackets() {
        let html = "<body><p>Items must be &lt;unworn&gt; and in original packaging.</p></body>";
        let once = normalize(html);
        assert!(once.contains("<unworn>"));
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn nbsp_collapses_to_plain_space() {
        let html = "<body><p>Returns within 30&nbsp;days.</p></body>";
        assert_eq!(normalize(html), "Returns within 30 days.");
    }

    #[test]
    fn plain_text_passes_through() {
        let text = "Returns accepted within 14 days of delivery.\nItems must be unused.";
        assert_eq!(normalize(text), text);
    }

    #[cfg(feature = "fuzz")]
    mod fuzz {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalize_is_idempotent(input in "[a-zA-Z0-9 .,\n]{0,400}") {
                let once = normalize(&input);
                prop_assert_eq!(normalize(&once), once);
            }

            #[test]
            fn normalize_never_panics(input in ".*") {
                let _ = normalize(&input);
            }

            #[test]
            fn normalize_respects_cap(input in ".*") {
                prop_assert!(normalize(&input).chars().count() <= MAX_TEXT_LEN);
            }
        }
    }
}
