//! Narrow document capability used by the resolver and normalizer.
//!
//! Both a server-fetched HTML string and a live host-provided page can sit
//! behind [`DocumentLike`], so candidate resolution works the same way in
//! either context.

use scraper::{Html, Selector};
use url::Url;

/// An anchor extracted from a document, href resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: Url,
    pub text: String,
}

/// Read-only view over a queryable document.
pub trait DocumentLike {
    /// URL the document was loaded from.
    fn url(&self) -> &Url;

    /// Raw markup of the document.
    fn html(&self) -> &str;

    /// All same-document anchors with resolvable hrefs.
    fn links(&self) -> Vec<Link>;

    /// Anchors underneath the first element matching `selector`.
    fn links_in(&self, selector: &str) -> Vec<Link>;

    /// Combined text of the first element matching `selector`.
    fn select_text(&self, selector: &str) -> Option<String>;
}

/// [`DocumentLike`] backed by a parsed HTML string.
pub struct HtmlDocument {
    url: Url,
    raw: String,
    doc: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str, url: Url) -> Self {
        Self {
            url,
            raw: html.to_string(),
            doc: Html::parse_document(html),
        }
    }

    fn collect_links<'a>(&self, elements: impl Iterator<Item = scraper::ElementRef<'a>>) -> Vec<Link> {
        let mut links = Vec::new();
        for el in elements {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
                continue;
            }
            let Ok(resolved) = self.url.join(href) else {
                continue;
            };
            let text = el.text().collect::<String>().trim().to_string();
            links.push(Link {
                href: resolved,
                text,
            });
        }
        links
    }
}

impl DocumentLike for HtmlDocument {
    fn url(&self) -> &Url {
        &self.url
    }

    fn html(&self) -> &str {
        &self.raw
    }

    fn links(&self) -> Vec<Link> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        self.collect_links(self.doc.select(&selector))
    }

    fn links_in(&self, selector: &str) -> Vec<Link> {
        let Ok(outer) = Selector::parse(selector) else {
            return Vec::new();
        };
        let Ok(anchors) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let Some(root) = self.doc.select(&outer).next() else {
            return Vec::new();
        };
        self.collect_links(root.select(&anchors))
    }

    fn select_text(&self, selector: &str) -> Option<String> {
        let parsed = Selector::parse(selector).ok()?;
        let element = self.doc.select(&parsed).next()?;
        let text = element.text().collect::<String>().trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }
}
