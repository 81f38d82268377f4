//! Bounded HTTP fetching for candidate policy pages.
//!
//! One shared client, an 8 second budget per fetch, a body-size cap and
//! charset detection from header, meta tags or byte heuristics. Long-tail
//! storefronts frequently mislabel latin-1 policy pages as UTF-8, so bodies
//! are decoded through `encoding_rs` rather than assumed.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use crate::config::FETCH_TIMEOUT;
use crate::fetcher::{errors::FetchError, types::Charset, types::PageResponse};

const MAX_BODY_SIZE: u64 = 2 * 1024 * 1024; // 2MB
const USER_AGENT: &str = "PolicyLens/0.1 (+https://policylens.example.com)";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(4))
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"
                    .parse()
                    .unwrap(),
            );
            headers
        })
        .build()
        .expect("Failed to build HTTP client")
});

static HEADER_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// Fetch a candidate URL and decode its body to UTF-8.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch(url: &Url) -> Result<PageResponse, FetchError> {
    let response = HTTP_CLIENT
        .get(url.clone())
        .send()
        .await
        .map_err(FetchError::from_reqwest_error)?;

    if let Some(content_length) = response.content_length()
        && content_length > MAX_BODY_SIZE
    {
        return Err(FetchError::BodyTooLarge(content_length));
    }

    let url_final = response.url().clone();
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::Http {
            status,
            retriable: status.is_server_error(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .unwrap_or("text/html")
        .to_string();

    if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Io(e.to_string()))?;

    if body_bytes.len() as u64 > MAX_BODY_SIZE {
        return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
    }

    let encoding = detect_encoding(&content_type, &body_bytes);
    let (decoded, actual, had_errors) = encoding.decode(&body_bytes);
    if had_errors {
        debug!("lossy decode of {url_final} as {}", actual.name());
    }

    Ok(PageResponse {
        url_final,
        status,
        body: decoded.into_owned(),
        charset: Charset::from_encoding(actual),
        fetched_at: Utc::now(),
    })
}

/// Charset from the Content-Type header, a meta tag in the first 4KB, or
/// byte-level detection, in that order.
fn detect_encoding(content_type: &str, body: &[u8]) -> &'static Encoding {
    if let Some(captures) = HEADER_CHARSET.captures(content_type)
        && let Some(label) = captures.get(1)
        && let Some(encoding) = Encoding::for_label(label.as_str().to_lowercase().as_bytes())
    {
        return encoding;
    }

    let head = &body[..body.len().min(4096)];
    let head_str = String::from_utf8_lossy(head);
    if let Some(captures) = META_CHARSET.captures(&head_str)
        && let Some(label) = captures.get(1)
        && let Some(encoding) = Encoding::for_label(label.as_str().to_lowercase().as_bytes())
    {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, false);
    detector.guess(None, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_from_content_type_header() {
        let encoding = detect_encoding("text/html; charset=utf-8", b"<html></html>");
        assert_eq!(encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn charset_from_meta_tag() {
        let body = b"<html><head><meta charset=\"windows-1252\"></head></html>";
        let encoding = detect_encoding("text/html", body);
        assert_eq!(encoding, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn iso_8859_1_maps_to_windows_1252() {
        // encoding_rs treats windows-1252 as the superset decoder.
        let encoding = detect_encoding("text/html; charset=iso-8859-1", b"");
        assert_eq!(encoding, encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn ascii_body_detects_as_decodable() {
        let encoding = detect_encoding("text/html", b"<html><body>plain</body></html>");
        let (decoded, _, _) = encoding.decode(b"plain");
        assert_eq!(decoded, "plain");
    }
}
