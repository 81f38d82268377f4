//! Command-line front end: run the full pipeline against one storefront URL
//! and print the resulting context state as JSON.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;
use url::Url;

use policylens::config::Config;
use policylens::dom::HtmlDocument;
use policylens::host::MemoryStore;
use policylens::orchestrator::state::{DetectionIndicators, DetectionResult};
use policylens::{Orchestrator, PageSnapshot};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Some(raw_url) = std::env::args().nth(1) else {
        bail!("usage: policylens <storefront-url>");
    };
    let url = Url::parse(&raw_url).with_context(|| format!("invalid url '{raw_url}'"))?;
    let Some(domain) = url.host_str().map(str::to_string) else {
        bail!("url '{raw_url}' has no host");
    };

    let config = Config::from_env().context("Failed to load configuration")?;
    let orchestrator = Orchestrator::new(config, Arc::new(MemoryStore::new()));

    let response = policylens::fetcher::fetch(&url)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;
    let document = HtmlDocument::parse(&response.body, response.url_final.clone());
    let page = PageSnapshot::from_document(&document);

    // The CLI skips browser-side detection; the caller asserting the URL is
    // a storefront is the detection signal.
    let detection = DetectionResult {
        is_shopify: true,
        confidence: 100,
        domain,
        indicators: DetectionIndicators::default(),
    };

    let state = orchestrator.on_detection("cli", detection, page).await;
    println!("{}", serde_json::to_string_pretty(&state)?);

    Ok(())
}
