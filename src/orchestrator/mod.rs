//! Per-context pipeline orchestration.
//!
//! One state machine per browsing context: `idle -> detecting ->
//! {fetching|extracting} -> {done|error}`. All I/O is suspending with
//! explicit budgets, candidate probing is sequential (politeness over
//! latency), and "nothing found" is a valid `done` outcome, not an error.
//! Re-entrant notifications for the same context supersede the in-flight
//! run via the versioned [`ContextStore`].

pub mod state;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::PolicyCache;
use crate::config::{Config, DETECTION_GUARD, MUTATION_WAIT, RENDER_TIMEOUT};
use crate::dom::DocumentLike;
use crate::extractor::extract_fields;
use crate::extractor::model::PolicySummary;
use crate::fetcher;
use crate::host::{HiddenRenderer, KeyValueStore};
use crate::normalizer::normalize;
use crate::quality;
use crate::remote::ExtractorClient;
use crate::resolver::{self, PolicyType, PolicyUrlCandidates};

pub use state::{ContextState, ContextStore, DetectionResult, Status};

/// Everything the orchestrator needs from the page the detection fired on.
/// Built synchronously in page context, before any asynchronous work.
pub struct PageSnapshot {
    pub url: Url,
    pub candidates: PolicyUrlCandidates,
    pub policy_page: Option<PolicyType>,
    pub text: String,
}

impl PageSnapshot {
    /// Resolve candidates and normalize the page text. When the page
    /// self-classifies as a policy page and its text clears the quality
    /// gate, candidate resolution is skipped entirely; a policy-shaped URL
    /// over shell content still gets the full resolution pass.
    pub fn from_document(doc: &dyn DocumentLike) -> Self {
        let url = doc.url().clone();
        let text = normalize(doc.html());
        let policy_page = resolver::classify_policy_page(&url);

        let candidates = match policy_page {
            Some(_) if quality::is_acceptable(quality::score(&text)) => {
                PolicyUrlCandidates::default()
            }
            _ => resolver::resolve(doc),
        };

        Self {
            url,
            candidates,
            policy_page,
            text,
        }
    }
}

#[derive(Error, Debug)]
enum PipelineError {
    #[error("superseded by a newer notification")]
    Superseded,

    #[error("{0}")]
    Fatal(String),
}

struct RunOutcome {
    summary: Option<PolicySummary>,
    from_cache: bool,
}

pub struct Orchestrator {
    config: Config,
    cache: PolicyCache,
    remote: Option<ExtractorClient>,
    renderer: Option<Arc<dyn HiddenRenderer>>,
    contexts: ContextStore,
}

impl Orchestrator {
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let cache = PolicyCache::new(store, config.cache_ttl());
        let remote = config.extractor_url().cloned().map(ExtractorClient::new);
        Self {
            config,
            cache,
            remote,
            renderer: None,
            contexts: ContextStore::new(),
        }
    }

    /// Attach the hidden-render capability for JavaScript-hydrated pages.
    pub fn with_renderer(mut self, renderer: Arc<dyn HiddenRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cache handle, exposed for diagnostics (`stats`) and manual sweeps.
    pub fn cache(&self) -> &PolicyCache {
        &self.cache
    }

    pub fn context_state(&self, ctx_id: &str) -> Option<ContextState> {
        self.contexts.get(ctx_id)
    }

    /// Forget a context entirely (its tab closed).
    pub fn drop_context(&self, ctx_id: &str) {
        self.contexts.drop_context(ctx_id);
    }

    /// Drive the pipeline for one detection notification. Returns the
    /// context's state as of this run settling, which is the newer run's
    /// state when this one was superseded mid-flight.
    #[instrument(skip(self, detection, page), fields(domain = %detection.domain))]
    pub async fn on_detection(
        &self,
        ctx_id: &str,
        detection: DetectionResult,
        page: PageSnapshot,
    ) -> ContextState {
        if !detection.is_shopify {
            debug!("not a storefront, clearing context {ctx_id}");
            self.contexts.clear(ctx_id);
            return self
                .contexts
                .get(ctx_id)
                .unwrap_or_else(ContextState::idle);
        }

        let initial = ContextState {
            detection: Some(detection.clone()),
            summary: None,
            status: Status::Detecting,
            from_cache: false,
            error_message: None,
        };
        let (version, token) = self.contexts.begin(ctx_id, initial);

        let state = match self.run(ctx_id, version, &detection, &page, &token).await {
            Ok(outcome) => ContextState {
                detection: Some(detection),
                summary: outcome.summary,
                status: Status::Done,
                from_cache: outcome.from_cache,
                error_message: None,
            },
            Err(PipelineError::Superseded) => {
                debug!("run for {ctx_id} superseded, discarding result");
                return self
                    .contexts
                    .get(ctx_id)
                    .unwrap_or_else(ContextState::idle);
            }
            Err(PipelineError::Fatal(message)) => {
                warn!("pipeline failed for {}: {message}", detection.domain);
                ContextState {
                    detection: Some(detection),
                    summary: None,
                    status: Status::Error,
                    from_cache: false,
                    error_message: Some(message),
                }
            }
        };

        self.contexts.commit(ctx_id, version, state);
        self.contexts
            .get(ctx_id)
            .unwrap_or_else(ContextState::idle)
    }

    /// Wait until the context reaches a terminal state, up to the standard
    /// detection guard.
    pub async fn wait_for_completion(&self, ctx_id: &str) -> Option<ContextState> {
        self.wait_for_completion_within(ctx_id, DETECTION_GUARD).await
    }

    pub async fn wait_for_completion_within(
        &self,
        ctx_id: &str,
        timeout: Duration,
    ) -> Option<ContextState> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(state) = self.contexts.get(ctx_id)
                && state.status.is_terminal()
            {
                return Some(state);
            }
            if tokio::time::Instant::now() >= deadline {
                return self.contexts.get(ctx_id);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn run(
        &self,
        ctx_id: &str,
        version: u64,
        detection: &DetectionResult,
        page: &PageSnapshot,
        token: &CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        if detection.domain.trim().is_empty() {
            return Err(PipelineError::Fatal(
                "detection carried no domain".to_string(),
            ));
        }

        // Already on the policy page: extract locally without fetching.
        if page.policy_page.is_some() {
            let score = quality::score(&page.text);
            if quality::is_acceptable(score) {
                info!(
                    "current page is the policy page (quality {score}), extracting in place"
                );
                self.contexts.set_status(ctx_id, version, Status::Extracting);
                let summary = self
                    .build_summary(detection, page.url.clone(), Some(page.url.clone()), &page.text)
                    .await;
                self.store_summary(&summary).await;
                return Ok(RunOutcome {
                    summary: Some(summary),
                    from_cache: false,
                });
            }
            debug!("policy-shaped url but low quality text ({score}), resolving candidates");
        }

        match self.cache.get(&detection.domain).await {
            Ok(Some(summary)) => {
                info!("cache hit for {}", detection.domain);
                return Ok(RunOutcome {
                    summary: Some(summary),
                    from_cache: true,
                });
            }
            Ok(None) => {}
            Err(e) => warn!("cache read failed for {}: {e}", detection.domain),
        }

        self.contexts.set_status(ctx_id, version, Status::Fetching);
        let probed = self.probe_candidates(&page.candidates, token).await?;

        let mut chosen = match probed {
            Some((url, text, score)) if quality::is_acceptable(score) => Some((url, text)),
            Some((url, _, score)) => {
                debug!("best candidate {url} failed the quality gate ({score})");
                None
            }
            None => None,
        };

        if chosen.is_none() && page.candidates.has_help_center_shape() {
            chosen = self.render_fallback(&page.candidates, token).await?;
        }

        let Some((policy_url, text)) = chosen else {
            info!("no viable policy candidate for {}", detection.domain);
            return Ok(RunOutcome {
                summary: None,
                from_cache: false,
            });
        };

        if token.is_cancelled() {
            return Err(PipelineError::Superseded);
        }
        self.contexts.set_status(ctx_id, version, Status::Extracting);

        let summary = self
            .build_summary(detection, policy_url, Some(page.url.clone()), &text)
            .await;
        self.store_summary(&summary).await;

        Ok(RunOutcome {
            summary: Some(summary),
            from_cache: false,
        })
    }

    /// Walk the candidate list in priority order, returning immediately on
    /// a candidate that clears the early-stop bar, else the best seen.
    /// Falls back to the shipping URL when the list is empty outright.
    async fn probe_candidates(
        &self,
        candidates: &PolicyUrlCandidates,
        token: &CancellationToken,
    ) -> Result<Option<(Url, String, i32)>, PipelineError> {
        let list: Vec<Url> = if candidates.refund.is_empty() {
            candidates.shipping.iter().cloned().collect()
        } else {
            candidates.refund.clone()
        };

        let mut best: Option<(Url, String, i32)> = None;
        for url in list {
            if token.is_cancelled() {
                return Err(PipelineError::Superseded);
            }

            let text = match self.fetch_text(&url).await {
                Ok(text) => text,
                Err(e) if e.is_transient() => {
                    debug!("transient fetch failure for {url}: {e}, trying next candidate");
                    continue;
                }
                Err(e) => {
                    debug!("skipping candidate {url}: {e}");
                    continue;
                }
            };

            let score = quality::score(&text);
            if quality::clears_early_stop(score) {
                info!("candidate {url} cleared the early-stop bar ({score})");
                return Ok(Some((url, text, score)));
            }
            if best.as_ref().is_none_or(|(_, _, top)| score > *top) {
                best = Some((url, text, score));
            }
        }

        Ok(best)
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, fetcher::FetchError> {
        let response = fetcher::fetch(url).await?;
        Ok(normalize(&response.body))
    }

    /// Last resort for JavaScript-hydrated help centers: render the page in
    /// a hidden context and re-read its text. The rendered text is only
    /// used when it clears the accept gate; the hidden context is disposed
    /// by the renderer regardless of outcome.
    async fn render_fallback(
        &self,
        candidates: &PolicyUrlCandidates,
        token: &CancellationToken,
    ) -> Result<Option<(Url, String)>, PipelineError> {
        let Some(renderer) = &self.renderer else {
            return Ok(None);
        };
        let Some(target) = candidates
            .refund
            .iter()
            .find(|url| resolver::is_help_center_link(url))
        else {
            return Ok(None);
        };
        if token.is_cancelled() {
            return Err(PipelineError::Superseded);
        }

        let vocabulary = vec!["return".to_string(), "refund".to_string()];
        let rendered = tokio::time::timeout(
            RENDER_TIMEOUT,
            renderer.render(target.clone(), vocabulary, MUTATION_WAIT, RENDER_TIMEOUT),
        )
        .await;

        match rendered {
            Ok(Ok(Some(raw))) => {
                let text = normalize(&raw);
                let score = quality::score(&text);
                if quality::is_acceptable(score) {
                    info!("render fallback produced usable policy text ({score})");
                    return Ok(Some((target.clone(), text)));
                }
                debug!("render fallback text failed the quality gate ({score})");
            }
            Ok(Ok(None)) => debug!("render fallback saw no policy vocabulary"),
            Ok(Err(e)) => warn!("render fallback failed: {e}"),
            Err(_) => warn!("render fallback timed out"),
        }
        Ok(None)
    }

    /// Remote extraction with local heuristic fallback, then assemble the
    /// immutable summary.
    async fn build_summary(
        &self,
        detection: &DetectionResult,
        policy_url: Url,
        page_url: Option<Url>,
        text: &str,
    ) -> PolicySummary {
        let (fields, confidence) = match &self.remote {
            Some(client) => match client.extract(text, &detection.domain).await {
                Some(pair) => pair,
                None => extract_fields(text),
            },
            None => extract_fields(text),
        };

        PolicySummary::new(&detection.domain, policy_url, page_url, fields, confidence, text)
    }

    async fn store_summary(&self, summary: &PolicySummary) {
        if let Err(e) = self.cache.put(summary).await {
            warn!("failed to cache summary for {}: {e}", summary.domain);
        }
    }
}
