//! Clients for the remote field extractor and the snapshot backend.
//!
//! The extractor call is best-effort: any transport failure, non-2xx
//! status, malformed body or all-empty response triggers local fallback
//! extraction and is never surfaced to the user. Snapshot persistence is
//! the opposite: its failures (duplicate, validation) are meaningful and
//! reported verbatim to whoever triggered the save.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{Config, REMOTE_TIMEOUT};
use crate::extractor::model::{PolicyConfidence, PolicyFields, PolicySummary};

#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    domain: &'a str,
}

#[derive(Deserialize)]
struct ExtractResponse {
    fields: PolicyFields,
    confidence: PolicyConfidence,
}

#[derive(Error, Debug)]
enum RemoteError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http status {0}")]
    Status(StatusCode),
}

/// Client for `POST /extract`.
pub struct ExtractorClient {
    endpoint: Url,
    client: Client,
}

impl ExtractorClient {
    pub fn new(base: Url) -> Self {
        Self::with_timeout(base, REMOTE_TIMEOUT)
    }

    pub fn with_timeout(base: Url, timeout: Duration) -> Self {
        let endpoint = base.join("extract").unwrap_or(base);
        Self {
            endpoint,
            client: ClientBuilder::new()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Ask the remote extractor for fields. `None` means "fall back to
    /// local extraction": the call failed, or the remote found nothing
    /// worth keeping.
    #[instrument(skip_all, fields(domain = %domain, text_len = text.len()))]
    pub async fn extract(
        &self,
        text: &str,
        domain: &str,
    ) -> Option<(PolicyFields, PolicyConfidence)> {
        match self.try_extract(text, domain).await {
            Ok(response) if response.fields.has_any_value() => {
                Some((response.fields, response.confidence))
            }
            Ok(_) => {
                debug!("remote extractor returned no non-empty field");
                None
            }
            Err(e) => {
                warn!("remote extractor unavailable, falling back locally: {e}");
                None
            }
        }
    }

    async fn try_extract(&self, text: &str, domain: &str) -> Result<ExtractResponse, RemoteError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ExtractRequest { text, domain })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status));
        }

        Ok(response.json::<ExtractResponse>().await?)
    }
}

/// Payload for `POST /snapshots`. This pipeline only produces it; dedup and
/// history semantics belong to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotPayload {
    pub store_domain: String,
    pub policy_url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<Url>,
    pub policy_type: String,
    pub summary: SnapshotSummary,
    pub raw_text_snippet: String,
    pub user_agent: String,
    pub extension_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub fields: PolicyFields,
    pub confidence: PolicyConfidence,
}

impl SnapshotPayload {
    pub fn from_summary(summary: &PolicySummary, config: &Config) -> Self {
        Self {
            store_domain: summary.domain.clone(),
            policy_url: summary.policy_url.clone(),
            page_url: summary.page_url.clone(),
            policy_type: "refund".to_string(),
            summary: SnapshotSummary {
                fields: summary.fields.clone(),
                confidence: summary.confidence.clone(),
            },
            raw_text_snippet: summary.raw_text_snippet.clone(),
            user_agent: config.user_agent().to_string(),
            extension_version: config.extension_version().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotReceipt {
    pub id: String,
    pub checksum: String,
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot already exists for this content")]
    Duplicate,

    #[error("snapshot rejected: {0}")]
    Validation(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Unexpected(StatusCode),
}

/// Client for `POST /snapshots`.
pub struct SnapshotClient {
    endpoint: Url,
    client: Client,
}

impl SnapshotClient {
    pub fn new(base: Url) -> Self {
        let endpoint = base.join("snapshots").unwrap_or(base);
        Self {
            endpoint,
            client: ClientBuilder::new()
                .timeout(REMOTE_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    #[instrument(skip_all, fields(domain = %payload.store_domain))]
    pub async fn save(&self, payload: &SnapshotPayload) -> Result<SnapshotReceipt, SnapshotError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| SnapshotError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::CREATED => response
                .json::<SnapshotReceipt>()
                .await
                .map_err(|e| SnapshotError::Transport(e.to_string())),
            StatusCode::CONFLICT => Err(SnapshotError::Duplicate),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                Err(SnapshotError::Validation(body))
            }
            status => Err(SnapshotError::Unexpected(status)),
        }
    }
}
