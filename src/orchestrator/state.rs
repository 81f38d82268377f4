//! Per-context state, owned exclusively by the orchestrator.
//!
//! Context state is a derived, recomputable cache of the last pipeline run,
//! not a source of truth: a process restart drops it, and the documented
//! recovery path is simply re-running detection. Each slot carries a
//! version counter and a cancellation token; a newer notification bumps the
//! version and cancels the in-flight run, and a stale run's commit is
//! rejected by compare-and-swap on the version. Latest write wins without
//! locks.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::extractor::model::PolicySummary;

/// Storefront detection input, consumed verbatim from the external
/// detector and never recomputed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub is_shopify: bool,
    pub confidence: u8,
    pub domain: String,
    pub indicators: DetectionIndicators,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionIndicators {
    pub cdn_assets: bool,
    pub platform_meta: bool,
    pub cart_endpoint: bool,
    pub checkout_route: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Detecting,
    Fetching,
    Extracting,
    Done,
    Error,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error)
    }
}

/// State of one browsing context's pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ContextState {
    pub detection: Option<DetectionResult>,
    pub summary: Option<PolicySummary>,
    pub status: Status,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ContextState {
    pub fn idle() -> Self {
        Self {
            detection: None,
            summary: None,
            status: Status::Idle,
            from_cache: false,
            error_message: None,
        }
    }
}

struct Slot {
    version: u64,
    state: ContextState,
    token: CancellationToken,
}

/// Versioned context map with last-write-wins commits.
#[derive(Default)]
pub struct ContextStore {
    slots: DashMap<String, Slot>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run for a context: supersedes (cancels) any in-flight
    /// run and returns the version the new run must present at commit time.
    pub fn begin(&self, ctx_id: &str, state: ContextState) -> (u64, CancellationToken) {
        let mut slot = self.slots.entry(ctx_id.to_string()).or_insert_with(|| Slot {
            version: 0,
            state: ContextState::idle(),
            token: CancellationToken::new(),
        });
        slot.token.cancel();
        slot.version += 1;
        slot.state = state;
        slot.token = CancellationToken::new();
        (slot.version, slot.token.clone())
    }

    /// Intermediate status update; ignored when the run is stale.
    pub fn set_status(&self, ctx_id: &str, version: u64, status: Status) -> bool {
        match self.slots.get_mut(ctx_id) {
            Some(mut slot) if slot.version == version => {
                slot.state.status = status;
                true
            }
            _ => false,
        }
    }

    /// Final commit for a run. Returns false (and changes nothing) when a
    /// newer run has begun since this one.
    pub fn commit(&self, ctx_id: &str, version: u64, state: ContextState) -> bool {
        match self.slots.get_mut(ctx_id) {
            Some(mut slot) if slot.version == version => {
                slot.state = state;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, ctx_id: &str) -> Option<ContextState> {
        self.slots.get(ctx_id).map(|slot| slot.state.clone())
    }

    /// Reset a context to idle (e.g. the page turned out not to be a
    /// storefront), cancelling any in-flight run.
    pub fn clear(&self, ctx_id: &str) {
        if let Some(mut slot) = self.slots.get_mut(ctx_id) {
            slot.token.cancel();
            slot.version += 1;
            slot.state = ContextState::idle();
        }
    }

    /// Drop a context entirely (tab closed).
    pub fn drop_context(&self, ctx_id: &str) {
        if let Some((_, slot)) = self.slots.remove(ctx_id) {
            slot.token.cancel();
        }
    }
}
