//! Configuration handling for the pipeline.
//!
//! Two layers live here. The tuned heuristic constants (quality gates,
//! confidence cut points, the normalizer cap) were calibrated against real
//! storefront policy pages and are kept as named constants so they can be
//! adjusted without hunting through the extractors. The runtime `Config`
//! carries everything that legitimately varies per deployment (endpoints,
//! identity strings, cache TTL) and loads from environment variables with
//! development defaults, so a host can also construct it explicitly.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use url::Url;

/// Quality score a page must reach to be accepted as "the" policy text when
/// the current page already claims to be a policy page.
pub const QUALITY_ACCEPT_SCORE: i32 = 6;

/// Quality score that authorizes early termination while probing candidates.
pub const QUALITY_EARLY_STOP_SCORE: i32 = 8;

/// Return-window score cut points for medium/high confidence.
pub const WINDOW_SCORE_MEDIUM: i32 = 3;
pub const WINDOW_SCORE_HIGH: i32 = 5;

/// Normalized text is capped at this many characters to bound all
/// downstream work (and the remote extractor request size).
pub const MAX_TEXT_LEN: usize = 8000;

/// Text under this length is immediately non-extractable.
pub const MIN_EXTRACTABLE_LEN: usize = 50;

/// Maximum length of the raw text snippet carried on a summary.
pub const SNIPPET_MAX_LEN: usize = 500;

/// Estimated storage bytes above which the cache sweeps expired entries
/// before writing.
pub const CACHE_PRUNE_BYTES: u64 = 512 * 1024;

/// Per-candidate direct fetch budget.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Remote extractor call budget.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Hidden-render lifecycle budget.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(15);

/// How long the render fallback waits for policy vocabulary to appear in
/// the rendered text before giving up on that page.
pub const MUTATION_WAIT: Duration = Duration::from_secs(5);

/// How long a caller should wait for a detection-driven run to settle.
pub const DETECTION_GUARD: Duration = Duration::from_secs(4);

/// Default cache TTL for extracted summaries.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const ENV_EXTRACTOR_URL: &str = "POLICYLENS_EXTRACTOR_URL";
pub const ENV_SNAPSHOT_URL: &str = "POLICYLENS_SNAPSHOT_URL";
pub const ENV_CACHE_TTL_SECS: &str = "POLICYLENS_CACHE_TTL_SECS";

const DEFAULT_USER_AGENT: &str = "PolicyLens/0.1 (+https://policylens.example.com)";
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    extractor_url: Option<Url>,
    snapshot_url: Option<Url>,
    cache_ttl: Duration,
    user_agent: String,
    extension_version: String,
}

impl Config {
    /// Create a new config explicitly.
    pub fn new(extractor_url: Option<Url>, snapshot_url: Option<Url>, cache_ttl: Duration) -> Self {
        Self {
            extractor_url,
            snapshot_url,
            cache_ttl,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            extension_version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Load from environment variables, falling back to development defaults.
    ///
    /// Endpoints are optional: with no extractor URL configured the pipeline
    /// runs local heuristic extraction only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let extractor_url = parse_env_url(ENV_EXTRACTOR_URL)?;
        let snapshot_url = parse_env_url(ENV_SNAPSHOT_URL)?;

        let cache_ttl = match env::var(ENV_CACHE_TTL_SECS) {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_CACHE_TTL_SECS,
                    reason: format!("'{raw}' is not a number of seconds"),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_CACHE_TTL,
        };

        Ok(Self::new(extractor_url, snapshot_url, cache_ttl))
    }

    /// Remote field-extractor base URL, if one is configured.
    pub fn extractor_url(&self) -> Option<&Url> {
        self.extractor_url.as_ref()
    }
    /// Snapshot persistence base URL, if one is configured.
    pub fn snapshot_url(&self) -> Option<&Url> {
        self.snapshot_url.as_ref()
    }
    /// TTL applied to cached summaries.
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }
    /// User agent reported on snapshot payloads.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
    /// Extension/client version reported on snapshot payloads.
    pub fn extension_version(&self) -> &str {
        &self.extension_version
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None, DEFAULT_CACHE_TTL)
    }
}

fn parse_env_url(key: &'static str) -> Result<Option<Url>, ConfigError> {
    match env::var(key) {
        Ok(raw) => {
            let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
                field: key,
                reason: e.to_string(),
            })?;
            Ok(Some(url))
        }
        Err(_) => Ok(None),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
