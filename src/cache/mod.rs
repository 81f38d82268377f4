//! Per-domain TTL cache for extracted policy summaries.
//!
//! Entries are whole-value replaced under a `policy:<domain>` key, so
//! last-write-wins is safe without read-modify-write coordination. Expiry is
//! lazy: an expired entry is deleted when read, and a global sweep of
//! expired entries runs before a write once estimated storage crosses the
//! prune threshold. This bounds growth from many distinct domains without
//! maintaining LRU bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::CACHE_PRUNE_BYTES;
use crate::extractor::model::PolicySummary;
use crate::host::{KeyValueStore, StoreError};

const KEY_PREFIX: &str = "policy:";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cache entry corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    summary: PolicySummary,
    cached_at: DateTime<Utc>,
    ttl_secs: u64,
}

impl CacheEntry {
    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        let deadline = self.cached_at + chrono::Duration::seconds(self.ttl_secs as i64);
        now > deadline
    }
}

/// Diagnostics snapshot; not consulted by the pipeline itself.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub oldest_age_secs: Option<u64>,
}

pub struct PolicyCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    prune_bytes: u64,
}

impl PolicyCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            prune_bytes: CACHE_PRUNE_BYTES,
        }
    }

    /// Cached summary for a domain, unless expired. Expired and unreadable
    /// entries are removed on the way out.
    #[instrument(skip(self))]
    pub async fn get(&self, domain: &str) -> Result<Option<PolicySummary>, CacheError> {
        let key = cache_key(domain);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("removing corrupt cache entry for {domain}: {e}");
                self.store.remove(&key).await?;
                return Ok(None);
            }
        };

        if entry.expired_at(Utc::now()) {
            debug!("cache entry for {domain} expired, removing");
            self.store.remove(&key).await?;
            return Ok(None);
        }

        Ok(Some(entry.summary))
    }

    /// Store a summary under its domain with the default TTL.
    pub async fn put(&self, summary: &PolicySummary) -> Result<(), CacheError> {
        self.put_with_ttl(summary, self.ttl).await
    }

    #[instrument(skip(self, summary), fields(domain = %summary.domain))]
    pub async fn put_with_ttl(
        &self,
        summary: &PolicySummary,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if self.store.bytes_in_use().await? > self.prune_bytes {
            self.sweep_expired().await?;
        }

        let entry = CacheEntry {
            summary: summary.clone(),
            cached_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        };
        let key = cache_key(&summary.domain);
        self.store.set(&key, serde_json::to_string(&entry)?).await?;
        Ok(())
    }

    /// Remove every expired entry in the namespace.
    pub async fn sweep_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let mut removed = 0;
        for key in self.store.keys(KEY_PREFIX).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let drop = match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => entry.expired_at(now),
                Err(_) => true,
            };
            if drop {
                self.store.remove(&key).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("cache sweep removed {removed} entries");
        }
        Ok(removed)
    }

    /// Entry count, byte estimate and oldest entry age, for diagnostics.
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let now = Utc::now();
        let mut entries = 0;
        let mut oldest: Option<u64> = None;

        for key in self.store.keys(KEY_PREFIX).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<CacheEntry>(&raw) else {
                continue;
            };
            entries += 1;
            let age = (now - entry.cached_at).num_seconds().max(0) as u64;
            oldest = Some(oldest.map_or(age, |o| o.max(age)));
        }

        Ok(CacheStats {
            entries,
            bytes: self.store.bytes_in_use().await?,
            oldest_age_secs: oldest,
        })
    }
}

fn cache_key(domain: &str) -> String {
    format!("{KEY_PREFIX}{domain}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::model::{PolicyConfidence, PolicyFields};
    use crate::host::MemoryStore;
    use url::Url;

    fn summary(domain: &str) -> PolicySummary {
        PolicySummary::new(
            domain,
            Url::parse(&format!("https://{domain}/policies/refund-policy")).unwrap(),
            None,
            PolicyFields {
                return_window: Some("30 days".to_string()),
                ..Default::default()
            },
            PolicyConfidence::default(),
            "returns are accepted within 30 days",
        )
    }

    fn cache() -> PolicyCache {
        PolicyCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn write_then_read_returns_same_summary() {
        let cache = cache();
        let s = summary("a.example.com");
        cache.put(&s).await.unwrap();
        let read = cache.get("a.example.com").await.unwrap().unwrap();
        assert_eq!(read, s);
    }

    #[tokio::test]
    async fn expired_entry_is_removed_on_read() {
        let cache = cache();
        let s = summary("b.example.com");
        cache.put_with_ttl(&s, Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.get("b.example.com").await.unwrap().is_none());
        // Entry was deleted, not merely hidden.
        assert_eq!(cache.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn corrupt_entry_is_removed_on_read() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("policy:c.example.com", "not json".to_string())
            .await
            .unwrap();
        let cache = PolicyCache::new(store, Duration::from_secs(60));
        assert!(cache.get("c.example.com").await.unwrap().is_none());
        assert_eq!(cache.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let cache = cache();
        cache
            .put_with_ttl(&summary("old.example.com"), Duration::ZERO)
            .await
            .unwrap();
        cache.put(&summary("fresh.example.com")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let removed = cache.sweep_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get("fresh.example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stats_reports_counts_and_bytes() {
        let cache = cache();
        cache.put(&summary("a.example.com")).await.unwrap();
        cache.put(&summary("b.example.com")).await.unwrap();
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.bytes > 0);
        assert!(stats.oldest_age_secs.is_some());
    }
}
