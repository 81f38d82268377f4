//! Host-provided capabilities.
//!
//! The pipeline never talks to browser storage or spawns hidden pages
//! directly; it goes through these narrow traits so the same orchestrator
//! runs against a real host, the bundled in-memory store, or test doubles.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("render backend: {0}")]
    Backend(String),

    #[error("render lifecycle timed out")]
    Timeout,
}

/// Namespaced key-value persistence with a byte-usage estimate. Used
/// exclusively by the cache layer.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys beginning with `prefix`.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Estimated bytes used across the namespace.
    async fn bytes_in_use(&self) -> Result<u64, StoreError>;
}

/// Invisible, isolated page rendering. Used exclusively by the render
/// fallback for JavaScript-hydrated policy pages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HiddenRenderer: Send + Sync {
    /// Render `url` in a hidden context, waiting up to `mutation_wait` for
    /// any of `vocabulary` to appear in the page text, within an overall
    /// `lifecycle` budget. Returns the rendered text, or `None` when the
    /// vocabulary never showed up. Implementations must dispose the hidden
    /// context regardless of outcome.
    async fn render(
        &self,
        url: Url,
        vocabulary: Vec<String>,
        mutation_wait: Duration,
        lifecycle: Duration,
    ) -> Result<Option<String>, RenderError>;
}

/// In-process [`KeyValueStore`] for the CLI and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn bytes_in_use(&self) -> Result<u64, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|e| (e.key().len() + e.value().len()) as u64)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("policy:a.com", "x".to_string()).await.unwrap();
        assert_eq!(
            store.get("policy:a.com").await.unwrap().as_deref(),
            Some("x")
        );
        store.remove("policy:a.com").await.unwrap();
        assert!(store.get("policy:a.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_filters_by_prefix() {
        let store = MemoryStore::new();
        store.set("policy:a.com", "1".to_string()).await.unwrap();
        store.set("other:b.com", "2".to_string()).await.unwrap();
        let keys = store.keys("policy:").await.unwrap();
        assert_eq!(keys, vec!["policy:a.com".to_string()]);
    }

    #[tokio::test]
    async fn bytes_estimate_tracks_contents() {
        let store = MemoryStore::new();
        assert_eq!(store.bytes_in_use().await.unwrap(), 0);
        store.set("k", "value".to_string()).await.unwrap();
        assert_eq!(store.bytes_in_use().await.unwrap(), 6);
    }
}
