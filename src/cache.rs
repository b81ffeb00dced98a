//! Time-to-live catalog cache.
//!
//! Holds the published [`CatalogSnapshot`] behind an `Arc`. Readers clone
//! the `Arc` and query it without holding any lock, so a query always
//! finishes on the snapshot it started with.
//!
//! When the TTL has elapsed, the next reader takes the refresh guard,
//! reloads records and report from the [`SnapshotStore`], builds a new
//! snapshot completely and publishes it with a single pointer swap. Readers
//! arriving while a refresh runs wait on the guard and then see the new
//! snapshot. A failed reload is logged and the previous snapshot keeps
//! serving; before the first successful load that is the empty catalog.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use hoist_catalog_core::snapshot::CatalogSnapshot;
use hoist_catalog_core::store::SnapshotStore;
use tracing::{info, warn};

use crate::config::Config;
use crate::json_store::JsonFileStore;

pub struct CatalogCache {
    store: Arc<dyn SnapshotStore>,
    ttl: Duration,
    current: RwLock<Arc<CatalogSnapshot>>,
    last_checked: Mutex<Option<Instant>>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn SnapshotStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            last_checked: Mutex::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Cache over the configured JSON file store.
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(JsonFileStore::from_config(&config.store));
        Self::new(store, config.cache.ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The published snapshot without any freshness check.
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn is_fresh(&self) -> bool {
        let checked = *self.last_checked.lock().unwrap_or_else(|e| e.into_inner());
        matches!(checked, Some(t) if t.elapsed() < self.ttl)
    }

    fn mark_checked(&self) {
        *self.last_checked.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    fn publish(&self, snapshot: CatalogSnapshot) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(snapshot);
    }

    /// Current snapshot, reloading first when the TTL has elapsed.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        if self.is_fresh() {
            return self.current();
        }
        let _guard = self.refresh_guard.lock().await;
        // Another reader may have refreshed while we waited.
        if !self.is_fresh() {
            if let Err(e) = self.reload().await {
                warn!(error = %format!("{:#}", e), "catalog reload failed; serving previous snapshot");
            }
            self.mark_checked();
        }
        self.current()
    }

    /// Force a reload regardless of TTL. Returns the new record count; on
    /// failure the previous snapshot stays published.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.refresh_guard.lock().await;
        let result = self.reload().await;
        self.mark_checked();
        if let Err(e) = &result {
            warn!(error = %format!("{:#}", e), "forced catalog reload failed");
        }
        result
    }

    async fn reload(&self) -> Result<usize> {
        let started = Instant::now();
        let records = self.store.load_snapshot().await?;
        let report = match self.store.load_report().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "quality report unreadable; rebuilding from records");
                None
            }
        };
        let snapshot = CatalogSnapshot::build(records, report, Utc::now());
        let count = snapshot.len();
        self.publish(snapshot);
        info!(
            records = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "catalog snapshot published"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_catalog_core::models::CanonicalRecord;
    use hoist_catalog_core::store::memory::InMemorySnapshotStore;

    fn record(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.into(),
            manufacturer: "GIS AG".into(),
            model: id.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_read_loads() {
        let store = Arc::new(InMemorySnapshotStore::with_records(vec![record("a")]));
        let cache = CatalogCache::new(store, Duration::from_secs(300));
        assert!(cache.current().is_empty());
        assert_eq!(cache.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_serves_cached_within_ttl() {
        let store = Arc::new(InMemorySnapshotStore::with_records(vec![record("a")]));
        let cache = CatalogCache::new(store.clone(), Duration::from_secs(300));
        let first = cache.snapshot().await;

        store.save_snapshot(&[record("a"), record("b")]).await.unwrap();
        let second = cache.snapshot().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);

        assert_eq!(cache.refresh().await.unwrap(), 2);
        assert_eq!(cache.snapshot().await.len(), 2);
        // The old handle still sees its own records.
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reloads() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let cache = CatalogCache::new(store.clone(), Duration::ZERO);
        assert!(cache.snapshot().await.is_empty());
        store.save_snapshot(&[record("a")]).await.unwrap();
        assert_eq!(cache.snapshot().await.len(), 1);
    }
}
