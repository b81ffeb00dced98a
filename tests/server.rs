use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hoist_catalog::cache::CatalogCache;
use hoist_catalog::server::{build_router, AppState};
use hoist_catalog_core::models::CanonicalRecord;
use hoist_catalog_core::quality::QualityReport;
use hoist_catalog_core::query::QueryLimits;
use hoist_catalog_core::store::memory::InMemorySnapshotStore;
use hoist_catalog_core::store::SnapshotStore;
use serde_json::Value;
use tower::ServiceExt;

fn record(i: usize) -> CanonicalRecord {
    CanonicalRecord {
        id: format!("r{:02}", i),
        manufacturer: "GIS AG".into(),
        model: format!("LPM {}", i),
        capacity_kg: Some(100.0 * i as f64),
        ..Default::default()
    }
}

fn records(n: usize) -> Vec<CanonicalRecord> {
    (1..=n).map(record).collect()
}

fn router_with(store: Arc<dyn SnapshotStore>) -> Router {
    let cache = Arc::new(CatalogCache::new(store, Duration::from_secs(300)));
    build_router(AppState::new(cache, QueryLimits::default()))
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Store whose loads can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: InMemorySnapshotStore,
    failing: AtomicBool,
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn load_snapshot(&self) -> Result<Vec<CanonicalRecord>> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("snapshot file unreadable");
        }
        self.inner.load_snapshot().await
    }

    async fn save_snapshot(&self, records: &[CanonicalRecord]) -> Result<()> {
        self.inner.save_snapshot(records).await
    }

    async fn save_report(&self, report: &QualityReport) -> Result<()> {
        self.inner.save_report(report).await
    }

    async fn load_report(&self) -> Result<Option<QualityReport>> {
        self.inner.load_report().await
    }
}

#[tokio::test]
async fn test_health() {
    let app = router_with(Arc::new(InMemorySnapshotStore::new()));
    let (status, body) = send(app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_catalog_paging() {
    let app = router_with(Arc::new(InMemorySnapshotStore::with_records(records(12))));
    let (status, body) = send(app, "GET", "/catalog?page=2&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 12);
    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["r06", "r07", "r08", "r09", "r10"]);
    assert_eq!(body["appliedFilters"]["page"], 2);
    assert_eq!(body["appliedFilters"]["limit"], 5);
}

#[tokio::test]
async fn test_catalog_invalid_params_fall_back() {
    let app = router_with(Arc::new(InMemorySnapshotStore::with_records(records(3))));
    let (status, body) = send(
        app,
        "GET",
        "/catalog?page=abc&limit=-3&sort=colour&order=sideways&tier=gold",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["appliedFilters"]["page"], 1);
    assert_eq!(body["appliedFilters"]["limit"], 50);
    assert_eq!(body["appliedFilters"]["sort"], "manufacturer");
    assert_eq!(body["appliedFilters"]["order"], "asc");
    assert!(body["appliedFilters"].get("tier").is_none());
}

#[tokio::test]
async fn test_catalog_sort_by_capacity_desc() {
    let app = router_with(Arc::new(InMemorySnapshotStore::with_records(records(4))));
    let (_, body) = send(app, "GET", "/catalog?sort=capacity&order=desc&limit=2").await;
    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["r04", "r03"]);
}

#[tokio::test]
async fn test_facets() {
    let app = router_with(Arc::new(InMemorySnapshotStore::with_records(records(3))));
    let (status, body) = send(app, "GET", "/catalog/facets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalRecords"], 3);
    assert_eq!(body["manufacturers"], serde_json::json!(["GIS AG"]));
}

#[tokio::test]
async fn test_get_record_and_not_found() {
    let app = router_with(Arc::new(InMemorySnapshotStore::with_records(records(3))));

    let (status, body) = send(app.clone(), "GET", "/catalog/r02").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "LPM 2");

    let (status, body) = send(app, "GET", "/catalog/r99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "record not found: r99");
}

#[tokio::test]
async fn test_quality_rebuilt_without_stored_report() {
    let app = router_with(Arc::new(InMemorySnapshotStore::with_records(records(3))));
    let (status, body) = send(app, "GET", "/quality").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["catalogSize"], 3);
    assert_eq!(body["gates"]["passed"], false);
}

#[tokio::test]
async fn test_refresh_picks_up_new_snapshot() {
    let store = Arc::new(InMemorySnapshotStore::with_records(records(2)));
    let app = router_with(store.clone());

    let (_, body) = send(app.clone(), "GET", "/catalog").await;
    assert_eq!(body["totalCount"], 2);

    store.save_snapshot(&records(5)).await.unwrap();
    let (_, body) = send(app.clone(), "GET", "/catalog").await;
    assert_eq!(body["totalCount"], 2, "served from cache within the TTL");

    let (status, body) = send(app.clone(), "POST", "/catalog/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["records"], 5);

    let (_, body) = send(app, "GET", "/catalog").await;
    assert_eq!(body["totalCount"], 5);
}

#[tokio::test]
async fn test_refresh_failure_keeps_serving() {
    let store = Arc::new(FlakyStore::default());
    store.inner.save_snapshot(&records(3)).await.unwrap();
    let app = router_with(store.clone());

    let (_, body) = send(app.clone(), "GET", "/catalog").await;
    assert_eq!(body["totalCount"], 3);

    store.failing.store(true, Ordering::SeqCst);
    let (status, body) = send(app.clone(), "POST", "/catalog/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "reload_failed");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("snapshot file unreadable"));

    let (status, body) = send(app, "GET", "/catalog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 3);
}
