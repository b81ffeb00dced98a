//! JSON HTTP API over the catalog cache.
//!
//! Every handler reads from the shared [`CatalogCache`], so requests are
//! served from the in-memory snapshot and the store is touched at most
//! once per TTL.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/catalog` | Filtered, sorted, paginated records |
//! | `GET`  | `/catalog/facets` | Sorted value lists for filter UIs |
//! | `GET`  | `/catalog/{id}` | One record |
//! | `GET`  | `/quality` | Quality report of the served snapshot |
//! | `POST` | `/catalog/refresh` | Reload the snapshot now |
//!
//! `GET /catalog` takes the query string parameters `q`, `manufacturer`,
//! `classification`, `category`, `speedType`, `dutyCycle`, `tier`,
//! `capacity`, `speed`, `hasImages`, `completeSpecs`, `sort`, `order`,
//! `page` and `limit`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "record not found: abc" } }
//! ```
//!
//! Error codes: `not_found` (404), `reload_failed` (503).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front ends
//! can query the catalog directly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hoist_catalog_core::index::Facets;
use hoist_catalog_core::models::CanonicalRecord;
use hoist_catalog_core::quality::QualityReport;
use hoist_catalog_core::query::{CatalogQuery, QueryLimits, QueryParams, QueryResult};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::cache::CatalogCache;
use crate::config::Config;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CatalogCache>,
    pub limits: QueryLimits,
}

impl AppState {
    pub fn new(cache: Arc<CatalogCache>, limits: QueryLimits) -> Self {
        Self { cache, limits }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/catalog", get(handle_catalog))
        .route("/catalog/facets", get(handle_facets))
        .route("/catalog/refresh", post(handle_refresh))
        .route("/catalog/{id}", get(handle_get))
        .route("/quality", get(handle_quality))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let cache = Arc::new(CatalogCache::from_config(config));

    // Warm the cache so the first request does not pay for the load.
    let snapshot = cache.snapshot().await;
    info!(records = snapshot.len(), ttl_secs = cache.ttl().as_secs(), "catalog loaded");

    let app = build_router(AppState::new(cache, config.query.limits()));

    println!("Catalog server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn reload_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "reload_failed".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /catalog ============

async fn handle_catalog(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Json<QueryResult> {
    let snapshot = state.cache.snapshot().await;
    let query = CatalogQuery::from_params(&params, &state.limits);
    Json(snapshot.query(&query))
}

// ============ GET /catalog/facets ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FacetsResponse {
    total_records: usize,
    #[serde(flatten)]
    facets: Facets,
}

async fn handle_facets(State(state): State<AppState>) -> Json<FacetsResponse> {
    let snapshot = state.cache.snapshot().await;
    Json(FacetsResponse {
        total_records: snapshot.len(),
        facets: snapshot.facets().clone(),
    })
}

// ============ GET /catalog/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CanonicalRecord>, AppError> {
    let snapshot = state.cache.snapshot().await;
    snapshot
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(format!("record not found: {}", id)))
}

// ============ GET /quality ============

async fn handle_quality(State(state): State<AppState>) -> Json<QualityReport> {
    let snapshot = state.cache.snapshot().await;
    Json(snapshot.report.clone())
}

// ============ POST /catalog/refresh ============

#[derive(Serialize)]
struct RefreshResponse {
    status: String,
    records: usize,
}

async fn handle_refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let records = state
        .cache
        .refresh()
        .await
        .map_err(|e| reload_failed(format!("{:#}", e)))?;
    Ok(Json(RefreshResponse {
        status: "ok".to_string(),
        records,
    }))
}
