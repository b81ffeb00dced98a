//! Catalog search from the command line.
//!
//! Builds [`QueryParams`] from CLI flags, runs them through the cache and
//! prints either a compact listing or the raw [`QueryResult`] JSON.

use anyhow::Result;
use hoist_catalog_core::models::CanonicalRecord;
use hoist_catalog_core::query::{CatalogQuery, QueryParams, QueryResult};

use crate::cache::CatalogCache;
use crate::config::Config;

/// Run a query against the configured catalog.
pub async fn search_catalog(config: &Config, params: &QueryParams) -> Result<QueryResult> {
    let cache = CatalogCache::from_config(config);
    let snapshot = cache.snapshot().await;
    let query = CatalogQuery::from_params(params, &config.query.limits());
    Ok(snapshot.query(&query))
}

pub async fn run_search(config: &Config, params: &QueryParams, json: bool) -> Result<()> {
    let result = search_catalog(config, params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let applied = &result.applied_filters;
    let first = (applied.page - 1) * applied.limit;
    for (i, record) in result.results.iter().enumerate() {
        print_record_line(first + i + 1, record);
    }
    println!(
        "page {} · {} of {} results",
        applied.page,
        result.results.len(),
        result.total_count
    );
    Ok(())
}

fn print_record_line(n: usize, record: &CanonicalRecord) {
    println!(
        "{}. {} {} [{} {}%]",
        n,
        record.manufacturer,
        record.model,
        record.data_quality_tier,
        record.data_completeness
    );
    if let Some(capacity) = &record.load_capacity {
        println!("    capacity: {}", capacity);
    }
    if let Some(speed) = &record.lifting_speed {
        println!("    speed: {}", speed);
    }
    if !record.classification.is_empty() {
        println!("    classification: {}", record.joined_classification());
    }
    println!("    id: {}", record.id);
    println!();
}
