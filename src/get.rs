//! Record retrieval by id.
//!
//! Used by the `hcat get` CLI command; the HTTP server resolves ids through
//! the shared cache directly.

use anyhow::{bail, Result};
use hoist_catalog_core::models::CanonicalRecord;

use crate::cache::CatalogCache;
use crate::config::Config;

pub async fn get_record(config: &Config, id: &str) -> Result<CanonicalRecord> {
    let cache = CatalogCache::from_config(config);
    let snapshot = cache.snapshot().await;
    match snapshot.get(id) {
        Some(record) => Ok(record.clone()),
        None => bail!("record not found: {}", id),
    }
}

/// CLI entry point: print the record as pretty JSON.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let record = get_record(config, id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
