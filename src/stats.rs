//! Quality report and facet overview.
//!
//! `hcat quality` prints the stored [`QualityReport`] written by the last
//! pipeline run; `hcat facets` prints the sorted value lists of the current
//! snapshot. Both give a quick read on whether the catalog is usable.

use anyhow::Result;
use hoist_catalog_core::quality::QualityReport;
use hoist_catalog_core::store::SnapshotStore;
use std::collections::BTreeMap;

use crate::cache::CatalogCache;
use crate::config::Config;
use crate::json_store::JsonFileStore;
use crate::pipeline::{print_counts, print_gates};

pub async fn run_quality(config: &Config) -> Result<()> {
    let store = JsonFileStore::from_config(&config.store);
    let Some(report) = store.load_report().await? else {
        println!("No quality report. Run `hcat pipeline` first.");
        return Ok(());
    };
    print_report(&report, &store);
    Ok(())
}

fn print_report(report: &QualityReport, store: &JsonFileStore) {
    println!("Hoist Catalog Quality Report");
    println!("============================");
    println!();
    println!("  Report:      {}", store.report_path().display());
    if let Some(ts) = report.generated_at {
        println!("  Generated:   {}", format_ts_relative(ts.timestamp()));
    }
    println!();

    let counts = hoist_catalog_core::quality::PipelineCounts {
        total: report.total_records,
        processed: report.processed,
        skipped: report.skipped,
        duplicates_merged: report.duplicates_merged,
        merge_conflicts: report.merge_conflicts,
    };
    print_counts(&counts, report.catalog_size);
    print_gates(&report.gates);

    println!();
    println!("  Missing fields:");
    for (field, n) in &report.missing_counts {
        let pct = report.missing_percentages.get(field).copied().unwrap_or(0.0);
        println!("    {:<16} {:>6} {:>6.1}%", field, n, pct);
    }
    println!(
        "    {:<16} {:>13.1}%",
        "source tracking", report.source_tracking_percentage
    );

    print_distribution("Quality tiers", &report.quality_tiers);
    print_distribution("Capacity", &report.capacity_buckets);
    print_distribution("Classification", &report.classifications);
    print_distribution("Manufacturers", &report.by_manufacturer);
    println!();
}

fn print_distribution(title: &str, counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!();
    println!("  {}:", title);
    let mut rows: Vec<_> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (label, n) in rows {
        println!("    {:<24} {:>6}", label, n);
    }
}

pub async fn run_facets(config: &Config, json: bool) -> Result<()> {
    let cache = CatalogCache::from_config(config);
    let snapshot = cache.snapshot().await;
    let facets = snapshot.facets();

    if json {
        println!("{}", serde_json::to_string_pretty(facets)?);
        return Ok(());
    }

    println!("records: {}", snapshot.len());
    print_list("manufacturers", facets.manufacturers.iter().map(String::as_str));
    print_list("classifications", facets.classifications.iter().map(String::as_str));
    print_list("categories", facets.categories.iter().map(String::as_str));
    print_list("speed types", facets.speed_types.iter().map(String::as_str));
    print_list("duty cycles", facets.duty_cycles.iter().map(String::as_str));
    print_list("quality tiers", facets.quality_tiers.iter().map(|t| t.as_str()));
    print_list("capacity buckets", facets.capacity_buckets.iter().copied());
    print_list("speed buckets", facets.speed_buckets.iter().copied());
    Ok(())
}

fn print_list<'a>(title: &str, items: impl Iterator<Item = &'a str>) {
    let items: Vec<&str> = items.collect();
    if items.is_empty() {
        println!("{}: (none)", title);
    } else {
        println!("{}: {}", title, items.join(", "));
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
