//! Normalization pipeline orchestration.
//!
//! Coordinates one batch run: raw source → normalize → dedupe → quality
//! gates → snapshot store. A run is idempotent: the same raw input always
//! produces the same snapshot apart from `processedAt`.
//!
//! Gate failures never abort the run; they are printed and logged. Hard
//! errors are an unreadable source, an empty source and a failed write.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use hoist_catalog_core::dedupe::{self, MergeConflict};
use hoist_catalog_core::models::CanonicalRecord;
use hoist_catalog_core::normalize;
use hoist_catalog_core::quality::{self, GateEvaluation, GateThresholds, PipelineCounts, QualityReport};
use hoist_catalog_core::store::SnapshotStore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connector_fs::FsRecordSource;
use crate::json_store::JsonFileStore;
use crate::traits::RecordSource;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Build everything but write nothing.
    pub dry_run: bool,
    /// Only process the first `n` raw records.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub records: Vec<CanonicalRecord>,
    pub counts: PipelineCounts,
    pub conflicts: Vec<MergeConflict>,
    pub report: QualityReport,
}

/// Scan, normalize, dedupe and report. Pure apart from the source scan.
pub async fn build_catalog(
    source: &dyn RecordSource,
    limit: Option<usize>,
    now: DateTime<Utc>,
) -> Result<PipelineOutcome> {
    let mut raws = source.scan().await?;
    if raws.is_empty() {
        bail!("source '{}' produced no raw records", source.name());
    }
    if let Some(lim) = limit {
        raws.truncate(lim);
    }
    info!(
        source = source.name(),
        description = source.description(),
        raw = raws.len(),
        "scanned raw records"
    );

    let normalized = normalize::normalize_batch(&raws, now);
    if normalized.skipped > 0 {
        debug!(skipped = normalized.skipped, "records without manufacturer or model");
    }
    let processed = normalized.records.len();

    let deduped = dedupe::deduplicate(normalized.records);
    for c in &deduped.conflicts {
        debug!(key = %c.key, field = %c.field, kept = %c.kept, discarded = %c.discarded, "merge conflict");
    }

    let counts = PipelineCounts {
        total: raws.len(),
        processed,
        skipped: normalized.skipped,
        duplicates_merged: deduped.merged_count,
        merge_conflicts: deduped.conflicts.len(),
    };
    let report = quality::build_report(&deduped.records, counts, &GateThresholds::default(), now);

    Ok(PipelineOutcome {
        records: deduped.records,
        counts,
        conflicts: deduped.conflicts,
        report,
    })
}

/// Run the full pipeline and persist the result unless `dry_run` is set.
pub async fn run_pipeline(
    source: &dyn RecordSource,
    store: &dyn SnapshotStore,
    options: &PipelineOptions,
) -> Result<PipelineOutcome> {
    let outcome = build_catalog(source, options.limit, Utc::now()).await?;
    if !options.dry_run {
        store.save_snapshot(&outcome.records).await?;
        store.save_report(&outcome.report).await?;
        info!(records = outcome.records.len(), "snapshot written");
    }
    if !outcome.report.gates.passed {
        warn!("quality gates failed; snapshot written anyway");
    }
    Ok(outcome)
}

/// `hcat pipeline`: filesystem source into the configured JSON store.
pub async fn run_pipeline_cmd(config: &Config, options: &PipelineOptions) -> Result<()> {
    let raw_config = config
        .sources
        .raw
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Raw record source not configured ([sources.raw])"))?;
    let source = FsRecordSource::new(raw_config);
    let store = JsonFileStore::from_config(&config.store);

    let outcome = run_pipeline(&source, &store, options).await?;

    if options.dry_run {
        println!("pipeline {} (dry-run)", source.name());
    } else {
        println!("pipeline {}", source.name());
    }
    print_counts(&outcome.counts, outcome.records.len());
    print_gates(&outcome.report.gates);
    if !options.dry_run {
        println!("  snapshot: {}", store.snapshot_path().display());
        println!("  report: {}", store.report_path().display());
    }
    println!("ok");
    Ok(())
}

pub fn print_counts(counts: &PipelineCounts, catalog_size: usize) {
    println!("  raw records: {}", counts.total);
    println!("  normalized: {}", counts.processed);
    println!("  skipped: {}", counts.skipped);
    println!("  duplicates merged: {}", counts.duplicates_merged);
    println!("  merge conflicts: {}", counts.merge_conflicts);
    println!("  catalog records: {}", catalog_size);
}

pub fn print_gates(gates: &GateEvaluation) {
    println!(
        "  quality gates: {}",
        if gates.passed { "PASS" } else { "FAIL" }
    );
    for g in &gates.gates {
        let op = match g.kind {
            quality::GateKind::Min => ">=",
            quality::GateKind::Max => "<=",
        };
        println!(
            "    {:<24} {:>7.1} {} {:<7.1} {}",
            g.name,
            g.value,
            op,
            g.threshold,
            if g.passed { "ok" } else { "FAIL" }
        );
    }
}
