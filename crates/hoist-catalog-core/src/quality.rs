//! Aggregate quality report and threshold gates.
//!
//! | Gate | Metric | Threshold |
//! |------|--------|-----------|
//! | `min_records` | record count | ≥ 10 |
//! | `missing_capacity` | % without loadCapacity | ≤ 80 |
//! | `missing_speed` | % without liftingSpeed | ≤ 85 |
//! | `missing_power` | % without motorPower | ≤ 95 |
//! | `missing_classification` | % without classification | ≤ 50 |
//! | `source_tracking` | % with a known source | ≥ 90 |
//!
//! Gates never abort anything; a failing evaluation is reported and logged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::completeness::{self, CRITICAL_FIELDS};
use crate::index::CapacityBucket;
use crate::models::{CanonicalRecord, QualityTier, Source};

/// Label used for records whose capacity did not parse.
pub const UNKNOWN_BUCKET: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    /// Metric must be at least the threshold.
    Min,
    /// Metric must be at most the threshold.
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub name: String,
    pub kind: GateKind,
    pub value: f64,
    pub threshold: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluation {
    pub passed: bool,
    pub gates: Vec<GateResult>,
}

impl GateEvaluation {
    pub fn failed(&self) -> impl Iterator<Item = &GateResult> {
        self.gates.iter().filter(|g| !g.passed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    pub min_records: usize,
    pub max_missing_capacity: f64,
    pub max_missing_speed: f64,
    pub max_missing_power: f64,
    pub max_missing_classification: f64,
    pub min_source_tracking: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_records: 10,
            max_missing_capacity: 80.0,
            max_missing_speed: 85.0,
            max_missing_power: 95.0,
            max_missing_classification: 50.0,
            min_source_tracking: 90.0,
        }
    }
}

/// Counters collected by the pipeline before the report is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCounts {
    /// Raw records read.
    pub total: usize,
    /// Records that survived normalization.
    pub processed: usize,
    pub skipped: usize,
    pub duplicates_merged: usize,
    pub merge_conflicts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityReport {
    pub total_records: usize,
    pub processed: usize,
    pub skipped: usize,
    pub duplicates_merged: usize,
    pub merge_conflicts: usize,
    /// Records in the final catalog.
    pub catalog_size: usize,
    pub by_manufacturer: BTreeMap<String, usize>,
    pub capacity_buckets: BTreeMap<String, usize>,
    pub classifications: BTreeMap<String, usize>,
    pub quality_tiers: BTreeMap<String, usize>,
    pub missing_counts: BTreeMap<String, usize>,
    pub missing_percentages: BTreeMap<String, f64>,
    pub source_tracking_percentage: f64,
    pub gates: GateEvaluation,
    pub generated_at: Option<DateTime<Utc>>,
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

fn min_gate(name: &str, value: f64, threshold: f64) -> GateResult {
    GateResult {
        name: name.to_string(),
        kind: GateKind::Min,
        value,
        threshold,
        passed: value >= threshold,
    }
}

fn max_gate(name: &str, value: f64, threshold: f64) -> GateResult {
    GateResult {
        name: name.to_string(),
        kind: GateKind::Max,
        value,
        threshold,
        passed: value <= threshold,
    }
}

/// Evaluate the gates for a catalog of `count` records with the given
/// missing percentages.
pub fn evaluate_gates(
    count: usize,
    missing_percentages: &BTreeMap<String, f64>,
    source_tracking: f64,
    thresholds: &GateThresholds,
) -> GateEvaluation {
    let missing = |field: &str| missing_percentages.get(field).copied().unwrap_or(0.0);
    let gates = vec![
        min_gate("min_records", count as f64, thresholds.min_records as f64),
        max_gate(
            "missing_capacity",
            missing("loadCapacity"),
            thresholds.max_missing_capacity,
        ),
        max_gate("missing_speed", missing("liftingSpeed"), thresholds.max_missing_speed),
        max_gate("missing_power", missing("motorPower"), thresholds.max_missing_power),
        max_gate(
            "missing_classification",
            missing("classification"),
            thresholds.max_missing_classification,
        ),
        min_gate(
            "source_tracking",
            source_tracking,
            thresholds.min_source_tracking,
        ),
    ];
    GateEvaluation {
        passed: gates.iter().all(|g| g.passed),
        gates,
    }
}

/// Build the report for the final catalog.
pub fn build_report(
    records: &[CanonicalRecord],
    counts: PipelineCounts,
    thresholds: &GateThresholds,
    generated_at: DateTime<Utc>,
) -> QualityReport {
    let total = records.len();
    let mut by_manufacturer = BTreeMap::new();
    let mut capacity_buckets = BTreeMap::new();
    let mut classifications = BTreeMap::new();
    let mut quality_tiers: BTreeMap<String, usize> = QualityTier::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    let mut missing_counts: BTreeMap<String, usize> = CRITICAL_FIELDS
        .iter()
        .chain(std::iter::once(&"source"))
        .map(|f| (f.to_string(), 0))
        .collect();

    for record in records {
        *by_manufacturer
            .entry(record.manufacturer.clone())
            .or_insert(0) += 1;

        let bucket = CapacityBucket::from_kg(record.capacity_kg)
            .map(|b| b.label())
            .unwrap_or(UNKNOWN_BUCKET);
        *capacity_buckets.entry(bucket.to_string()).or_insert(0) += 1;

        for tag in &record.classification {
            *classifications.entry(tag.clone()).or_insert(0) += 1;
        }
        *quality_tiers
            .entry(record.data_quality_tier.as_str().to_string())
            .or_insert(0) += 1;

        for field in CRITICAL_FIELDS {
            if !completeness::is_field_valid(record, field) {
                *missing_counts.entry(field.to_string()).or_insert(0) += 1;
            }
        }
        if record.source == Source::Unknown {
            *missing_counts.entry("source".to_string()).or_insert(0) += 1;
        }
    }

    let missing_percentages: BTreeMap<String, f64> = missing_counts
        .iter()
        .map(|(field, n)| (field.clone(), percentage(*n, total)))
        .collect();
    let source_tracking = if total == 0 {
        0.0
    } else {
        percentage(total - missing_counts.get("source").copied().unwrap_or(0), total)
    };

    let gates = evaluate_gates(total, &missing_percentages, source_tracking, thresholds);
    for gate in gates.failed() {
        warn!(
            gate = %gate.name,
            value = gate.value,
            threshold = gate.threshold,
            "quality gate failed"
        );
    }

    QualityReport {
        total_records: counts.total,
        processed: counts.processed,
        skipped: counts.skipped,
        duplicates_merged: counts.duplicates_merged,
        merge_conflicts: counts.merge_conflicts,
        catalog_size: total,
        by_manufacturer,
        capacity_buckets,
        classifications,
        quality_tiers,
        missing_counts,
        missing_percentages,
        source_tracking_percentage: source_tracking,
        gates,
        generated_at: Some(generated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> CanonicalRecord {
        let mut r = CanonicalRecord {
            id: format!("r{}", i),
            manufacturer: if i % 2 == 0 { "GIS AG" } else { "Verlinde" }.into(),
            model: format!("M{}", i),
            load_capacity: Some("500 kg (1102 lbs)".into()),
            capacity_kg: Some(500.0),
            lifting_speed: Some("4 m/min (13.1 ft/min)".into()),
            motor_power: Some("0.5 kW (0.67 HP)".into()),
            source: Source::Scraped,
            ..Default::default()
        };
        r.classification.insert("d8".into());
        completeness::apply(&mut r);
        r
    }

    fn report(records: &[CanonicalRecord]) -> QualityReport {
        build_report(
            records,
            PipelineCounts::default(),
            &GateThresholds::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_all_gates_pass() {
        let records: Vec<_> = (0..10).map(record).collect();
        let r = report(&records);
        assert!(r.gates.passed, "{:?}", r.gates);
        assert_eq!(r.catalog_size, 10);
        assert_eq!(r.by_manufacturer["GIS AG"], 5);
        assert_eq!(r.capacity_buckets["251-500 kg"], 10);
        assert_eq!(r.classifications["d8"], 10);
        assert_eq!(r.missing_counts["dutyCycle"], 10);
        assert_eq!(r.source_tracking_percentage, 100.0);
    }

    #[test]
    fn test_min_records_gate() {
        let records: Vec<_> = (0..9).map(record).collect();
        let r = report(&records);
        assert!(!r.gates.passed);
        let failed: Vec<_> = r.gates.failed().map(|g| g.name.as_str()).collect();
        assert_eq!(failed, vec!["min_records"]);
    }

    #[test]
    fn test_missing_classification_gate() {
        let mut records: Vec<_> = (0..10).map(record).collect();
        for r in records.iter_mut().take(6) {
            r.classification.clear();
        }
        let r = report(&records);
        assert_eq!(r.missing_percentages["classification"], 60.0);
        assert!(!r.gates.passed);
        assert!(r.gates.failed().any(|g| g.name == "missing_classification"));
    }

    #[test]
    fn test_unknown_source_counts_as_missing() {
        let mut records: Vec<_> = (0..10).map(record).collect();
        records[0].source = Source::Unknown;
        records[1].source = Source::Unknown;
        let r = report(&records);
        assert_eq!(r.missing_counts["source"], 2);
        assert_eq!(r.source_tracking_percentage, 80.0);
        assert!(r.gates.failed().any(|g| g.name == "source_tracking"));
    }

    #[test]
    fn test_empty_dataset() {
        let r = report(&[]);
        assert_eq!(r.catalog_size, 0);
        assert_eq!(r.missing_percentages["loadCapacity"], 0.0);
        assert_eq!(r.source_tracking_percentage, 0.0);
        assert!(!r.gates.passed);
        assert_eq!(r.quality_tiers.len(), 4);
    }

    #[test]
    fn test_unparsed_capacity_bucket() {
        let mut rec = record(0);
        rec.capacity_kg = None;
        let r = report(&[rec]);
        assert_eq!(r.capacity_buckets[UNKNOWN_BUCKET], 1);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
