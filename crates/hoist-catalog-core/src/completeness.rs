//! Weighted completeness scoring.
//!
//! Two fixed tiers of specification fields:
//!
//! | Tier | Fields | Weight |
//! |------|--------|--------|
//! | critical | loadCapacity, liftingSpeed, motorPower, classification, dutyCycle | 70 |
//! | secondary | voltageOptions, weight, protectionClass, series | 30 |
//!
//! `score = round(70 × critical/5 + 30 × secondary/4)`.

use std::collections::BTreeSet;

use crate::models::{CanonicalRecord, QualityTier};

pub const CRITICAL_FIELDS: [&str; 5] = [
    "loadCapacity",
    "liftingSpeed",
    "motorPower",
    "classification",
    "dutyCycle",
];

pub const SECONDARY_FIELDS: [&str; 4] = ["voltageOptions", "weight", "protectionClass", "series"];

const CRITICAL_WEIGHT: f64 = 70.0;
const SECONDARY_WEIGHT: f64 = 30.0;

/// Placeholder some scrapers emit for an empty table cell.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completeness {
    pub score: u8,
    pub tier: QualityTier,
    pub has_complete_specs: bool,
    pub populated: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

/// Present, non-blank and not the `-` placeholder.
pub fn is_valid_text(value: Option<&str>) -> bool {
    match value {
        Some(v) => {
            let t = v.trim();
            !t.is_empty() && t != PLACEHOLDER
        }
        None => false,
    }
}

fn is_valid_list(values: &[String]) -> bool {
    values.iter().any(|v| is_valid_text(Some(v)))
}

/// Whether a tiered field holds a usable value.
pub fn is_field_valid(record: &CanonicalRecord, field: &str) -> bool {
    match field {
        "loadCapacity" => is_valid_text(record.load_capacity.as_deref()),
        "liftingSpeed" => is_valid_text(record.lifting_speed.as_deref()),
        "motorPower" => is_valid_text(record.motor_power.as_deref()),
        "classification" => record
            .classification
            .iter()
            .any(|t| is_valid_text(Some(t))),
        "dutyCycle" => is_valid_text(record.duty_cycle.as_deref()),
        "voltageOptions" => is_valid_list(&record.voltage_options),
        "weight" => is_valid_text(record.weight.as_deref()),
        "protectionClass" => is_valid_text(record.protection_class.as_deref()),
        "series" => is_valid_text(record.series.as_deref()),
        _ => false,
    }
}

pub fn calculate(record: &CanonicalRecord) -> Completeness {
    let mut populated = BTreeSet::new();
    let mut missing = BTreeSet::new();

    let mut count = |fields: &[&str]| -> usize {
        let mut present = 0;
        for field in fields {
            if is_field_valid(record, field) {
                present += 1;
                populated.insert(field.to_string());
            } else {
                missing.insert(field.to_string());
            }
        }
        present
    };

    let critical = count(&CRITICAL_FIELDS);
    let secondary = count(&SECONDARY_FIELDS);

    let raw = CRITICAL_WEIGHT * critical as f64 / CRITICAL_FIELDS.len() as f64
        + SECONDARY_WEIGHT * secondary as f64 / SECONDARY_FIELDS.len() as f64;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    let has_complete_specs = ["loadCapacity", "liftingSpeed", "motorPower"]
        .iter()
        .all(|f| is_field_valid(record, f));

    Completeness {
        score,
        tier: QualityTier::from_score(score),
        has_complete_specs,
        populated,
        missing,
    }
}

/// Recompute and store the quality fields of a record in place.
pub fn apply(record: &mut CanonicalRecord) {
    let c = calculate(record);
    record.data_completeness = c.score;
    record.data_quality_tier = c.tier;
    record.has_complete_specs = c.has_complete_specs;
    record.populated_fields = c.populated;
    record.missing_fields = c.missing;
}
