//! Fuzzy deduplication of normalized records.
//!
//! Records are grouped by a [`DedupeKey`] built from manufacturer and model
//! and merged pairwise in encounter order:
//!
//! | Field kind | Policy |
//! |------------|--------|
//! | sets and sequences | union, first-seen order kept |
//! | text | non-empty wins; when both differ the longer is kept |
//! | `id`, `sourceUrl`, `processedAt` | first-seen |
//! | maps | existing unless empty |
//! | `source` | known over unknown; `merged` when two known sources differ |
//!
//! Longer-wins is a heuristic. Every text field where both sides held a
//! different value is returned as a [`MergeConflict`] for review.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CanonicalRecord, Source};
use crate::normalize::{self, GENERIC_SUFFIXES};

/// Grouping key: normalized manufacturer plus normalized model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupeKey {
    pub manufacturer: String,
    pub model: String,
}

impl std::fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.manufacturer, self.model)
    }
}

/// Text field where two duplicates disagreed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflict {
    pub key: String,
    pub field: String,
    pub kept: String,
    pub discarded: String,
}

#[derive(Debug, Clone, Default)]
pub struct DedupeOutcome {
    pub records: Vec<CanonicalRecord>,
    /// Input records folded into another record.
    pub merged_count: usize,
    pub conflicts: Vec<MergeConflict>,
}

fn normalize_key_text(text: &str) -> String {
    text.to_lowercase()
        .replace(['-', '_', '/'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn dedupe_key(manufacturer: &str, model: &str) -> DedupeKey {
    let manufacturer = normalize_key_text(manufacturer);
    let mut model = normalize_key_text(model);

    if !manufacturer.is_empty() {
        if let Some(rest) = model.strip_prefix(&manufacturer) {
            if rest.is_empty() || rest.starts_with(' ') {
                model = rest.trim_start().to_string();
            }
        }
    }

    let mut words: Vec<&str> = model.split_whitespace().collect();
    while words
        .last()
        .map(|w| GENERIC_SUFFIXES.contains(w))
        .unwrap_or(false)
    {
        words.pop();
    }

    DedupeKey {
        manufacturer,
        model: words.join(" "),
    }
}

pub fn record_key(record: &CanonicalRecord) -> DedupeKey {
    dedupe_key(&record.manufacturer, &record.model)
}

struct Merger<'a> {
    key: String,
    conflicts: &'a mut Vec<MergeConflict>,
}

impl Merger<'_> {
    fn text(&mut self, field: &str, existing: &mut String, incoming: &str) {
        let mut slot = Some(existing.clone()).filter(|s| !s.trim().is_empty());
        self.optional(field, &mut slot, &Some(incoming.to_string()));
        if let Some(v) = slot {
            *existing = v;
        }
    }

    fn optional(&mut self, field: &str, existing: &mut Option<String>, incoming: &Option<String>) {
        let Some(new) = incoming.as_ref().filter(|s| !s.trim().is_empty()) else {
            return;
        };
        match existing.as_ref().filter(|s| !s.trim().is_empty()) {
            None => *existing = Some(new.clone()),
            Some(old) if old == new => {}
            Some(old) => {
                let (kept, discarded) = if new.chars().count() > old.chars().count() {
                    (new.clone(), old.clone())
                } else {
                    (old.clone(), new.clone())
                };
                debug!(key = %self.key, field, %kept, %discarded, "merge conflict");
                self.conflicts.push(MergeConflict {
                    key: self.key.clone(),
                    field: field.to_string(),
                    kept: kept.clone(),
                    discarded,
                });
                *existing = Some(kept);
            }
        }
    }
}

fn union_vec(existing: &mut Vec<String>, incoming: &[String]) {
    for item in incoming {
        if !existing.contains(item) {
            existing.push(item.clone());
        }
    }
}

fn fill_map(existing: &mut serde_json::Map<String, serde_json::Value>, incoming: &serde_json::Map<String, serde_json::Value>) {
    if existing.is_empty() {
        *existing = incoming.clone();
    }
}

/// Merge `incoming` into `existing`. Derived fields are left stale; callers
/// refresh them once the whole group is merged.
pub fn merge_into(
    existing: &mut CanonicalRecord,
    incoming: &CanonicalRecord,
    key: &DedupeKey,
    conflicts: &mut Vec<MergeConflict>,
) {
    let mut m = Merger {
        key: key.to_string(),
        conflicts,
    };

    m.text("manufacturer", &mut existing.manufacturer, &incoming.manufacturer);
    m.text("model", &mut existing.model, &incoming.model);
    m.optional("series", &mut existing.series, &incoming.series);
    m.optional("category", &mut existing.category, &incoming.category);
    m.optional("speedType", &mut existing.speed_type, &incoming.speed_type);
    m.optional("dutyCycle", &mut existing.duty_cycle, &incoming.duty_cycle);
    m.optional("weight", &mut existing.weight, &incoming.weight);
    m.optional("protectionClass", &mut existing.protection_class, &incoming.protection_class);
    m.optional("description", &mut existing.description, &incoming.description);
    m.optional("loadCapacity", &mut existing.load_capacity, &incoming.load_capacity);
    m.optional("liftingSpeed", &mut existing.lifting_speed, &incoming.lifting_speed);
    m.optional("motorPower", &mut existing.motor_power, &incoming.motor_power);

    existing
        .classification
        .extend(incoming.classification.iter().cloned());
    union_vec(&mut existing.voltage_options, &incoming.voltage_options);
    union_vec(&mut existing.body_color, &incoming.body_color);
    union_vec(&mut existing.common_applications, &incoming.common_applications);
    union_vec(&mut existing.additional_safety, &incoming.additional_safety);
    union_vec(&mut existing.images, &incoming.images);

    fill_map(&mut existing.control_compatibility, &incoming.control_compatibility);
    fill_map(&mut existing.position_feedback, &incoming.position_feedback);
    fill_map(&mut existing.certifications, &incoming.certifications);

    if existing.source_url.is_none() {
        existing.source_url = incoming.source_url.clone();
    }
    match (existing.source, incoming.source) {
        (Source::Unknown, known) => existing.source = known,
        (_, Source::Unknown) => {}
        (a, b) if a != b => existing.source = Source::Merged,
        _ => {}
    }
}

/// Append `-2`, `-3`, … to ids that collide after merging.
pub fn ensure_unique_ids(records: &mut [CanonicalRecord]) {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    for record in records.iter_mut() {
        if seen.insert(record.id.clone()) {
            continue;
        }
        let mut n = 2;
        let mut candidate = format!("{}-{}", record.id, n);
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{}-{}", record.id, n);
        }
        debug!(from = %record.id, to = %candidate, "renamed duplicate id");
        record.id = candidate.clone();
        seen.insert(candidate);
    }
}

/// Group, merge and refresh. Output order follows the first record of each
/// group.
pub fn deduplicate(records: Vec<CanonicalRecord>) -> DedupeOutcome {
    let input_len = records.len();
    let mut order: Vec<DedupeKey> = Vec::new();
    let mut groups: HashMap<DedupeKey, (CanonicalRecord, usize)> = HashMap::new();
    let mut conflicts = Vec::new();

    for record in records {
        let key = record_key(&record);
        match groups.get_mut(&key) {
            Some((existing, count)) => {
                merge_into(existing, &record, &key, &mut conflicts);
                *count += 1;
            }
            None => {
                order.push(key.clone());
                groups.insert(key, (record, 1));
            }
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        if let Some((mut record, count)) = groups.remove(&key) {
            if count > 1 {
                normalize::refresh_derived(&mut record);
            }
            out.push(record);
        }
    }
    ensure_unique_ids(&mut out);

    DedupeOutcome {
        merged_count: input_len - out.len(),
        records: out,
        conflicts,
    }
}
