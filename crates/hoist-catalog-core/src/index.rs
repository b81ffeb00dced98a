//! Precomputed lookup structures over one catalog snapshot.
//!
//! An [`IndexSet`] is built in a single pass and never mutated; a new
//! snapshot gets a new index. Every map stores positions into the record
//! slice it was built from, in snapshot order.
//!
//! # Buckets
//!
//! | Capacity | Label | Speed | Label |
//! |----------|-------|-------|-------|
//! | ≤ 250 kg | `0-250 kg` | < 2 m/min | `<2 m/min` |
//! | 251–500 kg | `251-500 kg` | 2–4 m/min | `2-4 m/min` |
//! | 501–1000 kg | `501-1000 kg` | 4–8 m/min | `4-8 m/min` |
//! | 1001–2000 kg | `1001-2000 kg` | ≥ 8 m/min | `8+ m/min` |
//! | > 2000 kg | `2000+ kg` | | |

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{CanonicalRecord, QualityTier};
use crate::units;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CapacityBucket {
    UpTo250,
    UpTo500,
    UpTo1000,
    UpTo2000,
    Over2000,
}

impl CapacityBucket {
    pub const ALL: [CapacityBucket; 5] = [
        CapacityBucket::UpTo250,
        CapacityBucket::UpTo500,
        CapacityBucket::UpTo1000,
        CapacityBucket::UpTo2000,
        CapacityBucket::Over2000,
    ];

    /// Upper bounds are inclusive. Non-finite or negative values have no
    /// bucket.
    pub fn from_kg(kg: Option<f64>) -> Option<CapacityBucket> {
        let kg = kg.filter(|v| v.is_finite() && *v >= 0.0)?;
        let bucket = if kg <= 250.0 {
            CapacityBucket::UpTo250
        } else if kg <= 500.0 {
            CapacityBucket::UpTo500
        } else if kg <= 1000.0 {
            CapacityBucket::UpTo1000
        } else if kg <= 2000.0 {
            CapacityBucket::UpTo2000
        } else {
            CapacityBucket::Over2000
        };
        Some(bucket)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapacityBucket::UpTo250 => "0-250 kg",
            CapacityBucket::UpTo500 => "251-500 kg",
            CapacityBucket::UpTo1000 => "501-1000 kg",
            CapacityBucket::UpTo2000 => "1001-2000 kg",
            CapacityBucket::Over2000 => "2000+ kg",
        }
    }

    /// Accepts the label with or without the ` kg` suffix.
    pub fn parse(label: &str) -> Option<CapacityBucket> {
        let wanted = label.trim().to_ascii_lowercase();
        let wanted = wanted.trim_end_matches("kg").trim();
        CapacityBucket::ALL
            .into_iter()
            .find(|b| b.label().trim_end_matches(" kg") == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SpeedBucket {
    Below2,
    From2To4,
    From4To8,
    From8,
}

impl SpeedBucket {
    pub const ALL: [SpeedBucket; 4] = [
        SpeedBucket::Below2,
        SpeedBucket::From2To4,
        SpeedBucket::From4To8,
        SpeedBucket::From8,
    ];

    /// Lower bounds are inclusive.
    pub fn from_m_min(speed: Option<f64>) -> Option<SpeedBucket> {
        let speed = speed.filter(|v| v.is_finite() && *v >= 0.0)?;
        let bucket = if speed < 2.0 {
            SpeedBucket::Below2
        } else if speed < 4.0 {
            SpeedBucket::From2To4
        } else if speed < 8.0 {
            SpeedBucket::From4To8
        } else {
            SpeedBucket::From8
        };
        Some(bucket)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpeedBucket::Below2 => "<2 m/min",
            SpeedBucket::From2To4 => "2-4 m/min",
            SpeedBucket::From4To8 => "4-8 m/min",
            SpeedBucket::From8 => "8+ m/min",
        }
    }

    pub fn parse(label: &str) -> Option<SpeedBucket> {
        let wanted = label.trim().to_ascii_lowercase();
        let wanted = wanted.trim_end_matches("m/min").trim();
        SpeedBucket::ALL
            .into_iter()
            .find(|b| b.label().trim_end_matches(" m/min") == wanted)
    }
}

/// Sorted, de-duplicated value lists for filter UIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub manufacturers: Vec<String>,
    pub classifications: Vec<String>,
    pub categories: Vec<String>,
    pub speed_types: Vec<String>,
    pub duty_cycles: Vec<String>,
    /// Severity order, only tiers present in the snapshot.
    pub quality_tiers: Vec<QualityTier>,
    pub capacity_buckets: Vec<&'static str>,
    pub speed_buckets: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    pub by_id: HashMap<String, usize>,
    /// Keyed by lower-cased manufacturer.
    pub by_manufacturer: HashMap<String, Vec<usize>>,
    /// Keyed by lower-cased tag.
    pub by_classification: HashMap<String, Vec<usize>>,
    pub by_tier: HashMap<QualityTier, Vec<usize>>,
    pub by_capacity_bucket: HashMap<CapacityBucket, Vec<usize>>,
    pub by_speed_bucket: HashMap<SpeedBucket, Vec<usize>>,
    pub with_images: Vec<usize>,
    pub complete_specs: Vec<usize>,
    /// Per-record caches, parallel to the record slice.
    pub completeness: Vec<u8>,
    pub capacity_kg: Vec<Option<f64>>,
    pub speed_m_min: Vec<Option<f64>>,
    pub facets: Facets,
}

impl IndexSet {
    pub fn build(records: &[CanonicalRecord]) -> IndexSet {
        let mut index = IndexSet {
            by_id: HashMap::with_capacity(records.len()),
            completeness: Vec::with_capacity(records.len()),
            capacity_kg: Vec::with_capacity(records.len()),
            speed_m_min: Vec::with_capacity(records.len()),
            ..Default::default()
        };

        let mut manufacturers = BTreeSet::new();
        let mut classifications = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut speed_types = BTreeSet::new();
        let mut duty_cycles = BTreeSet::new();
        let mut tiers = BTreeSet::new();

        for (pos, record) in records.iter().enumerate() {
            // First occurrence wins on a duplicate id.
            index.by_id.entry(record.id.clone()).or_insert(pos);

            index
                .by_manufacturer
                .entry(record.manufacturer.to_lowercase())
                .or_default()
                .push(pos);
            for tag in &record.classification {
                let list = index.by_classification.entry(tag.to_lowercase()).or_default();
                if list.last() != Some(&pos) {
                    list.push(pos);
                }
                classifications.insert(tag.clone());
            }
            index
                .by_tier
                .entry(record.data_quality_tier)
                .or_default()
                .push(pos);

            let capacity = record
                .capacity_kg
                .or_else(|| units::capacity_kg(record.load_capacity.as_deref()));
            let speed = record
                .speed_m_min
                .or_else(|| units::speed_m_min(record.lifting_speed.as_deref()));
            if let Some(bucket) = CapacityBucket::from_kg(capacity) {
                index.by_capacity_bucket.entry(bucket).or_default().push(pos);
            }
            if let Some(bucket) = SpeedBucket::from_m_min(speed) {
                index.by_speed_bucket.entry(bucket).or_default().push(pos);
            }
            index.capacity_kg.push(capacity);
            index.speed_m_min.push(speed);
            index.completeness.push(record.data_completeness);

            if !record.images.is_empty() {
                index.with_images.push(pos);
            }
            if record.has_complete_specs {
                index.complete_specs.push(pos);
            }

            manufacturers.insert(record.manufacturer.clone());
            tiers.insert(record.data_quality_tier);
            if let Some(c) = &record.category {
                categories.insert(c.clone());
            }
            if let Some(s) = &record.speed_type {
                speed_types.insert(s.clone());
            }
            if let Some(d) = &record.duty_cycle {
                duty_cycles.insert(d.clone());
            }
        }

        index.facets = Facets {
            manufacturers: manufacturers.into_iter().collect(),
            classifications: classifications.into_iter().collect(),
            categories: categories.into_iter().collect(),
            speed_types: speed_types.into_iter().collect(),
            duty_cycles: duty_cycles.into_iter().collect(),
            quality_tiers: tiers.into_iter().collect(),
            capacity_buckets: CapacityBucket::ALL.iter().map(|b| b.label()).collect(),
            speed_buckets: SpeedBucket::ALL.iter().map(|b| b.label()).collect(),
        };
        index
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Record counts per capacity bucket label.
    pub fn capacity_distribution(&self) -> BTreeMap<&'static str, usize> {
        CapacityBucket::ALL
            .iter()
            .map(|b| {
                let n = self.by_capacity_bucket.get(b).map(Vec::len).unwrap_or(0);
                (b.label(), n)
            })
            .collect()
    }
}
