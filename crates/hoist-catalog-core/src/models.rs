//! Core data models used throughout Hoist Catalog.
//!
//! [`RawRecord`] is what a source hands the pipeline: every known field is
//! optional and typed as a [`RawValue`], so presence is explicit and the
//! normalizer never has to guess from truthiness. [`CanonicalRecord`] is the
//! cleaned, enriched shape that is persisted, indexed and served.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single field value as captured from a source.
///
/// Sources disagree on shape: one feed sends `"classification": "D8, C1"`,
/// another `["bgv-d8"]`, a third a boolean flag. The union keeps the shape
/// until the normalizer decides what it means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// `null`, usually inside a list; reads as absent.
    Null,
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<RawValue>),
    Object(Map<String, Value>),
}

impl RawValue {
    /// Scalar text view. Lists are joined with `", "`, objects and flags
    /// have no text form. Blank strings count as absent.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            RawValue::Number(n) => Some(format_number(*n)),
            RawValue::List(items) => {
                let parts: Vec<String> = items.iter().filter_map(|v| v.as_text()).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
            RawValue::Null | RawValue::Flag(_) | RawValue::Object(_) => None,
        }
    }

    /// Sequence view. A scalar becomes a single-element list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            RawValue::List(items) => items.iter().flat_map(|v| v.to_list()).collect(),
            other => other.as_text().into_iter().collect(),
        }
    }

    /// Loose boolean view: `true`, `"yes"`, `"true"`, `"1"` and non-zero
    /// numbers are truthy.
    pub fn as_flag(&self) -> bool {
        match self {
            RawValue::Flag(b) => *b,
            RawValue::Number(n) => *n != 0.0,
            RawValue::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "y" | "1"
            ),
            RawValue::Null | RawValue::List(_) | RawValue::Object(_) => false,
        }
    }

    /// Key/value view. JSON object text is parsed; anything else is
    /// malformed and yields `None`.
    pub fn as_object(&self) -> Option<Map<String, Value>> {
        match self {
            RawValue::Object(map) => Some(map.clone()),
            RawValue::Text(s) if s.trim_start().starts_with('{') => {
                serde_json::from_str::<Map<String, Value>>(s).ok()
            }
            _ => None,
        }
    }
}

/// Render a number without a trailing `.0` for whole values.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Unvalidated product record as produced by a raw record source. Field
/// names follow the catalog's camelCase JSON with a few snake_case and
/// legacy aliases accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: Option<RawValue>,
    pub manufacturer: Option<RawValue>,
    pub model: Option<RawValue>,
    pub series: Option<RawValue>,
    pub category: Option<RawValue>,
    #[serde(alias = "speed_type")]
    pub speed_type: Option<RawValue>,
    #[serde(alias = "load_capacity", alias = "capacity")]
    pub load_capacity: Option<RawValue>,
    #[serde(alias = "lifting_speed", alias = "speed")]
    pub lifting_speed: Option<RawValue>,
    #[serde(alias = "motor_power", alias = "power")]
    pub motor_power: Option<RawValue>,
    #[serde(alias = "classifications", alias = "standards")]
    pub classification: Option<RawValue>,
    #[serde(alias = "duty_cycle")]
    pub duty_cycle: Option<RawValue>,
    #[serde(alias = "voltage_options", alias = "voltage")]
    pub voltage_options: Option<RawValue>,
    pub weight: Option<RawValue>,
    #[serde(alias = "protection_class", alias = "ipRating")]
    pub protection_class: Option<RawValue>,
    pub description: Option<RawValue>,
    #[serde(alias = "control_compatibility")]
    pub control_compatibility: Option<RawValue>,
    #[serde(alias = "position_feedback")]
    pub position_feedback: Option<RawValue>,
    pub certifications: Option<RawValue>,
    #[serde(alias = "body_color")]
    pub body_color: Option<RawValue>,
    #[serde(alias = "common_applications")]
    pub common_applications: Option<RawValue>,
    #[serde(alias = "additional_safety")]
    pub additional_safety: Option<RawValue>,
    #[serde(alias = "imageUrls")]
    pub images: Option<RawValue>,
    pub source: Option<RawValue>,
    #[serde(alias = "source_url", alias = "url")]
    pub source_url: Option<RawValue>,
    #[serde(alias = "manualEntry", alias = "is_manual")]
    pub is_manual: Option<RawValue>,
    #[serde(alias = "llmEnriched", alias = "is_llm_enriched")]
    pub is_llm_enriched: Option<RawValue>,
    #[serde(alias = "scraped", alias = "is_scraped")]
    pub is_scraped: Option<RawValue>,
    /// Fields no normalization step reads.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawRecord {
    /// Build a record from a JSON object.
    pub fn from_json(value: Value) -> anyhow::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Where a record's data came from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Scraped,
    Manual,
    LlmEnriched,
    Merged,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Scraped => "scraped",
            Source::Manual => "manual",
            Source::LlmEnriched => "llm_enriched",
            Source::Merged => "merged",
            Source::Unknown => "unknown",
        }
    }

    /// Parse a source label, accepting `-`/`_` spellings. Unknown labels
    /// return `None` so callers can fall back to flag inference.
    pub fn parse(label: &str) -> Option<Source> {
        match label.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "scraped" | "scrape" | "web" => Some(Source::Scraped),
            "manual" => Some(Source::Manual),
            "llm_enriched" | "llm" | "enriched" => Some(Source::LlmEnriched),
            "merged" => Some(Source::Merged),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete data-quality tier derived from the completeness score.
///
/// Declaration order is severity order, so the derived `Ord` sorts
/// `complete` first and `minimal` last.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Complete,
    Partial,
    Incomplete,
    #[default]
    Minimal,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Complete,
        QualityTier::Partial,
        QualityTier::Incomplete,
        QualityTier::Minimal,
    ];

    /// ≥80 complete, 60–79 partial, 30–59 incomplete, below 30 minimal.
    pub fn from_score(score: u8) -> QualityTier {
        match score {
            80..=u8::MAX => QualityTier::Complete,
            60..=79 => QualityTier::Partial,
            30..=59 => QualityTier::Incomplete,
            _ => QualityTier::Minimal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Complete => "complete",
            QualityTier::Partial => "partial",
            QualityTier::Incomplete => "incomplete",
            QualityTier::Minimal => "minimal",
        }
    }

    pub fn parse(label: &str) -> Option<QualityTier> {
        let label = label.trim().to_ascii_lowercase();
        QualityTier::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized, enriched product record. This is the persisted snapshot
/// format and the unit every index refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanonicalRecord {
    pub id: String,
    pub manufacturer: String,
    pub model: String,
    pub series: Option<String>,
    pub category: Option<String>,
    pub speed_type: Option<String>,
    pub duty_cycle: Option<String>,
    pub weight: Option<String>,
    pub protection_class: Option<String>,
    pub description: Option<String>,

    /// Dual-unit display string, e.g. `"500 kg (1102 lbs)"`.
    pub load_capacity: Option<String>,
    pub lifting_speed: Option<String>,
    pub motor_power: Option<String>,
    pub capacity_kg: Option<f64>,
    pub speed_m_min: Option<f64>,

    pub classification: BTreeSet<String>,

    pub data_completeness: u8,
    pub data_quality_tier: QualityTier,
    pub has_complete_specs: bool,
    pub populated_fields: BTreeSet<String>,
    pub missing_fields: BTreeSet<String>,

    pub source: Source,
    pub source_url: Option<String>,
    pub processed_at: DateTime<Utc>,

    pub control_compatibility: Map<String, Value>,
    pub position_feedback: Map<String, Value>,
    pub certifications: Map<String, Value>,
    pub voltage_options: Vec<String>,
    pub body_color: Vec<String>,
    pub common_applications: Vec<String>,
    pub additional_safety: Vec<String>,
    pub images: Vec<String>,
}

impl CanonicalRecord {
    /// Classification tags joined in sorted order, for display, text
    /// search and sorting.
    pub fn joined_classification(&self) -> String {
        self.classification
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Text value of a field by its catalog (camelCase) name.
    ///
    /// Used by generic sorting and reporting; sequence fields are joined.
    pub fn field_text(&self, name: &str) -> Option<String> {
        let text = match name {
            "id" => Some(self.id.clone()),
            "manufacturer" => Some(self.manufacturer.clone()),
            "model" => Some(self.model.clone()),
            "series" => self.series.clone(),
            "category" => self.category.clone(),
            "speedType" => self.speed_type.clone(),
            "dutyCycle" => self.duty_cycle.clone(),
            "weight" => self.weight.clone(),
            "protectionClass" => self.protection_class.clone(),
            "description" => self.description.clone(),
            "loadCapacity" => self.load_capacity.clone(),
            "liftingSpeed" => self.lifting_speed.clone(),
            "motorPower" => self.motor_power.clone(),
            "classification" => Some(self.joined_classification()),
            "dataQualityTier" => Some(self.data_quality_tier.as_str().to_string()),
            "source" => Some(self.source.as_str().to_string()),
            "sourceUrl" => self.source_url.clone(),
            "voltageOptions" => Some(self.voltage_options.join(", ")),
            "bodyColor" => Some(self.body_color.join(", ")),
            "commonApplications" => Some(self.common_applications.join(", ")),
            "additionalSafety" => Some(self.additional_safety.join(", ")),
            _ => None,
        };
        text.filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nulls_inside_lists_are_ignored() {
        let raw = RawRecord::from_json(json!({
            "manufacturer": "GIS",
            "model": "LPM",
            "images": ["a.jpg", null],
            "classification": ["d8", null],
            "weight": null
        }))
        .unwrap();
        assert_eq!(raw.images.unwrap().to_list(), vec!["a.jpg"]);
        assert_eq!(raw.classification.as_ref().unwrap().as_text().as_deref(), Some("d8"));
        assert!(raw.weight.is_none());
        assert!(RawValue::List(vec![RawValue::Null]).as_text().is_none());
        assert!(!RawValue::Null.as_flag());
    }

    #[test]
    fn test_raw_record_accepts_mixed_shapes() {
        let raw = RawRecord::from_json(json!({
            "manufacturer": "CM",
            "model": "Lodestar",
            "capacity": "500 kg",
            "classification": ["bgv-d8", "c1"],
            "voltageOptions": "400V",
            "manualEntry": true,
            "crawlerNote": "kept in extra"
        }))
        .unwrap();

        assert_eq!(raw.manufacturer.unwrap().as_text().unwrap(), "CM");
        assert_eq!(raw.load_capacity.unwrap().as_text().unwrap(), "500 kg");
        assert_eq!(
            raw.classification.unwrap().to_list(),
            vec!["bgv-d8".to_string(), "c1".to_string()]
        );
        assert_eq!(raw.voltage_options.unwrap().to_list(), vec!["400V"]);
        assert!(raw.is_manual.unwrap().as_flag());
        assert!(raw.extra.contains_key("crawlerNote"));
    }

    #[test]
    fn test_raw_value_blank_text_is_absent() {
        assert_eq!(RawValue::Text("   ".into()).as_text(), None);
        assert!(RawValue::Text("".into()).to_list().is_empty());
    }

    #[test]
    fn test_raw_value_number_text() {
        assert_eq!(RawValue::Number(500.0).as_text().unwrap(), "500");
        assert_eq!(RawValue::Number(0.5).as_text().unwrap(), "0.5");
    }

    #[test]
    fn test_raw_value_object_from_json_text() {
        let v = RawValue::Text(r#"{"dmx": true}"#.into());
        assert!(v.as_object().unwrap().contains_key("dmx"));
        assert!(RawValue::Text("not json".into()).as_object().is_none());
    }

    #[test]
    fn test_quality_tier_boundaries() {
        assert_eq!(QualityTier::from_score(100), QualityTier::Complete);
        assert_eq!(QualityTier::from_score(80), QualityTier::Complete);
        assert_eq!(QualityTier::from_score(79), QualityTier::Partial);
        assert_eq!(QualityTier::from_score(60), QualityTier::Partial);
        assert_eq!(QualityTier::from_score(59), QualityTier::Incomplete);
        assert_eq!(QualityTier::from_score(30), QualityTier::Incomplete);
        assert_eq!(QualityTier::from_score(29), QualityTier::Minimal);
        assert_eq!(QualityTier::from_score(0), QualityTier::Minimal);
    }

    #[test]
    fn test_quality_tier_orders_by_severity() {
        let mut tiers = vec![
            QualityTier::Minimal,
            QualityTier::Complete,
            QualityTier::Incomplete,
            QualityTier::Partial,
        ];
        tiers.sort();
        assert_eq!(tiers, QualityTier::ALL.to_vec());
    }

    #[test]
    fn test_source_parse_and_serde() {
        assert_eq!(Source::parse("LLM-Enriched"), Some(Source::LlmEnriched));
        assert_eq!(Source::parse("whatever"), None);
        let s: Source = serde_json::from_value(json!("crawler")).unwrap();
        assert_eq!(s, Source::Unknown);
        assert_eq!(serde_json::to_value(Source::LlmEnriched).unwrap(), json!("llm_enriched"));
    }

    #[test]
    fn test_canonical_record_camel_case_round_trip_fields() {
        let rec = CanonicalRecord {
            id: "x".into(),
            manufacturer: "M".into(),
            model: "X".into(),
            speed_m_min: Some(4.0),
            ..Default::default()
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["speedMMin"], json!(4.0));
        assert!(v.get("dataQualityTier").is_some());

        // Older snapshots may miss fields entirely.
        let partial: CanonicalRecord =
            serde_json::from_value(json!({"id": "a", "manufacturer": "M", "model": "A"})).unwrap();
        assert!(partial.classification.is_empty());
        assert_eq!(partial.source, Source::Unknown);
    }
}
