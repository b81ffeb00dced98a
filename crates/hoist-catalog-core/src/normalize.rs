//! Per-record normalization.
//!
//! Turns one [`RawRecord`] into a [`CanonicalRecord`]:
//!
//! 1. Reject records without manufacturer or model (counted as skipped).
//! 2. Resolve manufacturer aliases (exact match) and clean the model name.
//! 3. Render capacity, speed and power as dual-unit display strings.
//! 4. Resolve classification tags; coerce scalar sequence fields.
//! 5. Default structural maps; apply the override rule table.
//! 6. Derive numeric capacity/speed, completeness and provenance.
//!
//! Pure: no I/O, the timestamp is passed in.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::classification;
use crate::completeness;
use crate::models::{CanonicalRecord, RawRecord, RawValue, Source};
use crate::rules;
use crate::units;

/// Exact-match manufacturer aliases → canonical manufacturer name.
const MANUFACTURER_ALIASES: &[(&str, &str)] = &[
    ("CM", "Columbus McKinnon"),
    ("CMCO", "Columbus McKinnon"),
    ("Columbus McKinnon (CM)", "Columbus McKinnon"),
    ("Columbus Mckinnon", "Columbus McKinnon"),
    ("COLUMBUS MCKINNON", "Columbus McKinnon"),
    ("CM Entertainment", "Columbus McKinnon"),
    ("Liftket", "LIFTKET"),
    ("LiftKet", "LIFTKET"),
    ("Liftket Hoffmann GmbH", "LIFTKET"),
    ("ChainMaster", "Chainmaster"),
    ("CHAINMASTER", "Chainmaster"),
    ("Chainmaster Bühnentechnik GmbH", "Chainmaster"),
    ("Verlinde SA", "Verlinde"),
    ("Stagemaker", "Verlinde"),
    ("GIS", "GIS AG"),
    ("MOVECAT", "Movecat"),
    ("Movecat GmbH", "Movecat"),
    ("Kinesys Projects", "Kinesys"),
];

/// Words stripped from the end of a model name.
pub const GENERIC_SUFFIXES: &[&str] = &["hoist", "hoists", "series"];

/// Values scrapers use for "no data".
const PLACEHOLDERS: &[&str] = &["-", "—", "n/a", "na", "tbd", "unknown", "none"];

/// Result of normalizing a batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub records: Vec<CanonicalRecord>,
    pub skipped: usize,
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn clean_manufacturer(name: &str) -> String {
    let trimmed = collapse_whitespace(name);
    MANUFACTURER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(trimmed)
}

/// Collapse whitespace and strip trailing generic suffix words, keeping at
/// least one word.
pub fn clean_model(model: &str) -> String {
    let mut words: Vec<&str> = model.split_whitespace().collect();
    while words.len() > 1 {
        let last = words[words.len() - 1].to_lowercase();
        if GENERIC_SUFFIXES.contains(&last.as_str()) {
            words.pop();
        } else {
            break;
        }
    }
    words.join(" ")
}

fn is_placeholder(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty() || PLACEHOLDERS.contains(&lowered.as_str())
}

/// Text view with whitespace collapsed and placeholders dropped.
fn clean_text(value: Option<&RawValue>) -> Option<String> {
    let text = collapse_whitespace(&value?.as_text()?);
    if is_placeholder(&text) {
        None
    } else {
        Some(text)
    }
}

/// Sequence view with placeholders and duplicates dropped, order kept.
fn clean_list(value: Option<&RawValue>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in value.map(|v| v.to_list()).unwrap_or_default() {
        let item = collapse_whitespace(&item);
        if !is_placeholder(&item) && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn clean_map(value: Option<&RawValue>) -> Map<String, Value> {
    value.and_then(|v| v.as_object()).unwrap_or_default()
}

/// Dual-unit display when the text parses, the cleaned text otherwise.
fn normalize_spec(value: Option<&RawValue>, display: fn(&str) -> Option<String>) -> Option<String> {
    let text = clean_text(value)?;
    Some(display(&text).unwrap_or(text))
}

/// URL-safe identifier from manufacturer and model.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_dash = false;
        } else if ch == '+' {
            if !last_dash {
                slug.push('-');
            }
            slug.push_str("plus");
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Infer `single`, `dual` or `variable` from free speed text.
pub fn infer_speed_type(speed_text: &str) -> Option<String> {
    let lowered = speed_text.to_lowercase();
    if ["variable", "vfd", "inverter", "stepless", "frequency"]
        .iter()
        .any(|w| lowered.contains(w))
    {
        return Some("variable".to_string());
    }
    let m = units::parse_speed(speed_text)?;
    let speed_type = match (m.upper, m.separator) {
        (Some(_), '/') => "dual",
        (Some(_), _) => "variable",
        (None, _) => "single",
    };
    Some(speed_type.to_string())
}

fn infer_source(raw: &RawRecord) -> Source {
    if let Some(source) = raw
        .source
        .as_ref()
        .and_then(|v| v.as_text())
        .and_then(|s| Source::parse(&s))
    {
        return source;
    }
    let flag = |v: &Option<RawValue>| v.as_ref().map(|v| v.as_flag()).unwrap_or(false);
    if flag(&raw.is_manual) {
        Source::Manual
    } else if flag(&raw.is_llm_enriched) {
        Source::LlmEnriched
    } else if flag(&raw.is_scraped) {
        Source::Scraped
    } else {
        Source::Unknown
    }
}

/// Normalize one record. Returns `None` when manufacturer or model is
/// missing.
pub fn normalize_record(raw: &RawRecord, now: DateTime<Utc>) -> Option<CanonicalRecord> {
    let manufacturer = clean_text(raw.manufacturer.as_ref()).map(|m| clean_manufacturer(&m))?;
    let model = clean_text(raw.model.as_ref()).map(|m| clean_model(&m))?;
    if manufacturer.is_empty() || model.is_empty() {
        return None;
    }

    let id = clean_text(raw.id.as_ref())
        .unwrap_or_else(|| slugify(&format!("{} {}", manufacturer, model)));

    let raw_speed = clean_text(raw.lifting_speed.as_ref());
    let speed_type = clean_text(raw.speed_type.as_ref())
        .map(|s| s.to_lowercase())
        .or_else(|| raw_speed.as_deref().and_then(infer_speed_type));

    let mut record = CanonicalRecord {
        id,
        manufacturer,
        model,
        series: clean_text(raw.series.as_ref()),
        category: clean_text(raw.category.as_ref()),
        speed_type,
        duty_cycle: clean_text(raw.duty_cycle.as_ref()),
        weight: clean_text(raw.weight.as_ref()),
        protection_class: clean_text(raw.protection_class.as_ref()),
        description: clean_text(raw.description.as_ref()),
        load_capacity: normalize_spec(raw.load_capacity.as_ref(), units::display_capacity),
        lifting_speed: normalize_spec(raw.lifting_speed.as_ref(), units::display_speed),
        motor_power: normalize_spec(raw.motor_power.as_ref(), units::display_power),
        classification: classification::resolve(raw.classification.as_ref()),
        source: infer_source(raw),
        source_url: clean_text(raw.source_url.as_ref()),
        processed_at: now,
        control_compatibility: clean_map(raw.control_compatibility.as_ref()),
        position_feedback: clean_map(raw.position_feedback.as_ref()),
        certifications: clean_map(raw.certifications.as_ref()),
        voltage_options: clean_list(raw.voltage_options.as_ref()),
        body_color: clean_list(raw.body_color.as_ref()),
        common_applications: clean_list(raw.common_applications.as_ref()),
        additional_safety: clean_list(raw.additional_safety.as_ref()),
        images: clean_list(raw.images.as_ref()),
        ..Default::default()
    };

    let applied = rules::apply_rules(&mut record);
    if !applied.is_empty() {
        debug!(id = %record.id, rules = ?applied, "override rules applied");
    }

    refresh_derived(&mut record);
    Some(record)
}

/// Recompute numeric fields and quality metrics from the display fields.
pub fn refresh_derived(record: &mut CanonicalRecord) {
    record.capacity_kg = units::capacity_kg(record.load_capacity.as_deref());
    record.speed_m_min = units::speed_m_min(record.lifting_speed.as_deref());
    completeness::apply(record);
}

/// Normalize a batch, counting rejected records.
pub fn normalize_batch(raws: &[RawRecord], now: DateTime<Utc>) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    for (i, raw) in raws.iter().enumerate() {
        match normalize_record(raw, now) {
            Some(record) => outcome.records.push(record),
            None => {
                debug!(index = i, "skipping record without manufacturer or model");
                outcome.skipped += 1;
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityTier;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        RawRecord::from_json(value).unwrap()
    }

    #[test]
    fn test_rejects_missing_identity() {
        let now = Utc::now();
        assert!(normalize_record(&raw(json!({"model": "X"})), now).is_none());
        assert!(normalize_record(&raw(json!({"manufacturer": "CM"})), now).is_none());
        assert!(normalize_record(&raw(json!({"manufacturer": " ", "model": "X"})), now).is_none());
        assert!(normalize_record(&raw(json!({"manufacturer": "-", "model": "X"})), now).is_none());
    }

    #[test]
    fn test_batch_counts_skips() {
        let raws = vec![
            raw(json!({"manufacturer": "CM", "model": "Lodestar 500"})),
            raw(json!({"model": "orphan"})),
            raw(json!({})),
        ];
        let outcome = normalize_batch(&raws, Utc::now());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn test_manufacturer_alias_exact_only() {
        assert_eq!(clean_manufacturer("CM"), "Columbus McKinnon");
        assert_eq!(clean_manufacturer("Columbus McKinnon (CM)"), "Columbus McKinnon");
        assert_eq!(clean_manufacturer("  Verlinde   SA "), "Verlinde");
        assert_eq!(clean_manufacturer("CM Lodestar"), "CM Lodestar");
    }

    #[test]
    fn test_clean_model_strips_generic_suffixes() {
        assert_eq!(clean_model("Lodestar  Series Hoist"), "Lodestar");
        assert_eq!(clean_model("D8 Plus Hoist hoist"), "D8 Plus");
        assert_eq!(clean_model("Hoist"), "Hoist");
        assert_eq!(clean_model("Series 3 Compact"), "Series 3 Compact");
    }

    #[test]
    fn test_full_normalization() {
        let now = Utc::now();
        let rec = normalize_record(
            &raw(json!({
                "manufacturer": "CM",
                "model": "Lodestar 1000 Hoist",
                "loadCapacity": "1000kg",
                "liftingSpeed": "4 m/min",
                "motorPower": "0.75 kW",
                "classification": "BGV-D8; BGV-C1",
                "dutyCycle": "40% ED",
                "voltageOptions": "400V 3ph",
                "controlCompatibility": "not an object",
                "certifications": {"ce": true},
                "url": "https://example.com/lodestar",
                "scraped": true
            })),
            now,
        )
        .unwrap();

        assert_eq!(rec.id, "columbus-mckinnon-lodestar-1000");
        assert_eq!(rec.manufacturer, "Columbus McKinnon");
        assert_eq!(rec.model, "Lodestar 1000");
        assert_eq!(rec.load_capacity.as_deref(), Some("1000 kg (2205 lbs)"));
        assert_eq!(rec.capacity_kg, Some(1000.0));
        assert_eq!(rec.speed_m_min, Some(4.0));
        assert_eq!(rec.speed_type.as_deref(), Some("single"));
        assert!(rec.classification.contains("d8"));
        assert!(rec.classification.contains("c1"));
        assert_eq!(rec.voltage_options, vec!["400V 3ph"]);
        assert!(rec.control_compatibility.is_empty());
        assert!(rec.certifications.contains_key("ce"));
        assert_eq!(rec.source, Source::Scraped);
        assert_eq!(rec.source_url.as_deref(), Some("https://example.com/lodestar"));
        assert_eq!(rec.processed_at, now);
        // 5 critical + 1 secondary: 70 + 7.5 -> 78
        assert_eq!(rec.data_completeness, 78);
        assert_eq!(rec.data_quality_tier, QualityTier::Partial);
        assert!(rec.has_complete_specs);
    }

    #[test]
    fn test_unparseable_spec_text_is_kept() {
        let rec = normalize_record(
            &raw(json!({"manufacturer": "GIS", "model": "LPM", "loadCapacity": "see  datasheet"})),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rec.load_capacity.as_deref(), Some("see datasheet"));
        assert_eq!(rec.capacity_kg, None);
    }

    #[test]
    fn test_placeholders_become_absent() {
        let rec = normalize_record(
            &raw(json!({
                "manufacturer": "GIS",
                "model": "LPM",
                "motorPower": "-",
                "weight": "N/A",
                "bodyColor": ["black", "-", "black"]
            })),
            Utc::now(),
        )
        .unwrap();
        assert!(rec.motor_power.is_none());
        assert!(rec.weight.is_none());
        assert_eq!(rec.body_color, vec!["black"]);
    }

    #[test]
    fn test_source_precedence() {
        let now = Utc::now();
        let all_flags = raw(json!({
            "manufacturer": "GIS", "model": "LPM",
            "isManual": true, "isLlmEnriched": true, "isScraped": true
        }));
        assert_eq!(normalize_record(&all_flags, now).unwrap().source, Source::Manual);

        let llm = raw(json!({
            "manufacturer": "GIS", "model": "LPM",
            "llmEnriched": "yes", "scraped": true
        }));
        assert_eq!(normalize_record(&llm, now).unwrap().source, Source::LlmEnriched);

        let explicit = raw(json!({
            "manufacturer": "GIS", "model": "LPM",
            "source": "merged", "isManual": true
        }));
        assert_eq!(normalize_record(&explicit, now).unwrap().source, Source::Merged);

        let none = raw(json!({"manufacturer": "GIS", "model": "LPM"}));
        assert_eq!(normalize_record(&none, now).unwrap().source, Source::Unknown);
    }

    #[test]
    fn test_override_rule_fills_classification() {
        let rec = normalize_record(
            &raw(json!({"manufacturer": "CM", "model": "Lodestar 500"})),
            Utc::now(),
        )
        .unwrap();
        assert!(rec.classification.contains("d8"));
        assert!(rec.populated_fields.contains("classification"));
    }

    #[test]
    fn test_infer_speed_type() {
        assert_eq!(infer_speed_type("8/2 m/min").as_deref(), Some("dual"));
        assert_eq!(infer_speed_type("0-24 m/min").as_deref(), Some("variable"));
        assert_eq!(infer_speed_type("variable up to 24 m/min").as_deref(), Some("variable"));
        assert_eq!(infer_speed_type("4 m/min").as_deref(), Some("single"));
        assert_eq!(infer_speed_type("slow"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Columbus McKinnon Lodestar 1000"), "columbus-mckinnon-lodestar-1000");
        assert_eq!(slugify("Chainmaster D8+ 500"), "chainmaster-d8-plus-500");
        assert_eq!(slugify("  GIS / LPM  "), "gis-lpm");
    }
}
