//! Filter, sort and paginate a catalog snapshot.
//!
//! Query parameters arrive as raw strings (HTTP query string or CLI flags)
//! and are parsed leniently by [`CatalogQuery::from_params`]: an enum filter
//! that does not parse is dropped, a bad page or limit falls back to the
//! default.
//!
//! Execution picks a starting set from the most selective index when no
//! free text is active, then applies every remaining filter as a linear
//! scan:
//!
//! | Priority | Filter | Index |
//! |----------|--------|-------|
//! | 1 | manufacturer | `by_manufacturer` |
//! | 2 | classification | `by_classification` |
//! | 3 | capacity bucket | `by_capacity_bucket` |
//! | 4 | quality tier | `by_tier` |
//! | 5 | complete specs | `complete_specs` |
//! | 6 | has images | `with_images` |

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::classification;
use crate::index::{CapacityBucket, IndexSet, SpeedBucket};
use crate::models::{CanonicalRecord, QualityTier};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_MAX_LIMIT: usize = 500;

/// Raw query parameters, all optional strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryParams {
    #[serde(alias = "search", alias = "text")]
    pub q: Option<String>,
    pub manufacturer: Option<String>,
    pub classification: Option<String>,
    pub category: Option<String>,
    pub speed_type: Option<String>,
    pub duty_cycle: Option<String>,
    #[serde(alias = "qualityTier")]
    pub tier: Option<String>,
    #[serde(alias = "capacityRange")]
    pub capacity: Option<String>,
    #[serde(alias = "speedRange")]
    pub speed: Option<String>,
    pub has_images: Option<String>,
    pub complete_specs: Option<String>,
    #[serde(alias = "sortBy")]
    pub sort: Option<String>,
    #[serde(alias = "sortOrder")]
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    Capacity,
    Speed,
    Completeness,
    Classification,
    /// Any other text field, by catalog name.
    Text(&'static str),
}

/// Text fields accepted as sort keys.
const TEXT_SORT_FIELDS: &[&str] = &[
    "manufacturer",
    "model",
    "series",
    "category",
    "speedType",
    "dutyCycle",
    "weight",
    "protectionClass",
    "dataQualityTier",
    "source",
    "id",
];

impl SortField {
    pub fn parse(name: &str) -> Option<SortField> {
        let name = name.trim();
        match name.to_ascii_lowercase().as_str() {
            "capacity" | "loadcapacity" | "capacitykg" => return Some(SortField::Capacity),
            "speed" | "liftingspeed" | "speedmmin" => return Some(SortField::Speed),
            "completeness" | "datacompleteness" => return Some(SortField::Completeness),
            "classification" => return Some(SortField::Classification),
            _ => {}
        }
        TEXT_SORT_FIELDS
            .iter()
            .find(|f| f.eq_ignore_ascii_case(name))
            .map(|f| SortField::Text(*f))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Capacity => "capacity",
            SortField::Speed => "speed",
            SortField::Completeness => "completeness",
            SortField::Classification => "classification",
            SortField::Text(name) => *name,
        }
    }
}

impl Default for SortField {
    fn default() -> Self {
        SortField::Text("manufacturer")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<SortOrder> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Asc),
            "desc" | "descending" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Parsed, validated query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    /// Lower-cased free text.
    pub text: Option<String>,
    pub manufacturer: Option<String>,
    /// Canonical, lower-cased tag.
    pub classification: Option<String>,
    pub category: Option<String>,
    pub speed_type: Option<String>,
    pub duty_cycle: Option<String>,
    pub tier: Option<QualityTier>,
    pub capacity: Option<CapacityBucket>,
    pub speed: Option<SpeedBucket>,
    pub has_images: Option<bool>,
    pub complete_specs: Option<bool>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: usize,
    pub limit: usize,
}

/// Filters and paging actually applied, echoed back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duty_cycle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<QualityTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_specs: Option<bool>,
    pub sort: String,
    pub order: SortOrder,
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub results: Vec<CanonicalRecord>,
    pub total_count: usize,
    pub applied_filters: AppliedFilters,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_bool(value: &Option<String>) -> Option<bool> {
    match value.as_deref()?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Positive integer or `None`.
fn parse_positive(value: &Option<String>) -> Option<usize> {
    value
        .as_deref()?
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 1)
        .map(|n| n as usize)
}

impl CatalogQuery {
    pub fn from_params(params: &QueryParams, limits: &QueryLimits) -> CatalogQuery {
        let max_limit = limits.max_limit.max(1);
        let default_limit = limits.default_limit.clamp(1, max_limit);
        CatalogQuery {
            text: non_blank(&params.q).map(|s| s.to_lowercase()),
            manufacturer: non_blank(&params.manufacturer),
            classification: non_blank(&params.classification)
                .and_then(|c| classification::canonical_tag(&c))
                .map(|c| c.to_lowercase()),
            category: non_blank(&params.category),
            speed_type: non_blank(&params.speed_type),
            duty_cycle: non_blank(&params.duty_cycle),
            tier: non_blank(&params.tier).and_then(|t| QualityTier::parse(&t)),
            capacity: non_blank(&params.capacity).and_then(|c| CapacityBucket::parse(&c)),
            speed: non_blank(&params.speed).and_then(|s| SpeedBucket::parse(&s)),
            has_images: parse_bool(&params.has_images),
            complete_specs: parse_bool(&params.complete_specs),
            sort: non_blank(&params.sort)
                .and_then(|s| SortField::parse(&s))
                .unwrap_or_default(),
            order: non_blank(&params.order)
                .and_then(|o| SortOrder::parse(&o))
                .unwrap_or_default(),
            page: parse_positive(&params.page).unwrap_or(DEFAULT_PAGE),
            limit: parse_positive(&params.limit)
                .unwrap_or(default_limit)
                .min(max_limit),
        }
    }

    pub fn applied_filters(&self) -> AppliedFilters {
        AppliedFilters {
            q: self.text.clone(),
            manufacturer: self.manufacturer.clone(),
            classification: self.classification.clone(),
            category: self.category.clone(),
            speed_type: self.speed_type.clone(),
            duty_cycle: self.duty_cycle.clone(),
            tier: self.tier,
            capacity: self.capacity.map(|b| b.label().to_string()),
            speed: self.speed.map(|b| b.label().to_string()),
            has_images: self.has_images,
            complete_specs: self.complete_specs,
            sort: self.sort.as_str().to_string(),
            order: self.order,
            page: self.page,
            limit: self.limit,
        }
    }

    /// Index-backed starting set, or `None` for a full scan.
    fn start_set<'a>(&self, index: &'a IndexSet) -> Option<&'a [usize]> {
        const EMPTY: &[usize] = &[];
        if self.text.is_some() {
            return None;
        }
        let found = |list: Option<&'a Vec<usize>>| Some(list.map(Vec::as_slice).unwrap_or(EMPTY));
        if let Some(m) = &self.manufacturer {
            return found(index.by_manufacturer.get(&m.to_lowercase()));
        }
        if let Some(c) = &self.classification {
            return found(index.by_classification.get(c));
        }
        if let Some(b) = &self.capacity {
            return found(index.by_capacity_bucket.get(b));
        }
        if let Some(t) = &self.tier {
            return found(index.by_tier.get(t));
        }
        if self.complete_specs == Some(true) {
            return Some(index.complete_specs.as_slice());
        }
        if self.has_images == Some(true) {
            return Some(index.with_images.as_slice());
        }
        None
    }

    fn matches(&self, record: &CanonicalRecord, pos: usize, index: &IndexSet) -> bool {
        let eq = |wanted: &Option<String>, actual: Option<&str>| -> bool {
            match wanted {
                None => true,
                Some(w) => actual.map(|a| a.to_lowercase() == w.to_lowercase()).unwrap_or(false),
            }
        };

        if let Some(text) = &self.text {
            let haystacks = [
                Some(record.manufacturer.as_str()),
                Some(record.model.as_str()),
                record.series.as_deref(),
                record.load_capacity.as_deref(),
            ];
            let hit = haystacks
                .iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(text))
                || record.joined_classification().to_lowercase().contains(text);
            if !hit {
                return false;
            }
        }
        if !eq(&self.manufacturer, Some(record.manufacturer.as_str())) {
            return false;
        }
        if let Some(c) = &self.classification {
            if !record.classification.iter().any(|t| t.to_lowercase() == *c) {
                return false;
            }
        }
        if !eq(&self.category, record.category.as_deref())
            || !eq(&self.speed_type, record.speed_type.as_deref())
            || !eq(&self.duty_cycle, record.duty_cycle.as_deref())
        {
            return false;
        }
        if let Some(t) = self.tier {
            if record.data_quality_tier != t {
                return false;
            }
        }
        if let Some(b) = self.capacity {
            if CapacityBucket::from_kg(index.capacity_kg.get(pos).copied().flatten()) != Some(b) {
                return false;
            }
        }
        if let Some(b) = self.speed {
            if SpeedBucket::from_m_min(index.speed_m_min.get(pos).copied().flatten()) != Some(b) {
                return false;
            }
        }
        if let Some(want) = self.has_images {
            if record.images.is_empty() == want {
                return false;
            }
        }
        if let Some(want) = self.complete_specs {
            if record.has_complete_specs != want {
                return false;
            }
        }
        true
    }
}

enum SortKey {
    Number(Option<f64>),
    Text(Option<String>),
}

fn sort_key(field: &SortField, record: &CanonicalRecord, pos: usize, index: &IndexSet) -> SortKey {
    match field {
        SortField::Capacity => SortKey::Number(index.capacity_kg.get(pos).copied().flatten()),
        SortField::Speed => SortKey::Number(index.speed_m_min.get(pos).copied().flatten()),
        SortField::Completeness => {
            SortKey::Number(index.completeness.get(pos).map(|c| *c as f64))
        }
        SortField::Classification => SortKey::Text(
            Some(record.joined_classification().to_lowercase()).filter(|s| !s.is_empty()),
        ),
        SortField::Text(name) => SortKey::Text(record.field_text(name).map(|s| s.to_lowercase())),
    }
}

/// Missing values sort last in either direction.
fn compare_keys(a: &SortKey, b: &SortKey, order: SortOrder) -> Ordering {
    let directed = |o: Ordering| match order {
        SortOrder::Asc => o,
        SortOrder::Desc => o.reverse(),
    };
    match (a, b) {
        (SortKey::Number(Some(x)), SortKey::Number(Some(y))) => {
            directed(x.partial_cmp(y).unwrap_or(Ordering::Equal))
        }
        (SortKey::Text(Some(x)), SortKey::Text(Some(y))) => directed(x.cmp(y)),
        (SortKey::Number(None), SortKey::Number(None))
        | (SortKey::Text(None), SortKey::Text(None)) => Ordering::Equal,
        (SortKey::Number(None), _) | (SortKey::Text(None), _) => Ordering::Greater,
        (_, SortKey::Number(None)) | (_, SortKey::Text(None)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Run a query against a snapshot and its index.
pub fn execute(records: &[CanonicalRecord], index: &IndexSet, query: &CatalogQuery) -> QueryResult {
    let candidates: Vec<usize> = match query.start_set(index) {
        Some(positions) => positions.to_vec(),
        None => (0..records.len()).collect(),
    };

    let mut matched: Vec<(usize, SortKey)> = candidates
        .into_iter()
        .filter_map(|pos| {
            let record = records.get(pos)?;
            query
                .matches(record, pos, index)
                .then(|| (pos, sort_key(&query.sort, record, pos, index)))
        })
        .collect();

    matched.sort_by(|a, b| compare_keys(&a.1, &b.1, query.order));

    let total_count = matched.len();
    let skip = query.page.saturating_sub(1).saturating_mul(query.limit);
    let results = matched
        .iter()
        .skip(skip)
        .take(query.limit)
        .filter_map(|(pos, _)| records.get(*pos).cloned())
        .collect();

    QueryResult {
        results,
        total_count,
        applied_filters: query.applied_filters(),
    }
}
