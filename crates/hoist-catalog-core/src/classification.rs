//! Safety-standard classification resolution.
//!
//! Stage hoists are certified against a handful of standards that every
//! source spells differently (`BGV-D8`, `bgv d8`, `D8 Plus`, `DGUV V17`).
//! [`resolve`] maps them onto one canonical tag each.

use std::collections::BTreeSet;

use crate::models::RawValue;

/// Alias → canonical tag. Keys are lower-case, trimmed.
const ALIASES: &[(&str, &str)] = &[
    ("bgv-d8", "d8"),
    ("bgv d8", "d8"),
    ("bgvd8", "d8"),
    ("d-8", "d8"),
    ("d8plus", "d8+"),
    ("d8 plus", "d8+"),
    ("d8-plus", "d8+"),
    ("bgv-d8+", "d8+"),
    ("bgv d8+", "d8+"),
    ("bgv-d8 plus", "d8+"),
    ("bgv d8 plus", "d8+"),
    ("bgv-c1", "c1"),
    ("bgv c1", "c1"),
    ("bgvc1", "c1"),
    ("dguv v17", "c1"),
    ("dguv-v17", "c1"),
    ("dguv 17", "c1"),
    ("igvw so 17", "c1"),
    ("igvw-so-17", "c1"),
    ("sil 3", "sil3"),
    ("sil-3", "sil3"),
    ("en 14492-2", "en14492-2"),
    ("en14492", "en14492-2"),
];

/// Resolve one token. Unknown tokens pass through lower-cased.
pub fn canonical_tag(token: &str) -> Option<String> {
    let lowered = token.trim().to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    let tag = ALIASES
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(collapsed);
    Some(tag)
}

/// Split on `,`, `;` and `/`, resolve every token and collect a set.
pub fn resolve_text(text: &str) -> BTreeSet<String> {
    text.split([',', ';', '/'])
        .filter_map(canonical_tag)
        .collect()
}

/// Resolve an optional raw value of any shape. Absent input yields an
/// empty set.
pub fn resolve(value: Option<&RawValue>) -> BTreeSet<String> {
    match value {
        None => BTreeSet::new(),
        Some(v) => v.to_list().iter().flat_map(|s| resolve_text(s)).collect(),
    }
}
