//! Manufacturer-specific override rules.
//!
//! Some facts are implied by a product's name rather than stated in its
//! data: a Lodestar is a D8 hoist even when the feed forgot to say so. The
//! quirks live in one declarative table instead of a growing chain of
//! conditionals. Every rule only fills a value that is still absent, and
//! rules run in table order, so earlier rules win.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CanonicalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    DefaultClassification(&'static [&'static str]),
    DefaultSpeedType(&'static str),
    DefaultCategory(&'static str),
}

/// One table row. `manufacturer` is matched exactly against the cleaned
/// manufacturer name; `None` applies to every manufacturer.
#[derive(Debug, Clone, Copy)]
pub struct OverrideRule {
    pub name: &'static str,
    pub manufacturer: Option<&'static str>,
    pub model_pattern: &'static str,
    pub action: RuleAction,
}

pub const RULES: &[OverrideRule] = &[
    OverrideRule {
        name: "model-names-d8-plus",
        manufacturer: None,
        model_pattern: r"\bd8\s*(\+|plus)",
        action: RuleAction::DefaultClassification(&["d8+"]),
    },
    OverrideRule {
        name: "model-names-c1",
        manufacturer: None,
        model_pattern: r"\b(bgv[- ]?)?c1\b",
        action: RuleAction::DefaultClassification(&["c1"]),
    },
    OverrideRule {
        name: "lodestar-is-d8",
        manufacturer: Some("Columbus McKinnon"),
        model_pattern: r"lodestar",
        action: RuleAction::DefaultClassification(&["d8"]),
    },
    OverrideRule {
        name: "variable-speed-models",
        manufacturer: None,
        model_pattern: r"\b(vario|vf|vfd|variable)\b",
        action: RuleAction::DefaultSpeedType("variable"),
    },
    OverrideRule {
        name: "kinesys-elevation-variable",
        manufacturer: Some("Kinesys"),
        model_pattern: r"elevation|libra",
        action: RuleAction::DefaultSpeedType("variable"),
    },
    OverrideRule {
        name: "wire-rope-category",
        manufacturer: None,
        model_pattern: r"wire\s*rope",
        action: RuleAction::DefaultCategory("Wire Rope Hoist"),
    },
];

struct CompiledRule {
    rule: OverrideRule,
    pattern: Option<Regex>,
}

static COMPILED: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| CompiledRule {
            rule: *rule,
            pattern: Regex::new(&format!("(?i){}", rule.model_pattern)).ok(),
        })
        .collect()
});

impl CompiledRule {
    fn matches(&self, record: &CanonicalRecord) -> bool {
        if let Some(m) = self.rule.manufacturer {
            if record.manufacturer != m {
                return false;
            }
        }
        match &self.pattern {
            Some(re) => re.is_match(&record.model),
            None => false,
        }
    }
}

fn apply_action(action: RuleAction, record: &mut CanonicalRecord) -> bool {
    match action {
        RuleAction::DefaultClassification(tags) => {
            if !record.classification.is_empty() {
                return false;
            }
            record
                .classification
                .extend(tags.iter().map(|t| t.to_string()));
            true
        }
        RuleAction::DefaultSpeedType(speed_type) => {
            if record.speed_type.is_some() {
                return false;
            }
            record.speed_type = Some(speed_type.to_string());
            true
        }
        RuleAction::DefaultCategory(category) => {
            if record.category.is_some() {
                return false;
            }
            record.category = Some(category.to_string());
            true
        }
    }
}

/// Apply every matching rule and return the names of the rules that
/// changed the record.
pub fn apply_rules(record: &mut CanonicalRecord) -> Vec<&'static str> {
    let mut applied = Vec::new();
    for compiled in COMPILED.iter() {
        if compiled.matches(record) && apply_action(compiled.rule.action, record) {
            applied.push(compiled.rule.name);
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(manufacturer: &str, model: &str) -> CanonicalRecord {
        CanonicalRecord {
            manufacturer: manufacturer.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_patterns_compile() {
        for c in COMPILED.iter() {
            assert!(c.pattern.is_some(), "rule {} has a bad pattern", c.rule.name);
        }
    }

    #[test]
    fn test_model_name_implies_classification() {
        let mut r = record("Chainmaster", "BGV-D8 Plus 500");
        let applied = apply_rules(&mut r);
        assert_eq!(applied, vec!["model-names-d8-plus"]);
        assert!(r.classification.contains("d8+"));
    }

    #[test]
    fn test_rule_does_not_override_supplied_value() {
        let mut r = record("Columbus McKinnon", "Lodestar 1000");
        r.classification.insert("c1".into());
        apply_rules(&mut r);
        assert_eq!(r.classification.len(), 1);
        assert!(r.classification.contains("c1"));
    }

    #[test]
    fn test_manufacturer_scoped_rule() {
        let mut cm = record("Columbus McKinnon", "Lodestar 1000");
        apply_rules(&mut cm);
        assert!(cm.classification.contains("d8"));

        let mut other = record("Verlinde", "Lodestar 1000");
        apply_rules(&mut other);
        assert!(other.classification.is_empty());
    }

    #[test]
    fn test_earlier_rule_wins() {
        let mut r = record("Columbus McKinnon", "Lodestar D8+");
        apply_rules(&mut r);
        assert_eq!(r.classification.len(), 1);
        assert!(r.classification.contains("d8+"));
    }

    #[test]
    fn test_speed_type_and_category_defaults() {
        let mut r = record("Kinesys", "Elevation 1+ Wire Rope");
        let applied = apply_rules(&mut r);
        assert_eq!(r.speed_type.as_deref(), Some("variable"));
        assert_eq!(r.category.as_deref(), Some("Wire Rope Hoist"));
        assert!(applied.contains(&"kinesys-elevation-variable"));
    }
}
