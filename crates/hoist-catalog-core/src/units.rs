//! Unit parsing and conversion for specification strings.
//!
//! Capacity, speed and power arrive as free text (`"1000kg"`, `"2,000 lbs"`,
//! `"4/1 m/min"`, `"0.5 kW"`). This module pulls out the leading magnitude and
//! its unit, converts to the catalog's canonical units and renders a
//! dual-unit display string.
//!
//! # Conversions
//!
//! | Quantity | Canonical | Also accepted |
//! |----------|-----------|---------------|
//! | mass | kg | lbs (× 0.453592), metric ton (× 1000) |
//! | speed | m/min | ft/min (× 0.3048), m/s (× 60) |
//! | power | kW | HP (× 0.745699) |
//!
//! Nothing here fails: text that matches no pattern yields `None`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const KG_PER_LB: f64 = 0.453592;
pub const KG_PER_TON: f64 = 1000.0;
pub const M_PER_FT: f64 = 0.3048;
pub const KW_PER_HP: f64 = 0.745699;

static CAPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+(?:[.,]\d+)*)(?:\s*(-|–|to)\s*(\d+(?:[.,]\d+)*))?\s*(kilograms?|kgs?|pounds?|lbs?|tonnes?|tons?|t)\b",
    )
    .unwrap()
});

static SPEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+(?:[.,]\d+)*)(?:\s*(-|–|to|/)\s*(\d+(?:[.,]\d+)*))?\s*(ft/min|ft\./min|fpm|m/min|m/mn|mpm|m/sec|m/s)\b",
    )
    .unwrap()
});

static POWER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)*)(?:\s*(-|–|to|/)\s*(\d+(?:[.,]\d+)*))?\s*(kw|hp)\b")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassUnit {
    Kg,
    Lbs,
    Ton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    MPerMin,
    FtPerMin,
    MPerSec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    Kw,
    Hp,
}

/// A magnitude with its unit. `upper` carries the second number of a range
/// (`250-500 kg`) or of a dual-speed pair (`4/1 m/min`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement<U> {
    pub value: f64,
    pub upper: Option<f64>,
    pub separator: char,
    pub unit: U,
}

/// Parse a number written with English or European separators.
///
/// - With both `.` and `,`, the last one is the decimal mark
///   (`1,000.5` and `1.000,5`).
/// - A repeated separator groups thousands (`1.000.000`, `1,000,000`).
/// - A single comma followed by exactly three digits groups thousands;
///   otherwise it is a decimal comma. A single dot is always decimal, so
///   `0.375 kW` keeps its meaning.
fn parse_number(text: &str) -> Option<f64> {
    let dots = text.matches('.').count();
    let commas = text.matches(',').count();
    let normalized = match (dots, commas) {
        (0, 0) => text.to_string(),
        (_, c) if c > 0 && dots > 0 => {
            if text.rfind(',') > text.rfind('.') {
                text.replace('.', "").replace(',', ".")
            } else {
                text.replace(',', "")
            }
        }
        (d, 0) if d > 1 => text.replace('.', ""),
        (_, 0) => text.to_string(),
        (0, c) if c > 1 => text.replace(',', ""),
        _ => match text.rfind(',') {
            Some(pos) if text.len() - pos - 1 == 3 => text.replace(',', ""),
            _ => text.replace(',', "."),
        },
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn capture_measurement<U>(caps: &Captures<'_>, unit: U) -> Option<Measurement<U>> {
    let value = parse_number(caps.get(1)?.as_str())?;
    let upper = caps.get(3).and_then(|m| parse_number(m.as_str()));
    let separator = match caps.get(2).map(|m| m.as_str()) {
        Some("/") => '/',
        _ => '-',
    };
    Some(Measurement {
        value,
        upper,
        separator,
        unit,
    })
}

pub fn parse_capacity(text: &str) -> Option<Measurement<MassUnit>> {
    let caps = CAPACITY_RE.captures(text)?;
    let unit = match caps.get(4)?.as_str().to_ascii_lowercase().as_str() {
        u if u.starts_with("k") => MassUnit::Kg,
        u if u.starts_with("p") || u.starts_with("l") => MassUnit::Lbs,
        _ => MassUnit::Ton,
    };
    capture_measurement(&caps, unit)
}

pub fn parse_speed(text: &str) -> Option<Measurement<SpeedUnit>> {
    let caps = SPEED_RE.captures(text)?;
    let unit = match caps.get(4)?.as_str().to_ascii_lowercase().as_str() {
        "ft/min" | "ft./min" | "fpm" => SpeedUnit::FtPerMin,
        "m/s" | "m/sec" => SpeedUnit::MPerSec,
        _ => SpeedUnit::MPerMin,
    };
    capture_measurement(&caps, unit)
}

pub fn parse_power(text: &str) -> Option<Measurement<PowerUnit>> {
    let caps = POWER_RE.captures(text)?;
    let unit = match caps.get(4)?.as_str().to_ascii_lowercase().as_str() {
        "hp" => PowerUnit::Hp,
        _ => PowerUnit::Kw,
    };
    capture_measurement(&caps, unit)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Format with at most `decimals` places, trailing zeros dropped.
fn format_value(value: f64, decimals: i32) -> String {
    let rounded = round_to(value, decimals);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{:.*}", decimals as usize, rounded);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn format_pair(value: f64, upper: Option<f64>, separator: char, decimals: i32) -> String {
    match upper {
        Some(u) => format!(
            "{}{}{}",
            format_value(value, decimals),
            separator,
            format_value(u, decimals)
        ),
        None => format_value(value, decimals),
    }
}

fn mass_to_kg(value: f64, unit: MassUnit) -> f64 {
    match unit {
        MassUnit::Kg => value,
        MassUnit::Lbs => (value * KG_PER_LB).round(),
        MassUnit::Ton => value * KG_PER_TON,
    }
}

fn mass_to_lbs(value: f64, unit: MassUnit) -> f64 {
    match unit {
        MassUnit::Lbs => value,
        other => mass_to_kg(value, other) / KG_PER_LB,
    }
}

fn speed_to_m_min(value: f64, unit: SpeedUnit) -> f64 {
    let m_min = match unit {
        SpeedUnit::MPerMin => value,
        SpeedUnit::FtPerMin => value * M_PER_FT,
        SpeedUnit::MPerSec => value * 60.0,
    };
    round_to(m_min, 2)
}

fn speed_to_ft_min(value: f64, unit: SpeedUnit) -> f64 {
    match unit {
        SpeedUnit::FtPerMin => value,
        other => speed_to_m_min(value, other) / M_PER_FT,
    }
}

fn power_to_kw(value: f64, unit: PowerUnit) -> f64 {
    match unit {
        PowerUnit::Kw => value,
        PowerUnit::Hp => value * KW_PER_HP,
    }
}

fn power_to_hp(value: f64, unit: PowerUnit) -> f64 {
    match unit {
        PowerUnit::Hp => value,
        PowerUnit::Kw => value / KW_PER_HP,
    }
}

/// Capacity in kilograms, first magnitude of a range.
///
/// `"<n> kg"` → n, `"<n> lbs"` → round(n × 0.453592), `"<n> t"` → n × 1000.
pub fn capacity_kg(text: Option<&str>) -> Option<f64> {
    let m = parse_capacity(text?)?;
    Some(mass_to_kg(m.value, m.unit))
}

/// Speed in metres per minute (two decimals), first magnitude of a range.
pub fn speed_m_min(text: Option<&str>) -> Option<f64> {
    let m = parse_speed(text?)?;
    Some(speed_to_m_min(m.value, m.unit))
}

/// Power in kilowatts, first magnitude of a range.
pub fn power_kw(text: Option<&str>) -> Option<f64> {
    let m = parse_power(text?)?;
    Some(power_to_kw(m.value, m.unit))
}

/// `"500 kg (1102 lbs)"`
pub fn display_capacity(text: &str) -> Option<String> {
    let m = parse_capacity(text)?;
    let kg = format_pair(
        mass_to_kg(m.value, m.unit),
        m.upper.map(|u| mass_to_kg(u, m.unit)),
        m.separator,
        1,
    );
    let lbs = format_pair(
        mass_to_lbs(m.value, m.unit),
        m.upper.map(|u| mass_to_lbs(u, m.unit)),
        m.separator,
        0,
    );
    Some(format!("{} kg ({} lbs)", kg, lbs))
}

/// `"4 m/min (13.1 ft/min)"`
pub fn display_speed(text: &str) -> Option<String> {
    let m = parse_speed(text)?;
    let metric = format_pair(
        speed_to_m_min(m.value, m.unit),
        m.upper.map(|u| speed_to_m_min(u, m.unit)),
        m.separator,
        1,
    );
    let imperial = format_pair(
        speed_to_ft_min(m.value, m.unit),
        m.upper.map(|u| speed_to_ft_min(u, m.unit)),
        m.separator,
        1,
    );
    Some(format!("{} m/min ({} ft/min)", metric, imperial))
}

/// `"0.5 kW (0.67 HP)"`
pub fn display_power(text: &str) -> Option<String> {
    let m = parse_power(text)?;
    let kw = format_pair(
        power_to_kw(m.value, m.unit),
        m.upper.map(|u| power_to_kw(u, m.unit)),
        m.separator,
        2,
    );
    let hp = format_pair(
        power_to_hp(m.value, m.unit),
        m.upper.map(|u| power_to_hp(u, m.unit)),
        m.separator,
        2,
    );
    Some(format!("{} kW ({} HP)", kw, hp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_kg_plain() {
        for n in [125.0, 250.0, 500.0, 1000.0, 2500.0] {
            let text = format!("{} kg", n);
            assert_eq!(capacity_kg(Some(&text)), Some(n));
        }
    }

    #[test]
    fn test_capacity_kg_from_lbs() {
        for n in [100.0, 1000.0, 2000.0, 4400.0] {
            let text = format!("{} lbs", n);
            let expected = (n * KG_PER_LB).round();
            let got = capacity_kg(Some(&text)).unwrap();
            assert!((got - expected).abs() < 1e-9, "{} -> {}", text, got);
        }
    }

    #[test]
    fn test_capacity_kg_from_ton() {
        assert_eq!(capacity_kg(Some("1 ton")), Some(1000.0));
        assert_eq!(capacity_kg(Some("2.5 t")), Some(2500.0));
        assert_eq!(capacity_kg(Some("0,5 tonnes")), Some(500.0));
    }

    #[test]
    fn test_capacity_tolerates_spacing_and_case() {
        assert_eq!(capacity_kg(Some("1000KG")), Some(1000.0));
        assert_eq!(capacity_kg(Some("WLL: 1,000 Kg")), Some(1000.0));
    }

    #[test]
    fn test_capacity_range_takes_first() {
        assert_eq!(capacity_kg(Some("250-500 kg")), Some(250.0));
        assert_eq!(capacity_kg(Some("250 to 500kg")), Some(250.0));
    }

    #[test]
    fn test_capacity_absent_or_unmatched() {
        assert_eq!(capacity_kg(None), None);
        assert_eq!(capacity_kg(Some("see datasheet")), None);
        assert_eq!(capacity_kg(Some("")), None);
    }

    #[test]
    fn test_display_capacity() {
        assert_eq!(display_capacity("500 kg").unwrap(), "500 kg (1102 lbs)");
        assert_eq!(display_capacity("1000kg").unwrap(), "1000 kg (2205 lbs)");
        assert_eq!(display_capacity("2000 lbs").unwrap(), "907 kg (2000 lbs)");
        assert_eq!(
            display_capacity("250-500 kg").unwrap(),
            "250-500 kg (551-1102 lbs)"
        );
    }

    #[test]
    fn test_display_capacity_is_idempotent() {
        let once = display_capacity("1 t").unwrap();
        let twice = display_capacity(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_speed_conversions() {
        assert_eq!(speed_m_min(Some("4 m/min")), Some(4.0));
        assert_eq!(speed_m_min(Some("0.1 m/s")), Some(6.0));
        assert_eq!(speed_m_min(Some("16 fpm")), Some(4.88));
        assert_eq!(speed_m_min(Some("8/2 m/min")), Some(8.0));
        assert_eq!(speed_m_min(Some("fast")), None);
    }

    #[test]
    fn test_display_speed() {
        assert_eq!(display_speed("4 m/min").unwrap(), "4 m/min (13.1 ft/min)");
        assert_eq!(
            display_speed("8/2 m/min").unwrap(),
            "8/2 m/min (26.2/6.6 ft/min)"
        );
    }

    #[test]
    fn test_power_conversions() {
        assert_eq!(power_kw(Some("0.5 kW")), Some(0.5));
        let kw = power_kw(Some("1 HP")).unwrap();
        assert!((kw - KW_PER_HP).abs() < 1e-9);
        assert_eq!(display_power("0.5 kW").unwrap(), "0.5 kW (0.67 HP)");
        assert_eq!(display_power("2 hp").unwrap(), "1.49 kW (2 HP)");
    }

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("1,000"), Some(1000.0));
        assert_eq!(parse_number("1,5"), Some(1.5));
        assert_eq!(parse_number("1,000.5"), Some(1000.5));
        assert_eq!(parse_number("12"), Some(12.0));
        assert_eq!(parse_number("1.000,5"), Some(1000.5));
        assert_eq!(parse_number("1.000.000"), Some(1_000_000.0));
        assert_eq!(parse_number("1,000,000"), Some(1_000_000.0));
        assert_eq!(parse_number("0.375"), Some(0.375));
    }

    #[test]
    fn test_european_capacity() {
        assert_eq!(capacity_kg(Some("1.000,5 kg")), Some(1000.5));
        assert_eq!(capacity_kg(Some("1.000.000 kg")), Some(1_000_000.0));
    }
}
