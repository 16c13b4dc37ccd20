//! Parse-with-default helpers for numeric values crossing the wire.
//!
//! The server and the host page hand quantities over either as JSON numbers,
//! as numeric strings ("12.50") or not at all. Every reader goes through
//! these helpers so a missing or malformed value becomes `0.0` instead of a
//! deserialization failure.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Parse user or DOM text as `f64`, falling back to `0.0`.
///
/// Accepts a comma as decimal separator ("71,50" -> 71.5). NaN and infinities
/// are treated as invalid input.
pub fn parse_or_zero(text: &str) -> f64 {
    parse_opt(text).unwrap_or(0.0)
}

/// Parse text as a finite `f64`, `None` when empty or invalid.
pub fn parse_opt(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Fixed two-decimal representation used in request bodies.
pub fn fixed2(value: f64) -> String {
    format!("{:.2}", value)
}

/// Shortest display form of a quantity: `8` rather than `8.00`, `2.5` rather than `2.50`.
pub fn display_quantity(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let text = format!("{:.3}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

/// `deserialize_with` for required-but-lenient numeric fields (use together with `#[serde(default)]`).
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_f64(deserializer)?.unwrap_or(0.0))
}

/// `deserialize_with` for optional numeric fields; malformed text becomes `None`.
pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(v)) if v.is_finite() => Some(v),
        Some(NumberOrText::Number(_)) => None,
        Some(NumberOrText::Text(s)) => parse_opt(&s),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_f64")]
        qty: f64,
        #[serde(default, deserialize_with = "lenient_opt_f64")]
        rate: Option<f64>,
    }

    #[test]
    fn test_parse_or_zero() {
        assert_eq!(parse_or_zero("5"), 5.0);
        assert_eq!(parse_or_zero(" -2.5 "), -2.5);
        assert_eq!(parse_or_zero("71,50"), 71.5);
        assert_eq!(parse_or_zero(""), 0.0);
        assert_eq!(parse_or_zero("-"), 0.0);
        assert_eq!(parse_or_zero("abc"), 0.0);
        assert_eq!(parse_or_zero("NaN"), 0.0);
    }

    #[test]
    fn test_fixed2() {
        assert_eq!(fixed2(10.0), "10.00");
        assert_eq!(fixed2(-1.005), "-1.00");
        assert_eq!(fixed2(3.456), "3.46");
    }

    #[test]
    fn test_display_quantity() {
        assert_eq!(display_quantity(8.0), "8");
        assert_eq!(display_quantity(2.5), "2.5");
        assert_eq!(display_quantity(0.1 + 0.2), "0.3");
        assert_eq!(display_quantity(-0.0), "0");
        assert_eq!(display_quantity(-3.0), "-3");
    }

    #[test]
    fn test_lenient_fields() {
        let p: Probe = serde_json::from_str(r#"{"qty": 3, "rate": "12.5"}"#).unwrap();
        assert_eq!(p.qty, 3.0);
        assert_eq!(p.rate, Some(12.5));

        let p: Probe = serde_json::from_str(r#"{"qty": "oops", "rate": null}"#).unwrap();
        assert_eq!(p.qty, 0.0);
        assert_eq!(p.rate, None);

        let p: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(p.qty, 0.0);
        assert_eq!(p.rate, None);
    }
}
