//! Forgiving deserializers for generated JSON.
//!
//! Model output drifts: numbers arrive as `"$250,000,000"` or `"2.1x"`,
//! lists arrive as a single string, enumerations change case, keys are
//! `null`. These helpers accept all of that and treat anything unusable
//! as absent instead of failing the whole patch.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Parse a human-formatted number.
///
/// Accepts currency prefixes, thousands separators, `%` and `x` suffixes,
/// accounting negatives `(1,200)`, and `k`/`m`/`mm`/`bn`/`b` magnitude
/// suffixes. Percentages keep their written value: `"12.5%"` is `12.5`.
///
/// ```rust
/// use dealmemo_document::lenient::parse_number;
///
/// assert_eq!(parse_number("$250,000,000"), Some(250_000_000.0));
/// assert_eq!(parse_number("2.1x"), Some(2.1));
/// assert_eq!(parse_number("12.5%"), Some(12.5));
/// assert_eq!(parse_number("$40M"), Some(40_000_000.0));
/// assert_eq!(parse_number("n/a"), None);
/// ```
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = &s[1..s.len() - 1];
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest;
    }
    s = s.trim_start_matches(['$', '€', '£', '¥']).trim();

    let mut cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    cleaned.make_ascii_lowercase();

    let mut multiplier = 1.0;
    for (suffix, factor) in [
        ("%", 1.0),
        ("x", 1.0),
        ("bn", 1e9),
        ("mm", 1e6),
        ("b", 1e9),
        ("m", 1e6),
        ("k", 1e3),
    ] {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.to_string();
            multiplier = factor;
            break;
        }
    }

    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let signed = if negative { -value } else { value };
    Some(signed * multiplier)
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(value_to_string).collect();
            Some(parts.join("; "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .into_iter()
                .filter_map(|(key, v)| value_to_string(v).map(|v| format!("{key}: {v}")))
                .collect();
            Some(parts.join("; "))
        }
    }
}

fn value_to_string_list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(value_to_string)
                .filter(|s| !s.trim().is_empty())
                .collect(),
        ),
        other => value_to_string(other).map(|s| vec![s]),
    }
}

fn value_to_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Optional number; unparseable input is absent.
pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

/// Optional non-negative integer (priorities, ranks).
pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .as_ref()
        .and_then(value_to_f64)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v.round() as u32))
}

/// String that tolerates `null`, numbers and booleans.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(value_to_string).unwrap_or_default())
}

/// Optional string; `null` is absent.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(value_to_string))
}

/// List of strings; a lone string becomes a one-element list.
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(value_to_string_list).unwrap_or_default())
}

/// Optional list of strings.
pub fn opt_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.and_then(value_to_string_list))
}

/// Optional `YYYY-MM-DD` date; timestamps are truncated to the day.
pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_to_date))
}

/// Optional enumeration parsed case-insensitively; unknown names are absent.
pub fn opt_enum<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<Value>::deserialize(d)?;
    Ok(value
        .and_then(value_to_string)
        .and_then(|s| T::from_str(s.trim()).ok()))
}

/// List of records where malformed entries are skipped rather than fatal.
pub fn records<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(opt_records(d)?.unwrap_or_default())
}

/// Optional list of records; a lone object becomes a one-element list.
pub fn opt_records<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        Some(obj @ Value::Object(_)) => serde_json::from_value(obj).ok().map(|r| vec![r]),
        Some(_) => None,
    })
}

/// Implements `Deserialize` for a `FromStr` enumeration, falling back to
/// `Default` for unknown or non-string input.
macro_rules! lenient_enum {
    ($ty:ty) => {
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let value = <Option<serde_json::Value> as serde::Deserialize>::deserialize(d)?;
                Ok(value
                    .as_ref()
                    .and_then(serde_json::Value::as_str)
                    .and_then(|s| <$ty as std::str::FromStr>::from_str(s.trim()).ok())
                    .unwrap_or_default())
            }
        }
    };
}

pub(crate) use lenient_enum;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Probe {
        #[serde(deserialize_with = "opt_f64")]
        amount: Option<f64>,
        #[serde(deserialize_with = "string_list")]
        items: Vec<String>,
        #[serde(deserialize_with = "opt_string")]
        tenor: Option<String>,
        #[serde(deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(deserialize_with = "opt_u32")]
        priority: Option<u32>,
    }

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number(" 1,250.5 "), Some(1250.5));
        assert_eq!(parse_number("(1,200)"), Some(-1200.0));
        assert_eq!(parse_number("-3.5%"), Some(-3.5));
        assert_eq!(parse_number("£2.5bn"), Some(2.5e9));
        assert_eq!(parse_number("450k"), Some(450_000.0));
        assert_eq!(parse_number("SOFR + 450bps"), None);
        assert_eq!(parse_number("%"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_probe_accepts_drifted_shapes() {
        let probe: Probe = serde_json::from_str(
            r#"{"amount":"$250,000,000","items":"single","tenor":5,"date":"2025-03-01T10:00:00Z","priority":"2"}"#,
        )
        .unwrap();
        assert_eq!(probe.amount, Some(250_000_000.0));
        assert_eq!(probe.items, vec!["single".to_string()]);
        assert_eq!(probe.tenor.as_deref(), Some("5"));
        assert_eq!(probe.date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(probe.priority, Some(2));
    }

    #[test]
    fn test_probe_nulls_and_garbage_are_absent() {
        let probe: Probe = serde_json::from_str(
            r#"{"amount":"tbd","items":null,"tenor":null,"date":"soon","priority":-1}"#,
        )
        .unwrap();
        assert_eq!(probe.amount, None);
        assert!(probe.items.is_empty());
        assert_eq!(probe.tenor, None);
        assert_eq!(probe.date, None);
        assert_eq!(probe.priority, None);
    }
}
