//! Field-level deserializers for loosely formatted datasets
//!
//! Public datasets and platform payloads disagree on how ids, booleans,
//! counts, and timestamps are written. These helpers accept every form seen in
//! practice and map "absent" markers to `None` instead of sentinel strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

/// Formats accepted for timestamps, tried in order
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Twitter v1.1 `created_at` format, e.g. `Wed Oct 10 20:19:24 +0000 2018`
pub const TWITTER_CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Serialization format for post timestamps
const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<serde_json::Value>),
}

/// Parse a timestamp in any supported format, normalized to naive UTC
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, TWITTER_CREATED_AT_FORMAT) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn is_absent_marker(s: &str) -> bool {
    let s = s.trim();
    s.is_empty()
        || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("absent")
}

fn scalar_to_id(value: Scalar) -> Option<String> {
    match value {
        Scalar::Int(i) => Some(i.to_string()),
        // ids exported through spreadsheets come back as 1.234e17
        Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{f:.0}")),
        Scalar::Float(_) => None,
        Scalar::Str(s) if is_absent_marker(&s) => None,
        Scalar::Str(s) => Some(s.trim().to_string()),
        Scalar::Bool(_) | Scalar::List(_) => None,
    }
}

fn scalar_to_count(value: Scalar) -> Option<u32> {
    match value {
        Scalar::Int(i) => u32::try_from(i).ok(),
        Scalar::Float(f) if f.is_finite() && f >= 0.0 => Some(f as u32),
        Scalar::Float(_) => None,
        Scalar::Str(s) if is_absent_marker(&s) => None,
        Scalar::Str(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u32))
        }
        Scalar::Bool(_) | Scalar::List(_) => None,
    }
}

/// Required identifier given as a string or a number
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Scalar::deserialize(deserializer)?;
    scalar_to_id(value).ok_or_else(|| serde::de::Error::custom("expected a non-empty identifier"))
}

/// Optional identifier; empty, `None`, and `null` strings mean absent
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_id))
}

/// Optional free text; empty strings are absent
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Boolean written as `true`, `True`, `1`, or `yes`
pub fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => false,
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Int(i)) => i != 0,
        Some(Scalar::Float(f)) => f != 0.0,
        Some(Scalar::Str(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "t" | "1" | "yes" | "y"
        ),
        Some(Scalar::List(_)) => false,
    })
}

/// Optional engagement count; absent markers and negative values are `None`
pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_count))
}

/// Entity count given as a number, a JSON array, or a bracketed list string
/// such as `[tag1, tag2]`
pub fn entity_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => 0,
        Some(Scalar::List(items)) => items.len() as u32,
        Some(Scalar::Str(s)) => {
            let trimmed = s.trim();
            if let Some(inner) = trimmed.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                inner
                    .split(',')
                    .filter(|item| !item.trim().trim_matches('\'').is_empty())
                    .count() as u32
            } else {
                scalar_to_count(Scalar::Str(s)).unwrap_or(0)
            }
        }
        Some(other) => scalar_to_count(other).unwrap_or(0),
    })
}

/// Post timestamp in any format accepted by [`parse_timestamp`]
pub fn timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {raw}")))
}

/// Optional timestamp; absent markers and unparseable values are `None`
pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !is_absent_marker(s))
        .and_then(|s| parse_timestamp(&s)))
}

pub fn serialize_timestamp<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.format(OUTPUT_FORMAT).to_string())
}
