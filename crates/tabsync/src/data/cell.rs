//! Dynamically typed cell values.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Cheap shape check before handing a string to chrono.
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}[/.]\d{1,2}[/.]\d{4})").unwrap()
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Tokens read from delimited text that mean "no value".
const NULL_TOKENS: &[&str] = &["na", "n/a", "nan", "null", "none"];

/// A single scalar value in a [`Table`](super::Table).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDateTime),
}

/// Hashable projection of a [`Cell`] used to match records by identifier.
///
/// Integral reals collapse onto `Integer` so `1` and `1.0` name the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Bool(bool),
    Integer(i64),
    Real(u64),
    Text(String),
    Date(NaiveDateTime),
}

impl Cell {
    /// Create a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Read a raw field from delimited text: null tokens become `Null`,
    /// everything else stays text until the normalizer looks at the column.
    pub fn from_field(raw: &str) -> Self {
        if is_null_token(raw) {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell, if it has one.
    ///
    /// Text is parsed, so a CSV column of digits can still be distributed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(f) => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Borrow the text content of a `Text` cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse the cell as a number, degrading to `Null` when it cannot be read.
    pub fn to_number(&self) -> Cell {
        match self {
            Cell::Integer(_) | Cell::Real(_) | Cell::Null => self.clone(),
            Cell::Bool(b) => Cell::Integer(i64::from(*b)),
            Cell::Text(s) => parse_number(s).unwrap_or(Cell::Null),
            Cell::Date(_) => Cell::Null,
        }
    }

    /// Parse the cell as an integer; fractional values become `Null`.
    pub fn to_integer(&self) -> Cell {
        match self.to_number() {
            Cell::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Cell::Integer(f as i64)
            }
            Cell::Real(_) => Cell::Null,
            other => other,
        }
    }

    /// Parse the cell as a real number.
    pub fn to_real(&self) -> Cell {
        match self.to_number() {
            Cell::Integer(i) => Cell::Real(i as f64),
            other => other,
        }
    }

    /// Parse the cell as a date, degrading to `Null` when it cannot be read.
    pub fn to_date(&self) -> Cell {
        match self {
            Cell::Date(_) | Cell::Null => self.clone(),
            Cell::Text(s) => parse_date(s).map(Cell::Date).unwrap_or(Cell::Null),
            _ => Cell::Null,
        }
    }

    /// Identifier projection; `None` when the cell cannot identify a record.
    pub fn key(&self) -> Option<CellKey> {
        match self {
            Cell::Null => None,
            Cell::Bool(b) => Some(CellKey::Bool(*b)),
            Cell::Integer(i) => Some(CellKey::Integer(*i)),
            Cell::Real(f) if f.is_nan() => None,
            Cell::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(CellKey::Integer(*f as i64))
            }
            Cell::Real(f) => Some(CellKey::Real(f.to_bits())),
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(CellKey::Text(s.clone())),
            Cell::Date(d) => Some(CellKey::Date(*d)),
        }
    }

    /// Convert a JSON value into a cell. Nested arrays/objects are kept as
    /// their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n.as_f64().map(Cell::Real).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Convert the cell into a JSON value. Dates become ISO-8601 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Integer(i) => Value::from(*i),
            Cell::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Date(d) => Value::String(format_date(d)),
        }
    }
}

impl fmt::Display for Cell {
    /// Flat text rendering used by the CSV sink. `Null` renders empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Real(r) if r.is_finite() => write!(f, "{}", r),
            Cell::Real(_) => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => f.write_str(&format_date(d)),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Integer(i) => serializer.serialize_i64(*i),
            Cell::Real(r) if r.is_finite() => serializer.serialize_f64(*r),
            Cell::Real(_) => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Date(d) => serializer.serialize_str(&format_date(d)),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Cell::from_json(&value))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Real(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Date(value)
    }
}

/// Check whether a raw text field is a missing-value token.
pub fn is_null_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NULL_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t))
}

/// Parse text as an integer or finite real.
pub fn parse_number(raw: &str) -> Option<Cell> {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Cell::Integer(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Cell::Real)
}

/// Parse text as a date or date-time.
///
/// An RFC 3339 offset is dropped and the wall-clock time kept, so
/// `2024-03-15T08:30:00+02:00` reads as `2024-03-15T08:30:00`.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if !DATE_SHAPE.is_match(trimmed) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Render a date as ISO-8601 (`YYYY-MM-DDTHH:MM:SS[.fff]`).
pub fn format_date(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}
