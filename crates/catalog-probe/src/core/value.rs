//! Dialect-neutral cell values returned by catalog and validation queries.
//!
//! Every driver converts its native row representation into [`CatalogValue`]
//! so the catalog readers and validation primitives can be written once.
//! The `Display` impl is the canonical string form used wherever a value is
//! stringified (min/max bounds, checksums, partition boundaries): NULL renders
//! as the literal `null`, whole floats keep a trailing `.0`, decimals keep
//! their declared scale.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::{ProbeError, Result};

/// Sentinel written in place of SQL NULL.
pub const NULL_SENTINEL: &str = "null";

/// A single value read from a result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CatalogValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
}

impl CatalogValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CatalogValue::Null)
    }

    /// Integer view of the value, if it has one.
    ///
    /// Numeric text is parsed so that drivers which hand back everything as
    /// strings (ODBC text buffers, Oracle NUMBER) still yield counts.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CatalogValue::Int(v) => Some(*v),
            CatalogValue::Bool(b) => Some(i64::from(*b)),
            CatalogValue::Decimal(d) => d.trunc().to_i64(),
            CatalogValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            CatalogValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<Decimal>().ok().and_then(|d| d.trunc().to_i64()))
            }
            _ => None,
        }
    }

    /// Floating point view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CatalogValue::Int(v) => Some(*v as f64),
            CatalogValue::Float(f) => Some(*f),
            CatalogValue::Decimal(d) => d.to_f64(),
            CatalogValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Parse numeric text into the narrowest numeric variant.
    ///
    /// Used by drivers whose wire format is textual for numbers. Anything
    /// that does not parse stays text.
    pub fn from_numeric_text(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return CatalogValue::Int(v);
        }
        if let Ok(d) = trimmed.parse::<Decimal>() {
            return CatalogValue::Decimal(d);
        }
        CatalogValue::Text(text.to_string())
    }

    /// Replace an empty-ish value with NULL.
    pub fn or_null(self) -> Self {
        match self {
            CatalogValue::Text(s) if s.is_empty() => CatalogValue::Null,
            other => other,
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        write!(f, "{:.1}", v)
    } else {
        write!(f, "{}", v)
    }
}

fn write_time(f: &mut fmt::Formatter<'_>, t: &NaiveTime) -> fmt::Result {
    if t.nanosecond() == 0 {
        write!(f, "{}", t.format("%H:%M:%S"))
    } else {
        write!(f, "{}", t.format("%H:%M:%S%.6f"))
    }
}

impl fmt::Display for CatalogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogValue::Null => f.write_str(NULL_SENTINEL),
            CatalogValue::Bool(true) => f.write_str("True"),
            CatalogValue::Bool(false) => f.write_str("False"),
            CatalogValue::Int(v) => write!(f, "{}", v),
            CatalogValue::Float(v) => write_float(f, *v),
            CatalogValue::Decimal(d) => write!(f, "{}", d),
            CatalogValue::Text(s) => f.write_str(s),
            CatalogValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            CatalogValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CatalogValue::Time(t) => write_time(f, t),
            CatalogValue::DateTime(dt) => {
                write!(f, "{} ", dt.date().format("%Y-%m-%d"))?;
                write_time(f, &dt.time())
            }
            CatalogValue::DateTimeOffset(dt) => {
                write!(f, "{} ", dt.date_naive().format("%Y-%m-%d"))?;
                write_time(f, &dt.time())?;
                write!(f, "{}", dt.format("%:z"))
            }
        }
    }
}

impl Serialize for CatalogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CatalogValue::Bool(b) => serializer.serialize_bool(*b),
            CatalogValue::Int(v) => serializer.serialize_i64(*v),
            CatalogValue::Float(v) => serializer.serialize_f64(*v),
            // NULL and everything without a native JSON type go out as text.
            other => serializer.collect_str(other),
        }
    }
}

impl From<&str> for CatalogValue {
    fn from(s: &str) -> Self {
        CatalogValue::Text(s.to_string())
    }
}

impl From<String> for CatalogValue {
    fn from(s: String) -> Self {
        CatalogValue::Text(s)
    }
}

impl From<i64> for CatalogValue {
    fn from(v: i64) -> Self {
        CatalogValue::Int(v)
    }
}

impl From<i32> for CatalogValue {
    fn from(v: i32) -> Self {
        CatalogValue::Int(i64::from(v))
    }
}

impl From<f64> for CatalogValue {
    fn from(v: f64) -> Self {
        CatalogValue::Float(v)
    }
}

impl From<Decimal> for CatalogValue {
    fn from(d: Decimal) -> Self {
        CatalogValue::Decimal(d)
    }
}

impl<T: Into<CatalogValue>> From<Option<T>> for CatalogValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CatalogValue::Null)
    }
}

/// One result-set row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<CatalogValue>,
}

impl Row {
    pub fn new(values: Vec<CatalogValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[CatalogValue] {
        &self.values
    }

    /// Value at `idx`; a short row is a query error, not a NULL.
    pub fn get(&self, idx: usize) -> Result<&CatalogValue> {
        self.values.get(idx).ok_or_else(|| {
            ProbeError::query(format!(
                "result row has {} columns, expected at least {}",
                self.values.len(),
                idx + 1
            ))
        })
    }

    /// Owned copy of the value at `idx`.
    pub fn value(&self, idx: usize) -> Result<CatalogValue> {
        self.get(idx).cloned()
    }

    /// Canonical string form of the value at `idx` (NULL becomes `null`).
    pub fn text(&self, idx: usize) -> Result<String> {
        Ok(self.get(idx)?.to_string())
    }

    /// Integer at `idx`. NULL and non-numeric values are query errors.
    pub fn integer(&self, idx: usize) -> Result<i64> {
        let value = self.get(idx)?;
        value.as_i64().ok_or_else(|| {
            ProbeError::query(format!("expected an integer in column {}, got '{}'", idx, value))
        })
    }
}

impl From<Vec<CatalogValue>> for Row {
    fn from(values: Vec<CatalogValue>) -> Self {
        Row::new(values)
    }
}
