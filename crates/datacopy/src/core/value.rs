//! Value and record types carried through a transfer.
//!
//! Values are owned: a record outlives the source buffer it was read from so
//! adapters can rewrite it before it reaches the consumer.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use super::schema::DataType;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Blob(Vec<u8>),
}

/// A value could not be represented as the requested column type.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot convert {value} to {target}")]
pub struct ConversionError {
    pub value: String,
    pub target: DataType,
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, or text that is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The zero of a numeric column type.
    pub fn zero_for(data_type: DataType) -> Option<Value> {
        match data_type {
            DataType::Integer | DataType::BigInteger => Some(Value::Integer(0)),
            DataType::Decimal => Some(Value::Decimal(Decimal::ZERO)),
            _ => None,
        }
    }

    /// Render as text, `None` for NULL. Blobs are lower-case hex.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            Value::Null => return None,
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATE_TIME_FORMATS[0]).to_string(),
            Value::Blob(b) => encode_hex(b),
        };
        Some(text)
    }

    /// Convert this value to the representation of `target`.
    ///
    /// Text is parsed for non-text targets and blank text becomes NULL.
    pub fn coerce(self, target: DataType) -> Result<Value, ConversionError> {
        let fail = |v: &Value| ConversionError {
            value: v.to_text().unwrap_or_else(|| "NULL".into()),
            target,
        };

        let converted = match (self, target) {
            (Value::Null, _) => Value::Null,

            (Value::Text(s), DataType::String | DataType::Clob) => Value::Text(s),
            (v, DataType::String | DataType::Clob) => match v.to_text() {
                Some(s) => Value::Text(s),
                None => Value::Null,
            },

            (Value::Text(s), _) if s.trim().is_empty() => Value::Null,

            (Value::Integer(i), DataType::Integer | DataType::BigInteger) => Value::Integer(i),
            (Value::Decimal(d), DataType::Integer | DataType::BigInteger) if d.fract().is_zero() => {
                match d.to_i64() {
                    Some(i) => Value::Integer(i),
                    None => return Err(fail(&Value::Decimal(d))),
                }
            }
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            (Value::Float(f), DataType::Integer | DataType::BigInteger)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Value::Integer(f as i64)
            }
            (Value::Boolean(b), DataType::Integer | DataType::BigInteger) => {
                Value::Integer(i64::from(b))
            }
            (Value::Text(s), DataType::Integer | DataType::BigInteger) => {
                let trimmed = s.trim();
                match trimmed.parse::<i64>() {
                    Ok(i) => Value::Integer(i),
                    Err(_) => match Decimal::from_str(trimmed) {
                        Ok(d) if d.fract().is_zero() => match d.to_i64() {
                            Some(i) => Value::Integer(i),
                            None => return Err(fail(&Value::Text(s))),
                        },
                        _ => return Err(fail(&Value::Text(s))),
                    },
                }
            }

            (Value::Decimal(d), DataType::Decimal) => Value::Decimal(d),
            (Value::Integer(i), DataType::Decimal) => Value::Decimal(Decimal::from(i)),
            (Value::Float(f), DataType::Decimal) => match Decimal::try_from(f) {
                Ok(d) => Value::Decimal(d),
                Err(_) => return Err(fail(&Value::Float(f))),
            },
            (Value::Text(s), DataType::Decimal) => {
                let trimmed = s.trim();
                match Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)) {
                    Ok(d) => Value::Decimal(d),
                    Err(_) => return Err(fail(&Value::Text(s))),
                }
            }

            (Value::Boolean(b), DataType::Boolean) => Value::Boolean(b),
            (Value::Integer(i), DataType::Boolean) => Value::Boolean(i != 0),
            (Value::Text(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Value::Boolean(true),
                "false" | "f" | "no" | "n" | "0" => Value::Boolean(false),
                _ => return Err(fail(&Value::Text(s))),
            },

            (Value::Date(d), DataType::Date) => Value::Date(d),
            (Value::DateTime(dt), DataType::Date) => Value::Date(dt.date()),
            (Value::Text(s), DataType::Date) => {
                let trimmed = s.trim();
                match NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                    .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
                {
                    Ok(d) => Value::Date(d),
                    Err(_) => match parse_date_time(trimmed) {
                        Some(dt) => Value::Date(dt.date()),
                        None => return Err(fail(&Value::Text(s))),
                    },
                }
            }

            (Value::DateTime(dt), DataType::DateTime) => Value::DateTime(dt),
            (Value::Date(d), DataType::DateTime) => match d.and_hms_opt(0, 0, 0) {
                Some(dt) => Value::DateTime(dt),
                None => return Err(fail(&Value::Date(d))),
            },
            (Value::Text(s), DataType::DateTime) => match parse_date_time(s.trim()) {
                Some(dt) => Value::DateTime(dt),
                None => match NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                {
                    Some(dt) => Value::DateTime(dt),
                    None => return Err(fail(&Value::Text(s))),
                },
            },

            (Value::Blob(b), DataType::Blob) => Value::Blob(b),
            (Value::Text(s), DataType::Blob) => match decode_hex(s.trim()) {
                Some(b) => Value::Blob(b),
                None => Value::Blob(s.into_bytes()),
            },

            (other, _) => return Err(fail(&other)),
        };

        Ok(converted)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(s) => f.write_str(&s),
            None => f.write_str("NULL"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// One row of one table: column name to value, in column order.
///
/// Lookups ignore ASCII case, matching how table and column names are
/// compared everywhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder form of [`Record::set`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a field, replacing an existing field of the same name.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column))
        {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    /// Remove a field and return its value.
    pub fn take(&mut self, column: &str) -> Option<Value> {
        let idx = self
            .fields
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(column))?;
        Some(self.fields.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
