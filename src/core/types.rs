use std::cmp::Ordering;

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

use crate::DatabaseError;

/// A scalar value stored in a row column.
///
/// Values loaded from a CSV source are always [`Value::Text`]; the relational
/// backend yields whatever type the engine stored. Equality is exact: no
/// coercion happens between `Text("1")` and `Int64(1)`.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    /// A UTF-8 text string.
    Text(String),

    /// A 64-bit signed integer value.
    Int64(i64),

    /// A 64-bit floating point number.
    Float64(f64),

    /// Represents a NULL value (absence of data).
    ///
    /// A template may ask for NULL explicitly; it only matches a row that
    /// carries the column with a NULL in it.
    Null,
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(fl) => write!(f, "{}", fl),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Total order used for sorting rows.
    ///
    /// NULL sorts first; values of different types fall back to their variant
    /// order so sorting never fails.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int64(a), Value::Float64(b)) => (*a as f64).total_cmp(b),
            (Value::Float64(a), Value::Int64(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            _ => self.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }

    /// Converts a value read from the relational engine.
    pub(crate) fn from_engine(value: ValueRef<'_>) -> Result<Self, DatabaseError> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Int64(i)),
            ValueRef::Real(f) => Ok(Value::Float64(f)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|text| Value::Text(text.to_owned()))
                .map_err(|e| DatabaseError::TypeMismatch(format!("text is not UTF-8: {e}"))),
            ValueRef::Blob(bytes) => Err(DatabaseError::TypeMismatch(format!(
                "blob of {} bytes is not a scalar row value",
                bytes.len()
            ))),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Int64(i) => ValueRef::Integer(*i),
            Value::Float64(f) => ValueRef::Real(*f),
            Value::Null => ValueRef::Null,
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
