use indexmap::IndexMap;

use super::row::Row;
use crate::{DatabaseError, core::types::Value};

/// An equality filter: `{column: value, ...}`.
///
/// A row matches when, for every column in the template, the row carries that
/// column with an equal value. The empty template matches every row. Column
/// order is kept because the relational backend turns it into the order of
/// `WHERE` terms and bound arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    terms: IndexMap<String, Value>,
}

impl Template {
    /// The template that matches every row.
    pub fn any() -> Self {
        Self::default()
    }

    /// Zips the ordered key columns with positional key values.
    ///
    /// The lengths must agree: a short key list would otherwise turn a
    /// primary-key lookup into a partial match.
    pub fn from_key(key_columns: &[String], key_values: &[Value]) -> Result<Self, DatabaseError> {
        if key_columns.len() != key_values.len() {
            return Err(DatabaseError::InvalidQuery(format!(
                "expected {} key values for columns {:?}, got {}",
                key_columns.len(),
                key_columns,
                key_values.len()
            )));
        }

        Ok(key_columns
            .iter()
            .cloned()
            .zip(key_values.iter().cloned())
            .collect())
    }

    /// A template that requires every field of `row`, used for duplicate checks.
    pub fn from_row(row: &Row) -> Self {
        row.iter()
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.terms
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.terms.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Template {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            terms: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Template {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
