use indexmap::IndexMap;

use crate::{DatabaseError, core::types::Value};

/// A row of data mapping column names to values.
///
/// Columns keep the order in which they were first set, so a row loaded from
/// a CSV file iterates in header order. Equality ignores that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the value stored under `column`, if the row carries it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Sets `column` to `value`, returning the previous value.
    ///
    /// A new column is appended at the end; an existing one keeps its position.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(column.into(), value.into())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Column names in row order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes every column of `new_values` into this row.
    ///
    /// Columns absent from `new_values` are left untouched. Column names are not
    /// checked against any schema.
    pub fn overlay(&mut self, new_values: &Row) {
        for (column, value) in new_values.iter() {
            self.values.insert(column.clone(), value.clone());
        }
    }

    /// Reduces the row to `fields`, in the order given.
    ///
    /// `None` returns the whole row. Asking for a column the row does not carry
    /// is an error rather than a silent NULL.
    pub fn project(&self, fields: Option<&[&str]>) -> Result<Row, DatabaseError> {
        let Some(fields) = fields else {
            return Ok(self.clone());
        };

        fields
            .iter()
            .map(|&field| {
                self.values
                    .get(field)
                    .map(|value| (field.to_owned(), value.clone()))
                    .ok_or_else(|| DatabaseError::ColumnNotFound(field.to_owned()))
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Row {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}
