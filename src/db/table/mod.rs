use crate::{DatabaseError, core::types::Value};

pub mod row;
pub mod template;

use row::Row;
use template::Template;

/// Paging and ordering applied after template matching.
///
/// The default leaves results unbounded and in storage order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,

    /// Columns to sort by, ascending, most significant first.
    pub order_by: Vec<String>,
}

impl FindOptions {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }
}

/// The CRUD contract every backend fulfills.
///
/// Rows are addressed either by a [`Template`] or by a positional list of key
/// values matching [`DataTable::key_columns`]. Implemented by
/// [`CsvDataTable`](crate::CsvDataTable) and [`RdbDataTable`](crate::RdbDataTable).
pub trait DataTable {
    /// Returns the logical table name.
    fn name(&self) -> &str;

    /// Returns the ordered columns forming the table's key.
    fn key_columns(&self) -> &[String];

    /// Returns every row matching `template`, projected to `field_list`.
    fn find(
        &self,
        template: &Template,
        field_list: Option<&[&str]>,
        options: &FindOptions,
    ) -> Result<Vec<Row>, DatabaseError>;

    /// Adds a row after validating it.
    fn insert(&mut self, new_row: Row) -> Result<(), DatabaseError>;

    /// Overlays `new_values` onto every row matching `template`.
    fn update_by_template(
        &mut self,
        template: &Template,
        new_values: &Row,
    ) -> Result<usize, DatabaseError>;

    /// Removes every row matching `template`.
    fn delete_by_template(&mut self, template: &Template) -> Result<usize, DatabaseError>;

    /// Overlays `new_values` onto the row identified by `key_values`.
    fn update_by_key(&mut self, key_values: &[Value], new_values: &Row) -> Result<usize, DatabaseError>;

    /// Removes the row identified by `key_values`.
    fn delete_by_key(&mut self, key_values: &[Value]) -> Result<usize, DatabaseError>;

    fn find_by_template(
        &self,
        template: &Template,
        field_list: Option<&[&str]>,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.find(template, field_list, &FindOptions::default())
    }

    /// Looks a row up by key. A miss is `Ok(None)`, not an error.
    fn find_by_primary_key(
        &self,
        key_values: &[Value],
        field_list: Option<&[&str]>,
    ) -> Result<Option<Row>, DatabaseError> {
        let template = self.key_template(key_values)?;
        Ok(self
            .find_by_template(&template, field_list)?
            .into_iter()
            .next())
    }

    /// Builds the template selecting the row identified by `key_values`.
    fn key_template(&self, key_values: &[Value]) -> Result<Template, DatabaseError> {
        Template::from_key(self.key_columns(), key_values)
    }
}

/// Checks that `row` carries a non-null value for every key column.
pub(crate) fn check_key_values(key_columns: &[String], row: &Row) -> Result<(), DatabaseError> {
    for column in key_columns {
        match row.get(column) {
            None => {
                return Err(DatabaseError::InvalidRecord(format!(
                    "key column {column} is missing"
                )));
            }
            Some(Value::Null) => {
                return Err(DatabaseError::InvalidRecord(format!(
                    "key column {column} is null"
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Rejects a projection that names no columns. `None` still means every column.
pub(crate) fn check_field_list(field_list: Option<&[&str]>) -> Result<(), DatabaseError> {
    match field_list {
        Some([]) => Err(DatabaseError::InvalidQuery(
            "field list must name at least one column".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Rejects an update that would set nothing.
pub(crate) fn check_new_values(new_values: &Row) -> Result<(), DatabaseError> {
    if new_values.is_empty() {
        return Err(DatabaseError::InvalidQuery(
            "update needs at least one column to set".to_string(),
        ));
    }
    Ok(())
}
