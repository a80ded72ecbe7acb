pub mod csv_table;
pub mod rdb_table;
pub mod table;

use crate::{
    DatabaseError,
    core::types::Value,
    db::{
        csv_table::CsvDataTable,
        rdb_table::RdbDataTable,
        table::{DataTable, FindOptions, row::Row, template::Template},
    },
};

/// Either backend behind one value, for callers that pick storage at runtime.
#[derive(Debug)]
pub enum Backend {
    Csv(CsvDataTable),
    Rdb(RdbDataTable),
}

impl Backend {
    fn table(&self) -> &dyn DataTable {
        match self {
            Backend::Csv(table) => table,
            Backend::Rdb(table) => table,
        }
    }

    fn table_mut(&mut self) -> &mut dyn DataTable {
        match self {
            Backend::Csv(table) => table,
            Backend::Rdb(table) => table,
        }
    }
}

impl From<CsvDataTable> for Backend {
    fn from(table: CsvDataTable) -> Self {
        Backend::Csv(table)
    }
}

impl From<RdbDataTable> for Backend {
    fn from(table: RdbDataTable) -> Self {
        Backend::Rdb(table)
    }
}

impl DataTable for Backend {
    fn name(&self) -> &str {
        self.table().name()
    }

    fn key_columns(&self) -> &[String] {
        self.table().key_columns()
    }

    fn find(
        &self,
        template: &Template,
        field_list: Option<&[&str]>,
        options: &FindOptions,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.table().find(template, field_list, options)
    }

    fn insert(&mut self, new_row: Row) -> Result<(), DatabaseError> {
        self.table_mut().insert(new_row)
    }

    fn update_by_template(
        &mut self,
        template: &Template,
        new_values: &Row,
    ) -> Result<usize, DatabaseError> {
        self.table_mut().update_by_template(template, new_values)
    }

    fn delete_by_template(&mut self, template: &Template) -> Result<usize, DatabaseError> {
        self.table_mut().delete_by_template(template)
    }

    fn update_by_key(&mut self, key_values: &[Value], new_values: &Row) -> Result<usize, DatabaseError> {
        self.table_mut().update_by_key(key_values, new_values)
    }

    fn delete_by_key(&mut self, key_values: &[Value]) -> Result<usize, DatabaseError> {
        self.table_mut().delete_by_key(key_values)
    }
}
