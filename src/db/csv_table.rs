use std::{cmp::Ordering, fmt, fs::File};

use tracing::{debug, trace, warn};

use crate::{
    DatabaseError,
    config::{CsvConnectInfo, CsvTableOptions, DuplicatePolicy},
    core::types::Value,
    db::table::{
        DataTable, FindOptions, check_field_list, check_key_values, check_new_values, row::Row,
        template::Template,
    },
};

/// A table held entirely in memory, loaded once from a CSV file.
///
/// Every query is a linear scan over the rows in file order. The recognized
/// columns come from the file header, or from the first row when rows are
/// supplied directly. Values read from the file are always text.
#[derive(Debug)]
pub struct CsvDataTable {
    name: String,
    connect_info: CsvConnectInfo,
    key_columns: Vec<String>,

    /// `None` until a header, a supplied row or an insert establishes them.
    columns: Option<Vec<String>>,

    rows: Vec<Row>,
    debug: bool,
    duplicates: DuplicatePolicy,
}

impl CsvDataTable {
    /// Number of rows shown by the `Display` impl before it elides the middle.
    const ROWS_TO_PRINT: usize = 10;
    const SEPARATOR_ROWS: usize = 2;

    /// Creates the table with default options, reading the file immediately.
    pub fn new(
        name: impl Into<String>,
        connect_info: CsvConnectInfo,
        key_columns: Vec<String>,
    ) -> Result<Self, DatabaseError> {
        Self::with_options(name, connect_info, key_columns, CsvTableOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        connect_info: CsvConnectInfo,
        key_columns: Vec<String>,
        options: CsvTableOptions,
    ) -> Result<Self, DatabaseError> {
        let mut table = Self {
            name: name.into(),
            connect_info,
            key_columns,
            columns: None,
            rows: Vec::new(),
            debug: options.debug,
            duplicates: options.duplicates,
        };

        match options.rows {
            Some(rows) => {
                table.columns = rows
                    .first()
                    .map(|row| row.columns().map(str::to_owned).collect());
                table.rows = rows;
            }
            None if options.load => table.load()?,
            None => {}
        }

        if table.debug {
            debug!(
                table = %table.name,
                path = %table.connect_info.path().display(),
                key_columns = ?table.key_columns,
                rows = table.rows.len(),
                "created csv table"
            );
        }

        Ok(table)
    }

    fn load(&mut self) -> Result<(), DatabaseError> {
        let path = self.connect_info.path();
        let mut reader = csv::Reader::from_reader(File::open(&path)?);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        for record in reader.records() {
            let record = record?;
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(column, value)| (column.as_str(), value))
                .collect();
            self.rows.push(row);
        }
        self.columns = Some(headers);

        if self.debug {
            debug!(table = %self.name, rows = self.rows.len(), "loaded rows");
        }

        Ok(())
    }

    /// Writes the header and every row back to the source file.
    ///
    /// The header grows to cover columns that updates added to stored rows,
    /// and those columns become recognized. CSV has no NULL, so NULL and
    /// missing values are written as empty fields and reload as empty text.
    pub fn save(&mut self) -> Result<(), DatabaseError> {
        let path = self.connect_info.path();
        let mut columns = self.columns.take().unwrap_or_default();
        for row in &self.rows {
            for column in row.columns() {
                if !columns.iter().any(|known| known.as_str() == column) {
                    columns.push(column.to_owned());
                }
            }
        }
        self.columns = Some(columns);
        let columns = self.columns.as_deref().unwrap_or_default();

        let mut writer = csv::Writer::from_writer(File::create(&path)?);
        writer.write_record(columns)?;
        for row in &self.rows {
            writer.write_record(columns.iter().map(|column| match row.get(column) {
                None | Some(Value::Null) => String::new(),
                Some(value) => value.to_string(),
            }))?;
        }
        writer.flush()?;

        if self.debug {
            debug!(table = %self.name, rows = self.rows.len(), path = %path.display(), "saved rows");
        }

        Ok(())
    }

    /// The stored rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The recognized columns, if known yet.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check_columns(&self, row: &Row) -> Result<(), DatabaseError> {
        let Some(columns) = &self.columns else {
            return Ok(());
        };

        match row.columns().find(|c| !columns.iter().any(|known| known.as_str() == *c)) {
            Some(unknown) => Err(DatabaseError::InvalidRecord(format!(
                "column {unknown} is not a column of {}",
                self.name
            ))),
            None => Ok(()),
        }
    }

    fn check_order_columns(&self, order_by: &[String]) -> Result<(), DatabaseError> {
        if let Some(columns) = &self.columns {
            if let Some(missing) = order_by.iter().find(|c| !columns.contains(c)) {
                return Err(DatabaseError::ColumnNotFound(missing.clone()));
            }
        }
        Ok(())
    }

    fn position_by_key(&self, key_values: &[Value]) -> Result<Option<usize>, DatabaseError> {
        let template = self.key_template(key_values)?;
        Ok(self.rows.iter().position(|row| template.matches(row)))
    }
}

fn compare_rows(a: &Row, b: &Row, order_by: &[String]) -> Ordering {
    order_by
        .iter()
        .map(|column| {
            let left = a.get(column).unwrap_or(&Value::Null);
            let right = b.get(column).unwrap_or(&Value::Null);
            left.sort_cmp(right)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl DataTable for CsvDataTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    fn find(
        &self,
        template: &Template,
        field_list: Option<&[&str]>,
        options: &FindOptions,
    ) -> Result<Vec<Row>, DatabaseError> {
        check_field_list(field_list)?;
        self.check_order_columns(&options.order_by)?;

        let mut matched: Vec<&Row> = self.rows.iter().filter(|row| template.matches(row)).collect();
        if !options.order_by.is_empty() {
            matched.sort_by(|a, b| compare_rows(a, b, &options.order_by));
        }

        if self.debug {
            trace!(table = %self.name, matched = matched.len(), "find");
        }

        matched
            .into_iter()
            .skip(options.offset.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|row| row.project(field_list))
            .collect()
    }

    fn insert(&mut self, new_row: Row) -> Result<(), DatabaseError> {
        if new_row.is_empty() {
            return Err(DatabaseError::InvalidRecord("record has no columns".to_string()));
        }
        self.check_columns(&new_row)?;
        check_key_values(&self.key_columns, &new_row)?;

        let duplicate = Template::from_row(&new_row);
        if self.rows.iter().any(|row| duplicate.matches(row)) {
            match self.duplicates {
                DuplicatePolicy::Reject => {
                    return Err(DatabaseError::DuplicateRecord(format!(
                        "{} already holds this record",
                        self.name
                    )));
                }
                DuplicatePolicy::Warn => {
                    warn!(table = %self.name, "skipped inserting a duplicate record");
                    return Ok(());
                }
            }
        }

        if self.columns.is_none() {
            self.columns = Some(new_row.columns().map(str::to_owned).collect());
        }
        self.rows.push(new_row);

        if self.debug {
            debug!(table = %self.name, rows = self.rows.len(), "inserted row");
        }

        Ok(())
    }

    fn update_by_template(
        &mut self,
        template: &Template,
        new_values: &Row,
    ) -> Result<usize, DatabaseError> {
        check_new_values(new_values)?;

        let mut updated = 0;
        for row in self.rows.iter_mut().filter(|row| template.matches(row)) {
            row.overlay(new_values);
            updated += 1;
        }

        if self.debug {
            debug!(table = %self.name, updated, "updated rows by template");
        }

        Ok(updated)
    }

    fn delete_by_template(&mut self, template: &Template) -> Result<usize, DatabaseError> {
        let before = self.rows.len();
        self.rows.retain(|row| !template.matches(row));
        let deleted = before - self.rows.len();

        if self.debug {
            debug!(table = %self.name, deleted, "deleted rows by template");
        }

        Ok(deleted)
    }

    fn update_by_key(&mut self, key_values: &[Value], new_values: &Row) -> Result<usize, DatabaseError> {
        check_new_values(new_values)?;
        let Some(index) = self.position_by_key(key_values)? else {
            return Ok(0);
        };

        self.rows[index].overlay(new_values);
        if self.debug {
            debug!(table = %self.name, index, "updated row by key");
        }

        Ok(1)
    }

    fn delete_by_key(&mut self, key_values: &[Value]) -> Result<usize, DatabaseError> {
        let Some(index) = self.position_by_key(key_values)? else {
            return Ok(0);
        };

        self.rows.remove(index);
        if self.debug {
            debug!(table = %self.name, index, "deleted row by key");
        }

        Ok(1)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, label: &str, row: &Row, columns: &[String]) -> fmt::Result {
    write!(f, "{: <8}", label)?;
    for column in columns {
        let cell = row.get(column).map(Value::to_string).unwrap_or_default();
        write!(f, " | {: <8}", cell)?;
    }
    writeln!(f)
}

impl fmt::Display for CsvDataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CsvDataTable: {}", self.name)?;
        writeln!(f, "  file:        {}", self.connect_info.path().display())?;
        writeln!(f, "  key columns: {:?}", self.key_columns)?;
        writeln!(f, "  rows:        {}", self.rows.len())?;

        let Some(columns) = self.columns.as_deref() else {
            return Ok(());
        };

        write!(f, "{: <8}", "")?;
        for column in columns {
            write!(f, " | {: <8}", column)?;
        }
        writeln!(f)?;

        if self.rows.len() <= Self::ROWS_TO_PRINT {
            for (idx, row) in self.rows.iter().enumerate() {
                write_row(f, &idx.to_string(), row, columns)?;
            }
            return Ok(());
        }

        let half = Self::ROWS_TO_PRINT / 2;
        for (idx, row) in self.rows.iter().enumerate().take(half) {
            write_row(f, &idx.to_string(), row, columns)?;
        }

        let separator: Row = columns.iter().map(|c| (c.as_str(), "***")).collect();
        for _ in 0..Self::SEPARATOR_ROWS {
            write_row(f, "...", &separator, columns)?;
        }

        let tail_start = self.rows.len() - half;
        for (idx, row) in self.rows.iter().enumerate().skip(tail_start) {
            write_row(f, &idx.to_string(), row, columns)?;
        }

        Ok(())
    }
}
