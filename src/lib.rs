//! One template-based CRUD interface over two storage backends: a CSV file
//! held in memory and a table in a relational engine.
//!
//! A [`Template`] is an equality filter `{column: value, ...}`. The in-memory
//! [`CsvDataTable`] evaluates it against each row; the [`RdbDataTable`]
//! compiles it into a parameterized `WHERE` clause.

pub(crate) mod common;
pub mod config;
pub(crate) mod core;
pub mod db;
pub mod sql;

pub use common::error::DatabaseError;
pub use config::{CsvConnectInfo, CsvTableOptions, DuplicatePolicy, RdbConnectInfo};
pub use crate::core::types::Value;
pub use db::{
    Backend,
    csv_table::CsvDataTable,
    rdb_table::RdbDataTable,
    table::{DataTable, FindOptions, row::Row, template::Template},
};
pub use sql::runner::{ConnectionFactory, SqliteConnector};
