use std::path::{Path, PathBuf};

use crate::db::table::row::Row;

/// Where a CSV-backed table lives on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvConnectInfo {
    pub directory: PathBuf,
    pub file_name: String,
}

impl CsvConnectInfo {
    pub fn new(directory: impl AsRef<Path>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            file_name: file_name.into(),
        }
    }

    /// The file path joined from directory and file name.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// What an in-memory table does when inserting a row it already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`DatabaseError::DuplicateRecord`](crate::DatabaseError::DuplicateRecord).
    #[default]
    Reject,

    /// Log a warning and leave the table unchanged.
    Warn,
}

/// Construction flags for [`CsvDataTable`](crate::CsvDataTable).
#[derive(Debug, Clone)]
pub struct CsvTableOptions {
    /// Emit per-operation debug events.
    pub debug: bool,

    /// Read the source file at construction. Ignored when `rows` is set.
    pub load: bool,

    /// Rows to start from instead of reading the file.
    pub rows: Option<Vec<Row>>,

    pub duplicates: DuplicatePolicy,
}

impl Default for CsvTableOptions {
    fn default() -> Self {
        Self {
            debug: true,
            load: true,
            rows: None,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl CsvTableOptions {
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn load(mut self, load: bool) -> Self {
        self.load = load;
        self
    }

    pub fn rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }
}

/// Connection profile for the relational backend.
///
/// The SQLite engine only needs `database`, a file path or `:memory:`. The
/// remaining fields describe the server profile and are kept for logging and
/// for connectors that need them.
#[derive(Clone, PartialEq)]
pub struct RdbConnectInfo {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
}

impl std::fmt::Debug for RdbConnectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdbConnectInfo")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .finish()
    }
}

/// The fallback profile used when no connection is supplied.
impl Default for RdbConnectInfo {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "dbuser".to_string(),
            password: "dbuser".to_string(),
            database: "hw1_demo.db".to_string(),
            charset: "utf8mb4".to_string(),
        }
    }
}

impl RdbConnectInfo {
    pub const ENV_PREFIX: &'static str = "TABLETEMPLATE_DB_";

    /// The default profile with any `TABLETEMPLATE_DB_*` variables applied.
    ///
    /// Recognized suffixes: `HOST`, `USER`, `PASSWORD`, `NAME`, `CHARSET`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut info = Self::default();
        let var = |suffix: &str| lookup(&format!("{}{suffix}", Self::ENV_PREFIX));

        if let Some(host) = var("HOST") {
            info.host = host;
        }
        if let Some(user) = var("USER") {
            info.user = user;
        }
        if let Some(password) = var("PASSWORD") {
            info.password = password;
        }
        if let Some(database) = var("NAME") {
            info.database = database;
        }
        if let Some(charset) = var("CHARSET") {
            info.charset = charset;
        }

        info
    }

    /// A profile for a private in-memory SQLite database.
    pub fn in_memory() -> Self {
        Self {
            database: ":memory:".to_string(),
            ..Self::default()
        }
    }
}
