use rusqlite::{Connection, params_from_iter};
use tracing::{debug, trace};

use crate::{
    DatabaseError,
    config::RdbConnectInfo,
    core::types::Value,
    db::table::row::Row,
    sql::builder::SqlStatement,
};

/// Opens connections for the relational backend.
///
/// Injected into [`RdbDataTable`](crate::RdbDataTable) so tests and callers can
/// decide where connections come from.
pub trait ConnectionFactory: std::fmt::Debug {
    fn connect(&self, info: &RdbConnectInfo) -> Result<Connection, DatabaseError>;
}

/// Opens `info.database` as a SQLite file, or an in-memory database for `:memory:`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

impl ConnectionFactory for SqliteConnector {
    fn connect(&self, info: &RdbConnectInfo) -> Result<Connection, DatabaseError> {
        debug!(
            host = %info.host,
            user = %info.user,
            database = %info.database,
            charset = %info.charset,
            "opening connection"
        );

        let conn = if info.database == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(&info.database)?
        };
        Ok(conn)
    }
}

/// The outcome of running one statement.
#[derive(Debug, Default, PartialEq)]
pub struct Execution {
    /// Rows changed by a mutation, or rows fetched by a query.
    pub affected: usize,

    /// Fetched rows; empty for mutations.
    pub rows: Vec<Row>,
}

/// Runs a statement, binding its arguments positionally.
///
/// Uses `conn` when given and leaves it open. Otherwise a connection is opened
/// from `info` and closed before returning. Mutations are committed unless the
/// connection is already inside a transaction the caller controls.
pub fn run_statement(
    stmt: &SqlStatement,
    conn: Option<&Connection>,
    factory: &dyn ConnectionFactory,
    info: &RdbConnectInfo,
) -> Result<Execution, DatabaseError> {
    debug!(kind = %stmt.kind, sql = %stmt.sql, args = ?stmt.args, "executing statement");

    match conn {
        Some(conn) => execute(stmt, conn),
        None => {
            let conn = factory.connect(info)?;
            let execution = execute(stmt, &conn);
            conn.close().map_err(|(_, e)| DatabaseError::from(e))?;
            trace!("closed connection");
            execution
        }
    }
}

fn execute(stmt: &SqlStatement, conn: &Connection) -> Result<Execution, DatabaseError> {
    if !stmt.kind.is_mutation() {
        return fetch(stmt, conn);
    }

    let tx = if conn.is_autocommit() {
        Some(conn.unchecked_transaction()?)
    } else {
        None
    };

    let affected = {
        let mut cursor = conn.prepare_cached(&stmt.sql)?;
        cursor.execute(params_from_iter(stmt.args.iter()))?
    };

    if let Some(tx) = tx {
        tx.commit()?;
    }

    debug!(affected, "statement committed");
    Ok(Execution {
        affected,
        rows: Vec::new(),
    })
}

fn fetch(stmt: &SqlStatement, conn: &Connection) -> Result<Execution, DatabaseError> {
    let mut cursor = conn.prepare_cached(&stmt.sql)?;
    let columns: Vec<String> = cursor.column_names().into_iter().map(str::to_owned).collect();

    let mut rows = Vec::new();
    let mut results = cursor.query(params_from_iter(stmt.args.iter()))?;
    while let Some(result) = results.next()? {
        let mut row = Row::new();
        for (idx, column) in columns.iter().enumerate() {
            row.set(column.as_str(), Value::from_engine(result.get_ref(idx)?)?);
        }
        rows.push(row);
    }

    debug!(fetched = rows.len(), "statement fetched");
    Ok(Execution {
        affected: rows.len(),
        rows,
    })
}
