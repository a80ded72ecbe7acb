use rusqlite::Connection;
use tracing::debug;

use crate::{
    DatabaseError,
    config::RdbConnectInfo,
    core::types::Value,
    db::table::{DataTable, FindOptions, check_key_values, row::Row, template::Template},
    sql::{
        builder::{SqlStatement, create_delete, create_insert, create_select, create_update},
        runner::{ConnectionFactory, Execution, SqliteConnector, run_statement},
    },
};

/// A table whose rows live in a relational engine.
///
/// Holds only metadata. Every operation is translated into a parameterized
/// statement and executed, either on the connection handed to
/// [`RdbDataTable::with_connection`] or on a short-lived connection opened from
/// the profile.
///
/// Update and delete report `1` when any row changed and `0` otherwise, not the
/// exact count, unless [`RdbDataTable::exact_counts`] is enabled.
#[derive(Debug)]
pub struct RdbDataTable {
    name: String,
    connect_info: RdbConnectInfo,
    key_columns: Vec<String>,
    connection: Option<Connection>,
    factory: Box<dyn ConnectionFactory>,
    exact_counts: bool,
}

impl RdbDataTable {
    /// Creates the table, opening connections from `connect_info` on demand.
    pub fn new(
        name: impl Into<String>,
        connect_info: RdbConnectInfo,
        key_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            connect_info,
            key_columns,
            connection: None,
            factory: Box::new(SqliteConnector),
            exact_counts: false,
        }
    }

    /// Runs every statement on `conn` instead of opening new connections.
    pub fn with_connection(mut self, conn: Connection) -> Self {
        self.connection = Some(conn);
        self
    }

    pub fn with_factory(mut self, factory: impl ConnectionFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Report the engine's affected-row count from update and delete.
    pub fn exact_counts(mut self, exact: bool) -> Self {
        self.exact_counts = exact;
        self
    }

    /// Gives the held connection back, if one was supplied.
    pub fn into_connection(self) -> Option<Connection> {
        self.connection
    }

    pub fn connect_info(&self) -> &RdbConnectInfo {
        &self.connect_info
    }

    fn run(&self, stmt: &SqlStatement) -> Result<Execution, DatabaseError> {
        run_statement(
            stmt,
            self.connection.as_ref(),
            self.factory.as_ref(),
            &self.connect_info,
        )
    }

    fn count(&self, execution: &Execution) -> usize {
        if self.exact_counts {
            execution.affected
        } else {
            usize::from(execution.affected > 0)
        }
    }
}

impl DataTable for RdbDataTable {
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
        let stmt = create_select(&self.name, template, field_list, options)?;
        Ok(self.run(&stmt)?.rows)
    }

    fn insert(&mut self, new_row: Row) -> Result<(), DatabaseError> {
        check_key_values(&self.key_columns, &new_row)?;
        let stmt = create_insert(&self.name, &new_row)?;
        self.run(&stmt)?;
        debug!(table = %self.name, "inserted row");
        Ok(())
    }

    fn update_by_template(
        &mut self,
        template: &Template,
        new_values: &Row,
    ) -> Result<usize, DatabaseError> {
        let stmt = create_update(&self.name, new_values, template)?;
        let execution = self.run(&stmt)?;
        Ok(self.count(&execution))
    }

    fn delete_by_template(&mut self, template: &Template) -> Result<usize, DatabaseError> {
        let stmt = create_delete(&self.name, template)?;
        let execution = self.run(&stmt)?;
        Ok(self.count(&execution))
    }

    fn update_by_key(&mut self, key_values: &[Value], new_values: &Row) -> Result<usize, DatabaseError> {
        let template = self.key_template(key_values)?;
        self.update_by_template(&template, new_values)
    }

    fn delete_by_key(&mut self, key_values: &[Value]) -> Result<usize, DatabaseError> {
        let template = self.key_template(key_values)?;
        self.delete_by_template(&template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_columns() -> Vec<String> {
        ["playerID", "teamID", "yearID", "stint"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn key(values: [&str; 4]) -> Vec<Value> {
        values.into_iter().map(Value::from).collect()
    }

    fn batting_table() -> RdbDataTable {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE batting (
                 playerID TEXT NOT NULL,
                 teamID TEXT NOT NULL,
                 yearID TEXT NOT NULL,
                 stint TEXT NOT NULL,
                 H TEXT,
                 PRIMARY KEY (playerID, teamID, yearID, stint)
             );
             INSERT INTO batting VALUES ('aaronha01', 'ML1', '1960', '1', '172');
             INSERT INTO batting VALUES ('willite01', 'BOS', '1960', '1', '98');
             INSERT INTO batting VALUES ('mayswi01', 'SFN', '1960', '1', '190');
             INSERT INTO batting VALUES ('runnepe01', 'BOS', '1960', '1', '169');
             INSERT INTO batting VALUES ('mantlmi01', 'NYA', '1960', '1', '145');",
        )
        .unwrap();

        RdbDataTable::new("batting", RdbConnectInfo::in_memory(), key_columns()).with_connection(conn)
    }

    #[test]
    fn test_find_by_primary_key_hit_and_miss() {
        let table = batting_table();

        let found = table
            .find_by_primary_key(&key(["willite01", "BOS", "1960", "1"]), Some(&["playerID", "H"]))
            .unwrap();
        assert_eq!(found, Some(Row::from([("playerID", "willite01"), ("H", "98")])));

        let missing = table
            .find_by_primary_key(&key(["nobody", "BOS", "1960", "1"]), None)
            .unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_find_by_template_in_storage_order() {
        let table = batting_table();

        let rows = table
            .find_by_template(
                &Template::from([("teamID", "BOS"), ("yearID", "1960")]),
                Some(&["playerID", "H"]),
            )
            .unwrap();

        assert_eq!(
            rows,
            vec![
                Row::from([("playerID", "willite01"), ("H", "98")]),
                Row::from([("playerID", "runnepe01"), ("H", "169")]),
            ]
        );
    }

    #[test]
    fn test_find_with_paging() {
        let table = batting_table();
        let options = FindOptions::default().order_by("playerID").limit(2).offset(1);

        let rows = table.find(&Template::any(), Some(&["playerID"]), &options).unwrap();

        assert_eq!(
            rows,
            vec![
                Row::from([("playerID", "mantlmi01")]),
                Row::from([("playerID", "mayswi01")]),
            ]
        );
    }

    #[test]
    fn test_insert_then_find_by_key() {
        let mut table = batting_table();
        let row = Row::from([
            ("playerID", "newbie01"),
            ("teamID", "BOS"),
            ("yearID", "1961"),
            ("stint", "1"),
            ("H", "12"),
        ]);

        table.insert(row.clone()).unwrap();

        let found = table
            .find_by_primary_key(&key(["newbie01", "BOS", "1961", "1"]), None)
            .unwrap();
        assert_eq!(found, Some(row));
    }

    #[test]
    fn test_insert_validates_key_before_executing() {
        let mut table = batting_table();
        let row = Row::from([("playerID", "newbie01"), ("teamID", "BOS")]);

        assert!(matches!(table.insert(row), Err(DatabaseError::InvalidRecord(_))));
    }

    #[test]
    fn test_insert_duplicate_key_is_engine_error() {
        let mut table = batting_table();
        let row = Row::from([
            ("playerID", "willite01"),
            ("teamID", "BOS"),
            ("yearID", "1960"),
            ("stint", "1"),
        ]);

        assert!(matches!(table.insert(row), Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn test_update_by_key_changes_only_given_field() {
        let mut table = batting_table();
        let key = key(["willite01", "BOS", "1960", "1"]);

        assert_eq!(table.update_by_key(&key, &Row::from([("H", "100")])).unwrap(), 1);

        let row = table.find_by_primary_key(&key, None).unwrap().unwrap();
        assert_eq!(
            row,
            Row::from([
                ("playerID", "willite01"),
                ("teamID", "BOS"),
                ("yearID", "1960"),
                ("stint", "1"),
                ("H", "100"),
            ])
        );
    }

    #[test]
    fn test_delete_by_key_twice() {
        let mut table = batting_table();
        let key = key(["willite01", "BOS", "1960", "1"]);

        assert_eq!(table.delete_by_key(&key).unwrap(), 1);
        assert_eq!(table.delete_by_key(&key).unwrap(), 0);
    }

    // Counts collapse to 0/1 by default; two rows changed here.
    #[test]
    fn test_template_mutations_report_collapsed_counts() {
        let mut table = batting_table();
        let bos = Template::from([("teamID", "BOS")]);

        assert_eq!(table.update_by_template(&bos, &Row::from([("H", "0")])).unwrap(), 1);
        assert_eq!(table.delete_by_template(&bos).unwrap(), 1);
        assert_eq!(table.delete_by_template(&bos).unwrap(), 0);
        assert_eq!(table.find_by_template(&Template::any(), None).unwrap().len(), 3);
    }

    #[test]
    fn test_template_mutations_report_exact_counts_when_enabled() {
        let mut table = batting_table().exact_counts(true);
        let bos = Template::from([("teamID", "BOS")]);

        assert_eq!(table.update_by_template(&bos, &Row::from([("H", "0")])).unwrap(), 2);
        assert_eq!(table.delete_by_template(&bos).unwrap(), 2);
    }

    #[test]
    fn test_changes_are_visible_on_returned_connection() {
        let mut table = batting_table();
        table
            .delete_by_template(&Template::from([("teamID", "BOS")]))
            .unwrap();

        let conn = table.into_connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM batting", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_file_backed_profile_opens_and_closes_connections() {
        let path = std::env::temp_dir().join(format!("tabletemplate-{}-rdb.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE people (id TEXT PRIMARY KEY, name TEXT);
                 INSERT INTO people VALUES ('1', 'Ted');",
            )
            .unwrap();
        }

        let info = RdbConnectInfo {
            database: path.display().to_string(),
            ..RdbConnectInfo::default()
        };
        let mut table = RdbDataTable::new("people", info, vec!["id".to_string()]);

        table.insert(Row::from([("id", "2"), ("name", "Babe")])).unwrap();
        let found = table.find_by_primary_key(&[Value::from("2")], Some(&["name"])).unwrap();
        assert_eq!(found, Some(Row::from([("name", "Babe")])));

        std::fs::remove_file(&path).unwrap();
    }

    #[derive(Debug)]
    struct RefusingFactory;

    impl ConnectionFactory for RefusingFactory {
        fn connect(&self, info: &RdbConnectInfo) -> Result<Connection, DatabaseError> {
            Err(DatabaseError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{} refused the connection", info.host),
            )))
        }
    }

    #[test]
    fn test_injected_factory_errors_propagate() {
        let table = RdbDataTable::new("batting", RdbConnectInfo::default(), key_columns())
            .with_factory(RefusingFactory);

        let err = table.find_by_template(&Template::any(), None).unwrap_err();
        assert_eq!(err.to_string(), "localhost refused the connection");
    }
}
