use strum::Display;

use crate::{
    DatabaseError,
    core::types::Value,
    db::table::{
        FindOptions, check_field_list, check_new_values, row::Row, template::Template,
    },
};

/// The statement family, which decides whether the runner fetches or commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn is_mutation(self) -> bool {
        !matches!(self, StatementKind::Select)
    }
}

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub args: Vec<Value>,
}

fn is_plain(part: &str) -> bool {
    let mut chars = part.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_part(part: &str) -> Result<String, DatabaseError> {
    if part.is_empty() {
        return Err(DatabaseError::InvalidIdentifier(part.to_owned()));
    }
    if is_plain(part) {
        Ok(part.to_owned())
    } else {
        Ok(format!("\"{}\"", part.replace('"', "\"\"")))
    }
}

/// Renders a table name for SQL text.
///
/// Accepts `name` or `schema.name`. A part that is not a plain ASCII
/// identifier is double-quoted with embedded quotes doubled.
pub fn quote_identifier(name: &str) -> Result<String, DatabaseError> {
    let invalid = || DatabaseError::InvalidIdentifier(name.to_owned());

    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(only), None, _) => quote_part(only).map_err(|_| invalid()),
        (Some(schema), Some(table), None) => {
            let schema = quote_part(schema).map_err(|_| invalid())?;
            let table = quote_part(table).map_err(|_| invalid())?;
            Ok(format!("{schema}.{table}"))
        }
        _ => Err(invalid()),
    }
}

/// Renders a column name. Dots belong to the name, so `a.b` is one column.
fn quote_column(name: &str) -> Result<String, DatabaseError> {
    quote_part(name)
}

/// Turns a template into ` WHERE a=? AND b=?` and its arguments.
///
/// The empty template yields no clause at all.
pub fn template_to_where_clause(
    template: &Template,
) -> Result<Option<(String, Vec<Value>)>, DatabaseError> {
    if template.is_empty() {
        return Ok(None);
    }

    let mut terms = Vec::with_capacity(template.len());
    let mut args = Vec::with_capacity(template.len());
    for (column, value) in template.iter() {
        terms.push(format!("{}=?", quote_column(column)?));
        args.push(value.clone());
    }

    Ok(Some((format!(" WHERE {}", terms.join(" AND ")), args)))
}

fn push_where(
    sql: &mut String,
    args: &mut Vec<Value>,
    template: &Template,
) -> Result<(), DatabaseError> {
    if let Some((clause, where_args)) = template_to_where_clause(template)? {
        sql.push_str(&clause);
        args.extend(where_args);
    }
    Ok(())
}

pub fn create_select(
    table_name: &str,
    template: &Template,
    fields: Option<&[&str]>,
    options: &FindOptions,
) -> Result<SqlStatement, DatabaseError> {
    check_field_list(fields)?;
    let field_list = match fields {
        None => "*".to_string(),
        Some(fields) => fields
            .iter()
            .map(|field| quote_column(field))
            .collect::<Result<Vec<_>, _>>()?
            .join(","),
    };

    let mut sql = format!("SELECT {field_list} FROM {}", quote_identifier(table_name)?);
    let mut args = Vec::new();
    push_where(&mut sql, &mut args, template)?;

    if !options.order_by.is_empty() {
        let columns = options
            .order_by
            .iter()
            .map(|column| quote_column(column))
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(&format!(" ORDER BY {}", columns.join(",")));
    }

    // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
    match (options.limit, options.offset) {
        (None, None) => {}
        (limit, offset) => {
            sql.push_str(" LIMIT ?");
            args.push(Value::Int64(limit.map_or(-1, |l| l as i64)));
            if let Some(offset) = offset {
                sql.push_str(" OFFSET ?");
                args.push(Value::Int64(offset as i64));
            }
        }
    }

    Ok(SqlStatement {
        kind: StatementKind::Select,
        sql,
        args,
    })
}

pub fn create_insert(table_name: &str, row: &Row) -> Result<SqlStatement, DatabaseError> {
    if row.is_empty() {
        return Err(DatabaseError::InvalidRecord("record has no columns".to_string()));
    }

    let mut columns = Vec::with_capacity(row.len());
    let mut args = Vec::with_capacity(row.len());
    for (column, value) in row {
        columns.push(quote_column(column)?);
        args.push(value.clone());
    }

    let placeholders = vec!["?"; columns.len()].join(",");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_identifier(table_name)?,
        columns.join(",")
    );

    Ok(SqlStatement {
        kind: StatementKind::Insert,
        sql,
        args,
    })
}

/// `UPDATE t SET a=?,b=? WHERE ...`; SET arguments come before WHERE arguments.
pub fn create_update(
    table_name: &str,
    new_values: &Row,
    template: &Template,
) -> Result<SqlStatement, DatabaseError> {
    check_new_values(new_values)?;

    let mut terms = Vec::with_capacity(new_values.len());
    let mut args = Vec::with_capacity(new_values.len() + template.len());
    for (column, value) in new_values {
        terms.push(format!("{}=?", quote_column(column)?));
        args.push(value.clone());
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_identifier(table_name)?,
        terms.join(",")
    );
    push_where(&mut sql, &mut args, template)?;

    Ok(SqlStatement {
        kind: StatementKind::Update,
        sql,
        args,
    })
}

pub fn create_delete(table_name: &str, template: &Template) -> Result<SqlStatement, DatabaseError> {
    let mut sql = format!("DELETE FROM {}", quote_identifier(table_name)?);
    let mut args = Vec::new();
    push_where(&mut sql, &mut args, template)?;

    Ok(SqlStatement {
        kind: StatementKind::Delete,
        sql,
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_with_template() {
        let template = Template::from([("teamID", "BOS"), ("yearID", "1960")]);
        let stmt = create_select("batting", &template, None, &FindOptions::default()).unwrap();

        assert_eq!(stmt.sql, "SELECT * FROM batting WHERE teamID=? AND yearID=?");
        assert_eq!(stmt.args, vec![Value::from("BOS"), Value::from("1960")]);
        assert_eq!(stmt.kind, StatementKind::Select);
    }

    #[test]
    fn test_select_without_template_has_no_where() {
        let stmt = create_select(
            "lahman.batting",
            &Template::any(),
            Some(&["playerID", "H"]),
            &FindOptions::default(),
        )
        .unwrap();

        assert_eq!(stmt.sql, "SELECT playerID,H FROM lahman.batting");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_select_with_paging() {
        let template = Template::from([("teamID", "BOS")]);
        let options = FindOptions::default().order_by("yearID").limit(10).offset(20);
        let stmt = create_select("batting", &template, None, &options).unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT * FROM batting WHERE teamID=? ORDER BY yearID LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.args,
            vec![Value::from("BOS"), Value::Int64(10), Value::Int64(20)]
        );
    }

    #[test]
    fn test_select_offset_without_limit() {
        let options = FindOptions::default().offset(5);
        let stmt = create_select("batting", &Template::any(), None, &options).unwrap();

        assert_eq!(stmt.sql, "SELECT * FROM batting LIMIT ? OFFSET ?");
        assert_eq!(stmt.args, vec![Value::Int64(-1), Value::Int64(5)]);
    }

    #[test]
    fn test_insert_keeps_row_order() {
        let row = Row::from([("playerID", "willite01"), ("teamID", "BOS"), ("H", "98")]);
        let stmt = create_insert("batting", &row).unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO batting (playerID,teamID,H) VALUES (?,?,?)"
        );
        assert_eq!(
            stmt.args,
            vec![Value::from("willite01"), Value::from("BOS"), Value::from("98")]
        );
        assert!(stmt.kind.is_mutation());
    }

    #[test]
    fn test_update_set_args_precede_where_args() {
        let stmt = create_update(
            "batting",
            &Row::from([("H", "100"), ("HR", "30")]),
            &Template::from([("playerID", "willite01")]),
        )
        .unwrap();

        assert_eq!(stmt.sql, "UPDATE batting SET H=?,HR=? WHERE playerID=?");
        assert_eq!(
            stmt.args,
            vec![Value::from("100"), Value::from("30"), Value::from("willite01")]
        );
    }

    #[test]
    fn test_update_without_values_is_rejected() {
        let result = create_update("batting", &Row::new(), &Template::any());
        assert!(matches!(result, Err(DatabaseError::InvalidQuery(_))));
    }

    #[test]
    fn test_delete() {
        let stmt = create_delete("batting", &Template::from([("teamID", "BOS")])).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM batting WHERE teamID=?");
        assert_eq!(stmt.args, vec![Value::from("BOS")]);

        let all = create_delete("batting", &Template::any()).unwrap();
        assert_eq!(all.sql, "DELETE FROM batting");
    }

    #[test]
    fn test_values_never_reach_sql_text() {
        let template = Template::from([("playerID", "x' OR '1'='1")]);
        let stmt = create_select("batting", &template, None, &FindOptions::default()).unwrap();

        assert!(!stmt.sql.contains("'1'='1"));
        assert_eq!(stmt.args, vec![Value::from("x' OR '1'='1")]);
    }

    #[test]
    fn test_identifiers_are_quoted_when_not_plain() {
        assert_eq!(quote_identifier("batting").unwrap(), "batting");
        assert_eq!(quote_identifier("lahman.batting").unwrap(), "lahman.batting");
        assert_eq!(quote_identifier("_tmp1").unwrap(), "_tmp1");
        assert_eq!(quote_identifier("1batting").unwrap(), "\"1batting\"");
        assert_eq!(quote_identifier("my db.batting").unwrap(), "\"my db\".batting");
        assert_eq!(
            quote_identifier("batting\"; DROP TABLE x").unwrap(),
            "\"batting\"\"; DROP TABLE x\""
        );

        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("a.b.c").is_err());
        assert!(quote_identifier(".batting").is_err());
    }

    #[test]
    fn test_numeric_columns_are_quoted() {
        let stmt = create_select(
            "batting",
            &Template::from([("2B", "10")]),
            Some(&["playerID", "2B", "3B"]),
            &FindOptions::default(),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT playerID,\"2B\",\"3B\" FROM batting WHERE \"2B\"=?"
        );

        let insert = create_insert("batting", &Row::from([("lahman.H", "1")])).unwrap();
        assert_eq!(insert.sql, "INSERT INTO batting (\"lahman.H\") VALUES (?)");

        let delete = create_delete("batting", &Template::from([("teamID=teamID OR 1", "x")])).unwrap();
        assert_eq!(delete.sql, "DELETE FROM batting WHERE \"teamID=teamID OR 1\"=?");
    }

    #[test]
    fn test_empty_field_list_is_rejected() {
        let result = create_select("batting", &Template::any(), Some(&[]), &FindOptions::default());
        assert!(matches!(result, Err(DatabaseError::InvalidQuery(_))));
    }
}
