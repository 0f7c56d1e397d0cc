//! SQL statement rendering.
//!
//! Statements are rendered from canonical filters and column maps. Every
//! identifier is quoted for the target flavor and every value is bound, never
//! inlined. Only paging bounds and `NULL` are written as literals; an untyped
//! `NULL` literal lets the server infer the column type.

use super::schema::TableSchema;
use gendao_config::SqlFlavor;
use gendao_core::{Filter, GendaoError, GendaoResult, Query, SortOrder, ALL_COLUMNS};
use serde_json::{Map, Value};
use std::fmt::Write;

/// A rendered statement and its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

struct Builder {
    flavor: SqlFlavor,
    sql: String,
    binds: Vec<Value>,
}

impl Builder {
    fn new(flavor: SqlFlavor) -> Self {
        Self {
            flavor,
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    fn push_ident(&mut self, name: &str) -> GendaoResult<&mut Self> {
        let quoted = quote_ident(self.flavor, name)?;
        self.sql.push_str(&quoted);
        Ok(self)
    }

    fn push_bind(&mut self, value: Value) -> &mut Self {
        self.binds.push(value);
        if self.flavor.numbered_placeholders() {
            let _ = write!(self.sql, "${}", self.binds.len());
        } else {
            self.sql.push('?');
        }
        self
    }

    fn push_value(&mut self, value: &Value) -> &mut Self {
        if value.is_null() {
            self.push("NULL")
        } else {
            self.push_bind(value.clone())
        }
    }

    fn push_column(&mut self, name: &str, schema: &TableSchema) -> GendaoResult<&mut Self> {
        match schema.kind(name).cast_type(self.flavor) {
            Some(cast) => {
                self.push("CAST(").push_ident(name)?.push(" AS ").push(cast).push(") AS ");
                self.push_ident(name)
            }
            None => self.push_ident(name),
        }
    }

    fn push_where(&mut self, filter: &Filter) -> GendaoResult<()> {
        for (i, (column, expected)) in filter.iter().enumerate() {
            self.push(if i == 0 { " WHERE " } else { " AND " });
            self.push_ident(column)?;
            if expected.is_null() {
                self.push(" IS NULL");
            } else {
                self.push(" = ").push_bind(expected.clone());
            }
        }
        Ok(())
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            binds: self.binds,
        }
    }
}

/// Quotes an identifier for `flavor`.
pub fn quote_ident(flavor: SqlFlavor, name: &str) -> GendaoResult<String> {
    if name.is_empty() {
        return Err(GendaoError::translation("Empty SQL identifier"));
    }
    let quote = match flavor {
        SqlFlavor::MySql => '`',
        SqlFlavor::Postgres | SqlFlavor::Sqlite => '"',
    };
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(quote);
    for c in name.chars() {
        if c == quote {
            quoted.push(quote);
        }
        quoted.push(c);
    }
    quoted.push(quote);
    Ok(quoted)
}

/// `SELECT` for a query.
///
/// Columns the `Any` driver cannot decode are cast as described by `schema`;
/// selecting all columns then lists them explicitly.
pub fn select(
    flavor: SqlFlavor,
    table: &str,
    query: &Query,
    schema: &TableSchema,
) -> GendaoResult<Statement> {
    let mut b = Builder::new(flavor);
    b.push("SELECT ");
    let all = query.columns.is_empty() || query.columns.iter().any(|c| c == ALL_COLUMNS);
    if all && !schema.needs_casts() {
        b.push("*");
    } else {
        let columns: Vec<&str> = if all {
            schema.names().collect()
        } else {
            query.columns.iter().map(String::as_str).collect()
        };
        for (i, column) in columns.into_iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_column(column, schema)?;
        }
    }
    b.push(" FROM ").push_ident(table)?;
    b.push_where(&query.filter)?;

    for (i, (column, order)) in query.sorting.fields().iter().enumerate() {
        b.push(if i == 0 { " ORDER BY " } else { ", " });
        b.push_ident(column)?;
        b.push(match order {
            SortOrder::Ascending => " ASC",
            SortOrder::Descending => " DESC",
        });
    }

    match (query.limit, query.offset) {
        (Some(limit), 0) => {
            let _ = write!(b.sql, " LIMIT {}", limit);
        }
        (Some(limit), offset) => {
            let _ = write!(b.sql, " LIMIT {} OFFSET {}", limit, offset);
        }
        (None, 0) => {}
        (None, offset) => {
            // OFFSET alone is not valid everywhere.
            let _ = match flavor {
                SqlFlavor::MySql => write!(b.sql, " LIMIT 18446744073709551615 OFFSET {}", offset),
                SqlFlavor::Sqlite => write!(b.sql, " LIMIT -1 OFFSET {}", offset),
                SqlFlavor::Postgres => write!(b.sql, " OFFSET {}", offset),
            };
        }
    }

    Ok(b.finish())
}

/// `SELECT 1` for the first row matching `filter`, optionally locking it.
pub fn exists(flavor: SqlFlavor, table: &str, filter: &Filter, lock: bool) -> GendaoResult<Statement> {
    let mut b = Builder::new(flavor);
    b.push("SELECT 1 FROM ").push_ident(table)?;
    b.push_where(filter)?;
    b.push(" LIMIT 1");
    if lock && flavor != SqlFlavor::Sqlite {
        b.push(" FOR UPDATE");
    }
    Ok(b.finish())
}

/// `INSERT` of one row.
pub fn insert(flavor: SqlFlavor, table: &str, row: &Map<String, Value>) -> GendaoResult<Statement> {
    if row.is_empty() {
        return Err(GendaoError::translation(format!("Nothing to insert into '{}'", table)));
    }
    let mut b = Builder::new(flavor);
    b.push("INSERT INTO ").push_ident(table)?.push(" (");
    for (i, column) in row.keys().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(column)?;
    }
    b.push(") VALUES (");
    for (i, value) in row.values().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_value(value);
    }
    b.push(")");
    Ok(b.finish())
}

/// `UPDATE` setting every column of `row` on the rows matching `filter`.
pub fn update(flavor: SqlFlavor, table: &str, filter: &Filter, row: &Map<String, Value>) -> GendaoResult<Statement> {
    if row.is_empty() {
        return Err(GendaoError::translation(format!("Nothing to update in '{}'", table)));
    }
    let mut b = Builder::new(flavor);
    b.push("UPDATE ").push_ident(table)?.push(" SET ");
    for (i, (column, value)) in row.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(column)?.push(" = ").push_value(value);
    }
    b.push_where(filter)?;
    Ok(b.finish())
}

/// `DELETE` of the rows matching `filter`.
pub fn delete(flavor: SqlFlavor, table: &str, filter: &Filter) -> GendaoResult<Statement> {
    let mut b = Builder::new(flavor);
    b.push("DELETE FROM ").push_ident(table)?;
    b.push_where(filter)?;
    Ok(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gendao_core::Sorting;
    use serde_json::json;

    fn plain(flavor: SqlFlavor) -> TableSchema {
        TableSchema::unknown(flavor)
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident(SqlFlavor::MySql, "name").unwrap(), "`name`");
        assert_eq!(quote_ident(SqlFlavor::Postgres, "we\"ird").unwrap(), "\"we\"\"ird\"");
        assert!(quote_ident(SqlFlavor::Sqlite, "").unwrap_err().is_translation());
    }

    #[test]
    fn test_select_with_everything() {
        let query = Query::new(Filter::new().with("id", "a").with("deleted_at", Value::Null))
            .sorted_by(Sorting::new().asc("name").desc("age"))
            .columns(vec!["id".to_string(), "name".to_string()])
            .page(20, Some(10));
        let stmt = select(SqlFlavor::Postgres, "users", &query, &plain(SqlFlavor::Postgres)).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"name\" FROM \"users\" WHERE \"id\" = $1 AND \"deleted_at\" IS NULL \
             ORDER BY \"name\" ASC, \"age\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.binds, vec![json!("a")]);
    }

    #[test]
    fn test_select_all_columns() {
        let query = Query::default().columns(vec!["*".to_string()]);
        let stmt = select(SqlFlavor::Sqlite, "t", &query, &plain(SqlFlavor::Sqlite)).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"t\"");
        assert!(stmt.binds.is_empty());
    }

    #[test]
    fn test_offset_without_limit() {
        let query = Query::default().page(5, None);
        assert!(select(SqlFlavor::MySql, "t", &query, &plain(SqlFlavor::MySql))
            .unwrap()
            .sql
            .ends_with("LIMIT 18446744073709551615 OFFSET 5"));
        assert!(select(SqlFlavor::Sqlite, "t", &query, &plain(SqlFlavor::Sqlite))
            .unwrap()
            .sql
            .ends_with("LIMIT -1 OFFSET 5"));
        assert!(select(SqlFlavor::Postgres, "t", &query, &plain(SqlFlavor::Postgres))
            .unwrap()
            .sql
            .ends_with("\" OFFSET 5"));
    }

    #[test]
    fn test_select_casts_undecodable_columns() {
        let schema = TableSchema::from_declared(
            SqlFlavor::Sqlite,
            [("id", "TEXT"), ("active", "BOOLEAN"), ("amount", "NUMERIC")],
        );
        let stmt = select(SqlFlavor::Sqlite, "t", &Query::default(), &schema).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"id\", CAST(\"active\" AS INTEGER) AS \"active\", \
             CAST(\"amount\" AS REAL) AS \"amount\" FROM \"t\""
        );

        let query = Query::default().columns(vec!["amount".to_string()]);
        let schema = TableSchema::from_declared(SqlFlavor::Postgres, [("amount", "numeric")]);
        assert_eq!(
            select(SqlFlavor::Postgres, "t", &query, &schema).unwrap().sql,
            "SELECT CAST(\"amount\" AS DOUBLE PRECISION) AS \"amount\" FROM \"t\""
        );

        // Nothing to cast keeps the wildcard.
        let schema = TableSchema::from_declared(SqlFlavor::Sqlite, [("id", "TEXT")]);
        assert_eq!(
            select(SqlFlavor::Sqlite, "t", &Query::default(), &schema).unwrap().sql,
            "SELECT * FROM \"t\""
        );
    }

    #[test]
    fn test_exists() {
        let filter = Filter::new().with("id", 1);
        assert_eq!(
            exists(SqlFlavor::Postgres, "t", &filter, true).unwrap().sql,
            "SELECT 1 FROM \"t\" WHERE \"id\" = $1 LIMIT 1 FOR UPDATE"
        );
        assert_eq!(
            exists(SqlFlavor::Sqlite, "t", &filter, true).unwrap().sql,
            "SELECT 1 FROM \"t\" WHERE \"id\" = ? LIMIT 1"
        );
    }

    #[test]
    fn test_null_values_are_untyped_literals() {
        let row = map(json!({"id": "x", "val": null, "name": "n"}));
        let stmt = insert(SqlFlavor::Postgres, "users", &row).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"users\" (\"id\", \"val\", \"name\") VALUES ($1, NULL, $2)"
        );
        assert_eq!(stmt.binds, vec![json!("x"), json!("n")]);

        let stmt = update(SqlFlavor::Postgres, "users", &Filter::new().with("id", "x"), &row).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"id\" = $1, \"val\" = NULL, \"name\" = $2 WHERE \"id\" = $3"
        );
        assert!(stmt.binds.iter().all(|v| !v.is_null()));
    }

    #[test]
    fn test_insert() {
        let stmt = insert(SqlFlavor::MySql, "users", &map(json!({"id": "a", "val": 1}))).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO `users` (`id`, `val`) VALUES (?, ?)");
        assert_eq!(stmt.binds, vec![json!("a"), json!(1)]);
        assert!(insert(SqlFlavor::MySql, "users", &Map::new()).unwrap_err().is_translation());
    }

    #[test]
    fn test_update_and_delete() {
        let filter = Filter::new().with("id", "a");
        let stmt = update(SqlFlavor::Postgres, "users", &filter, &map(json!({"id": "a", "val": 2}))).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"id\" = $1, \"val\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(stmt.binds.len(), 3);

        let stmt = delete(SqlFlavor::Sqlite, "users", &Filter::new()).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"users\"");
    }
}
