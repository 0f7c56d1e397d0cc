//! Table column discovery.
//!
//! The SQLx `Any` driver only decodes a handful of portable types. Columns of
//! other declared types (SQLite `BOOLEAN`/`NUMERIC`, PostgreSQL `numeric`,
//! `jsonb`, timestamps, ...) are read through a `CAST` and turned back into
//! the closest JSON value afterwards.

use gendao_config::SqlFlavor;
use gendao_core::GendaoResult;
use serde_json::{Map, Number, Value};
use sqlx::{Any, Executor, Row as _};
use tracing::debug;

/// How a column travels through the `Any` driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Decoded as-is.
    Native,
    /// Read as an integer, restored to a JSON bool.
    Bool,
    /// Read as a double, integral values restored to JSON integers.
    Decimal,
    /// Read as text, restored to the parsed JSON value.
    Json,
    /// Read as text.
    Text,
}

impl ColumnKind {
    /// Classifies a declared column type as reported by the catalog.
    pub fn classify(flavor: SqlFlavor, declared: &str) -> Self {
        let declared = declared.trim().to_ascii_uppercase();
        match flavor {
            SqlFlavor::Sqlite => classify_sqlite(&declared),
            SqlFlavor::Postgres => match declared.as_str() {
                "BOOLEAN" | "SMALLINT" | "INTEGER" | "BIGINT" | "REAL" | "DOUBLE PRECISION" | "TEXT"
                | "CHARACTER VARYING" | "CHARACTER" | "BYTEA" => Self::Native,
                "NUMERIC" => Self::Decimal,
                "JSON" | "JSONB" => Self::Json,
                _ => Self::Text,
            },
            SqlFlavor::MySql => match declared.as_str() {
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "FLOAT" | "DOUBLE" | "CHAR"
                | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "BINARY" | "VARBINARY"
                | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => Self::Native,
                "DECIMAL" => Self::Decimal,
                "JSON" => Self::Json,
                _ => Self::Text,
            },
        }
    }

    /// SQL type the column is cast to when selected, if any.
    pub fn cast_type(self, flavor: SqlFlavor) -> Option<&'static str> {
        match (self, flavor) {
            (Self::Native, _) => None,
            (Self::Bool, SqlFlavor::Sqlite) => Some("INTEGER"),
            (Self::Bool, _) => None,
            (Self::Decimal, SqlFlavor::Sqlite) => Some("REAL"),
            (Self::Decimal, SqlFlavor::Postgres) => Some("DOUBLE PRECISION"),
            (Self::Decimal, SqlFlavor::MySql) => Some("DOUBLE"),
            (Self::Json | Self::Text, SqlFlavor::MySql) => Some("CHAR"),
            (Self::Json | Self::Text, _) => Some("TEXT"),
        }
    }

    /// Turns a decoded value back into the column's natural JSON shape.
    pub fn restore(self, value: Value) -> Value {
        match (self, value) {
            (Self::Bool, Value::Number(n)) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            (Self::Decimal, Value::Number(n)) => integral(&n).map_or(Value::Number(n), Value::from),
            (Self::Json, Value::String(text)) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            (_, value) => value,
        }
    }
}

/// Mirrors how SQLx maps SQLite declared types: anything it has no `Any`
/// mapping for gets a cast.
fn classify_sqlite(declared: &str) -> ColumnKind {
    match declared {
        "" => ColumnKind::Native,
        "BOOLEAN" | "BOOL" => ColumnKind::Bool,
        "DATE" | "TIME" | "DATETIME" | "TIMESTAMP" => ColumnKind::Text,
        "JSON" | "JSONB" => ColumnKind::Json,
        t if t.contains("INT") => ColumnKind::Native,
        t if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") || t.contains("BLOB") => {
            ColumnKind::Native
        }
        t if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") => ColumnKind::Native,
        t if t.contains("NUM") || t.contains("DEC") => ColumnKind::Decimal,
        _ => ColumnKind::Text,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(n: &Number) -> Option<i64> {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if n.is_i64() || n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() < EXACT).then(|| f as i64)
}

/// Columns of one table, in declaration order.
#[derive(Debug, Clone)]
pub struct TableSchema {
    flavor: SqlFlavor,
    columns: Vec<(String, ColumnKind)>,
}

impl TableSchema {
    /// Builds a schema from `(name, declared type)` pairs.
    pub fn from_declared<I, N, T>(flavor: SqlFlavor, columns: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        Self {
            flavor,
            columns: columns
                .into_iter()
                .map(|(name, declared)| (name.into(), ColumnKind::classify(flavor, declared.as_ref())))
                .collect(),
        }
    }

    /// A schema that knows no columns; every column decodes natively.
    pub fn unknown(flavor: SqlFlavor) -> Self {
        Self {
            flavor,
            columns: Vec::new(),
        }
    }

    /// Reads the column catalog of `table`.
    ///
    /// A missing table yields an empty schema.
    pub async fn load<'c, E>(executor: E, flavor: SqlFlavor, table: &str) -> GendaoResult<Self>
    where
        E: Executor<'c, Database = Any>,
    {
        let sql = match flavor {
            SqlFlavor::Sqlite => "SELECT CAST(name AS TEXT), CAST(type AS TEXT) FROM pragma_table_info(?)",
            SqlFlavor::Postgres => {
                "SELECT CAST(column_name AS TEXT), CAST(data_type AS TEXT) FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position"
            }
            SqlFlavor::MySql => {
                "SELECT CAST(column_name AS CHAR), CAST(data_type AS CHAR) FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? ORDER BY ordinal_position"
            }
        };
        let rows = sqlx::query(sql).bind(table.to_string()).fetch_all(executor).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get(0)?;
            let declared: Option<String> = row.try_get(1)?;
            columns.push((name, declared.unwrap_or_default()));
        }
        debug!(table, columns = columns.len(), "Loaded table schema");
        Ok(Self::from_declared(flavor, columns))
    }

    /// Whether no column is known.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Whether selecting every column needs at least one cast.
    pub fn needs_casts(&self) -> bool {
        self.columns
            .iter()
            .any(|(_, kind)| kind.cast_type(self.flavor).is_some())
    }

    /// Kind of a column; unknown columns are native.
    pub fn kind(&self, column: &str) -> ColumnKind {
        self.columns
            .iter()
            .find(|(name, _)| self.same_name(name, column))
            .map_or(ColumnKind::Native, |(_, kind)| *kind)
    }

    /// Adds a `null` for every known column `row` does not set, so that
    /// writing it replaces the stored row instead of merging into it.
    pub fn complete(&self, mut row: Map<String, Value>) -> Map<String, Value> {
        for (name, _) in &self.columns {
            if !row.keys().any(|key| self.same_name(key, name)) {
                row.insert(name.clone(), Value::Null);
            }
        }
        row
    }

    fn same_name(&self, a: &str, b: &str) -> bool {
        match self.flavor {
            SqlFlavor::Postgres => a == b,
            SqlFlavor::MySql | SqlFlavor::Sqlite => a.eq_ignore_ascii_case(b),
        }
    }
}
