//! Relational backend session over a SQLx `AnyPool`.

use super::schema::TableSchema;
use super::statement::{self, Statement};
use crate::DatabasePool;
use async_trait::async_trait;
use gendao_config::SqlFlavor;
use gendao_core::{BackendSession, Capabilities, Filter, GendaoError, GendaoResult, Query, Row};
use parking_lot::RwLock;
use serde_json::{Map, Number, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Any, AnyPool, Column, Executor, Row as _, TypeInfo, ValueRef};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type SchemaCache = Arc<RwLock<HashMap<String, Arc<TableSchema>>>>;

/// [`BackendSession`] for PostgreSQL, MySQL and SQLite.
///
/// Uniqueness is enforced by the schema, so a plain insert is already an
/// atomic create. `insert_unless_exists` and `replace` run inside a SQLx
/// transaction.
///
/// Column catalogs are cached per table on first use. Call
/// [`SqlSession::forget_schema`] after altering a table.
#[derive(Debug, Clone)]
pub struct SqlSession {
    pool: AnyPool,
    flavor: SqlFlavor,
    schemas: SchemaCache,
}

impl SqlSession {
    /// Creates a session over an existing pool.
    #[must_use]
    pub fn new(pool: &DatabasePool) -> Self {
        Self::with_pool(pool.inner().clone(), pool.flavor())
    }

    /// Creates a session over a raw SQLx pool.
    #[must_use]
    pub fn with_pool(pool: AnyPool, flavor: SqlFlavor) -> Self {
        Self {
            pool,
            flavor,
            schemas: SchemaCache::default(),
        }
    }

    /// Returns the SQL flavor statements are rendered for.
    #[must_use]
    pub fn flavor(&self) -> SqlFlavor {
        self.flavor
    }

    /// Drops the cached column catalog of a table.
    pub fn forget_schema(&self, table: &str) {
        self.schemas.write().remove(table);
    }

    /// Returns the column catalog of `table`, reading it through `executor`
    /// on a cache miss. Missing tables are not cached.
    async fn schema<'c, E>(&self, executor: E, table: &str) -> GendaoResult<Arc<TableSchema>>
    where
        E: Executor<'c, Database = Any>,
    {
        if let Some(schema) = self.schemas.read().get(table) {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(TableSchema::load(executor, self.flavor, table).await?);
        if !schema.is_empty() {
            self.schemas.write().insert(table.to_string(), Arc::clone(&schema));
        }
        Ok(schema)
    }
}

fn row_columns(row: Row) -> GendaoResult<Map<String, Value>> {
    row.to_map()?
        .ok_or_else(|| GendaoError::translation("Cannot write a null row"))
}

fn bind(stmt: &Statement) -> sqlx::query::Query<'_, Any, AnyArguments<'_>> {
    stmt.binds.iter().fold(sqlx::query(&stmt.sql), |query, value| match value {
        // Statements render nulls as literals; kept for completeness.
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    })
}

async fn execute<'c, E>(executor: E, stmt: &Statement) -> GendaoResult<u64>
where
    E: Executor<'c, Database = Any>,
{
    debug!(sql = %stmt.sql, binds = stmt.binds.len(), "Executing statement");
    Ok(bind(stmt).execute(executor).await?.rows_affected())
}

async fn fetch<'c, E>(executor: E, stmt: &Statement) -> GendaoResult<Vec<AnyRow>>
where
    E: Executor<'c, Database = Any>,
{
    debug!(sql = %stmt.sql, binds = stmt.binds.len(), "Fetching rows");
    Ok(bind(stmt).fetch_all(executor).await?)
}

/// Decodes a driver row into column name -> value.
fn decode_row(row: &AnyRow, schema: &TableSchema) -> GendaoResult<Map<String, Value>> {
    let mut columns = Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            decode_value(row, index, &type_name)?
        };
        columns.insert(column.name().to_string(), schema.kind(column.name()).restore(value));
    }
    Ok(columns)
}

/// Decodes one non-null value by its `Any` type name.
fn decode_value(row: &AnyRow, index: usize, type_name: &str) -> GendaoResult<Value> {
    let value = match type_name {
        "BOOLEAN" | "BOOL" => Value::Bool(row.try_get::<bool, _>(index)?),
        "SMALLINT" => Value::from(row.try_get::<i16, _>(index)?),
        "INTEGER" | "INT" => Value::from(row.try_get::<i32, _>(index)?),
        "BIGINT" => Value::from(row.try_get::<i64, _>(index)?),
        "REAL" | "FLOAT" => float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" | "DOUBLE PRECISION" => float(row.try_get::<f64, _>(index)?),
        "BLOB" | "BYTEA" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn affected(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

#[async_trait]
impl BackendSession for SqlSession {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_paging: true,
            transactions: true,
            atomic_create: true,
        }
    }

    async fn insert(&self, table: &str, row: Row) -> GendaoResult<()> {
        let stmt = statement::insert(self.flavor, table, &row_columns(row)?)?;
        execute(&self.pool, &stmt).await?;
        Ok(())
    }

    async fn insert_unless_exists(&self, table: &str, filter: &Filter, row: Row) -> GendaoResult<bool> {
        let insert = statement::insert(self.flavor, table, &row_columns(row)?)?;
        let existing = statement::exists(self.flavor, table, filter, true)?;

        let mut tx = self.pool.begin().await?;
        if !fetch(&mut *tx, &existing).await?.is_empty() {
            tx.rollback().await?;
            return Ok(false);
        }
        execute(&mut *tx, &insert).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn replace(&self, table: &str, filter: &Filter, row: Row, upsert: bool) -> GendaoResult<usize> {
        let columns = row_columns(row)?;
        let existing = statement::exists(self.flavor, table, filter, true)?;

        let mut tx = self.pool.begin().await?;
        if fetch(&mut *tx, &existing).await?.is_empty() {
            if !upsert {
                tx.rollback().await?;
                return Ok(0);
            }
            execute(&mut *tx, &statement::insert(self.flavor, table, &columns)?).await?;
            tx.commit().await?;
            return Ok(1);
        }

        // Columns the new row leaves out are reset, not kept.
        let schema = self.schema(&mut *tx, table).await?;
        let update = statement::update(self.flavor, table, filter, &schema.complete(columns))?;
        let written = execute(&mut *tx, &update).await?;
        tx.commit().await?;
        // MySQL reports matched-but-unchanged rows as unaffected.
        Ok(affected(written).max(1))
    }

    async fn delete(&self, table: &str, filter: &Filter) -> GendaoResult<usize> {
        let stmt = statement::delete(self.flavor, table, filter)?;
        Ok(affected(execute(&self.pool, &stmt).await?))
    }

    async fn query(&self, table: &str, query: &Query) -> GendaoResult<Vec<Row>> {
        let schema = self.schema(&self.pool, table).await?;
        let stmt = statement::select(self.flavor, table, query, &schema)?;
        fetch(&self.pool, &stmt)
            .await?
            .iter()
            .map(|row| decode_row(row, &schema).map(Row::Map))
            .collect()
    }
}
