//! Common test infrastructure for DAO integration tests.

#![allow(dead_code)]

use gendao_config::DatabaseConfig;
use gendao_core::{GenericBo, GenericRowMapper, RowMapper};
use gendao_repository::{DatabasePool, DocumentStore, KeyedDao, SqlSession};
use serde_json::Value;
use std::sync::Arc;

pub const USERS_DDL: &str = r#"
    CREATE TABLE t_users (
        id TEXT PRIMARY KEY,
        val INTEGER,
        name TEXT,
        score REAL
    )
"#;

/// In-memory SQLite database.
///
/// A single connection keeps every statement on the same memory database.
pub async fn sqlite_pool() -> Arc<DatabasePool> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        min_connections: 1,
        max_connections: 1,
        ..DatabaseConfig::default()
    };
    Arc::new(DatabasePool::new(&config).await.expect("Failed to open SQLite"))
}

/// Runs raw DDL against the pool.
pub async fn execute(pool: &DatabasePool, sql: &str) {
    sqlx::query(sql)
        .execute(pool.inner())
        .await
        .expect("Failed to run statement");
}

/// SQL-backed DAO for the `users` storage, stored in `t_users`.
pub async fn sql_users_dao_with(mapper: Arc<dyn RowMapper>) -> (Arc<DatabasePool>, KeyedDao) {
    let pool = sqlite_pool().await;
    execute(&pool, USERS_DDL).await;
    let dao = KeyedDao::new(Arc::new(SqlSession::new(&pool)), mapper)
        .with_storage("users", ["id"])
        .with_table("users", "t_users");
    (pool, dao)
}

pub async fn sql_users_dao() -> (Arc<DatabasePool>, KeyedDao) {
    sql_users_dao_with(Arc::new(GenericRowMapper::new())).await
}

/// Document-backed DAO for the `users` collection.
pub fn document_users_dao(mapper: Arc<dyn RowMapper>) -> (Arc<DocumentStore>, KeyedDao) {
    let store = Arc::new(DocumentStore::new());
    let dao = KeyedDao::new(store.clone(), mapper).with_storage("users", ["id"]);
    (store, dao)
}

/// Builds a business object from a JSON literal.
pub fn bo(value: Value) -> GenericBo {
    GenericBo::try_from(value).expect("JSON object expected")
}
