//! Integration tests for the SQL backend, run against SQLite.

mod common;

use common::{bo, execute, sql_users_dao, sql_users_dao_with};
use gendao_config::DatabaseConfig;
use gendao_core::{FilterInput, GenericDao, GenericRowMapper, SortingInput, TranslationTable};
use gendao_repository::{DatabasePool, KeyedDao, SqlSession};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn ids(bos: &[gendao_core::GenericBo]) -> Vec<String> {
    bos.iter().map(|b| b.get_attr::<String>("id").unwrap()).collect()
}

async fn seed(dao: &KeyedDao) {
    for (id, val, name) in [("u1", 30, "carol"), ("u2", 10, "alice"), ("u3", 20, "bob"), ("u4", 40, "dave")] {
        assert_ok!(dao.create("users", &bo(json!({"id": id, "val": val, "name": name}))).await);
    }
}

#[tokio::test]
async fn test_create_then_duplicate() {
    let (_pool, dao) = sql_users_dao().await;
    let user = bo(json!({"id": "u1", "val": 1, "name": "alice"}));

    assert_eq!(dao.create("users", &user).await.unwrap(), 1);
    let err = assert_err!(dao.create("users", &user).await);
    assert!(err.is_duplicate());
}

#[tokio::test]
async fn test_create_then_duplicate_in_tx_mode() {
    let (_pool, dao) = sql_users_dao().await;
    dao.enable_tx_mode(true);
    assert!(dao.tx_mode());
    let user = bo(json!({"id": "u1", "val": 1}));

    assert_eq!(dao.create("users", &user).await.unwrap(), 1);
    let err = assert_err!(dao.create("users", &user).await);
    assert!(err.is_duplicate());

    // The rejected create must not have left a transaction open.
    assert_eq!(dao.create("users", &bo(json!({"id": "u2"}))).await.unwrap(), 1);
}

#[tokio::test]
async fn test_fetch_one_round_trip() {
    let (_pool, dao) = sql_users_dao().await;
    let user = bo(json!({"id": "u1", "val": 7, "name": "alice", "score": 2.5}));
    assert_ok!(dao.create("users", &user).await);

    let fetched = dao
        .fetch_one("users", dao.create_filter("users", &user).unwrap().into())
        .await
        .unwrap()
        .expect("row should exist");
    assert_eq!(fetched.get_attr::<String>("id").unwrap(), "u1");
    assert_eq!(fetched.get_attr::<i64>("val").unwrap(), 7);
    assert_eq!(fetched.get_attr::<String>("name").unwrap(), "alice");
    assert!((fetched.get_attr::<f64>("score").unwrap() - 2.5).abs() < f64::EPSILON);

    let missing = dao.fetch_one("users", json!({"id": "nobody"}).into()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_update_existing_and_missing() {
    let (_pool, dao) = sql_users_dao().await;
    assert_ok!(dao.create("users", &bo(json!({"id": "u1", "val": 1, "name": "alice"}))).await);

    let changed = bo(json!({"id": "u1", "val": 2, "name": "alice"}));
    assert_eq!(dao.update("users", &changed).await.unwrap(), 1);
    // Unchanged values still count as a match.
    assert_eq!(dao.update("users", &changed).await.unwrap(), 1);

    let fetched = dao.fetch_one("users", json!({"id": "u1"}).into()).await.unwrap().unwrap();
    assert_eq!(fetched.get_attr::<i64>("val").unwrap(), 2);

    let ghost = bo(json!({"id": "ghost", "val": 9}));
    assert_eq!(dao.update("users", &ghost).await.unwrap(), 0);
    assert!(dao.fetch_one("users", json!({"id": "ghost"}).into()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_inserts_then_replaces() {
    let (_pool, dao) = sql_users_dao().await;

    assert_eq!(dao.save("users", &bo(json!({"id": "u1", "val": 1, "name": "alice"}))).await.unwrap(), 1);
    assert_eq!(dao.save("users", &bo(json!({"id": "u1", "val": 5, "name": null}))).await.unwrap(), 1);

    let all = dao.fetch_many("users", None, None, 0, 0).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get_attr::<i64>("val").unwrap(), 5);
    assert_eq!(all[0].get_raw("name"), Some(&json!(null)));
}

#[tokio::test]
async fn test_save_drops_omitted_attributes() {
    let (_pool, dao) = sql_users_dao().await;
    assert_ok!(dao.create("users", &bo(json!({"id": "a", "val": 1, "name": "alice", "score": 1.5}))).await);

    assert_eq!(dao.save("users", &bo(json!({"id": "a", "val": 2}))).await.unwrap(), 1);

    let fetched = dao.fetch_one("users", json!({"id": "a"}).into()).await.unwrap().unwrap();
    assert_eq!(fetched.get_attr::<i64>("val").unwrap(), 2);
    assert_eq!(fetched.get_raw("name"), Some(&json!(null)));
    assert_eq!(fetched.get_raw("score"), Some(&json!(null)));
}

#[tokio::test]
async fn test_update_drops_omitted_attributes() {
    let (_pool, dao) = sql_users_dao().await;
    assert_ok!(dao.create("users", &bo(json!({"id": "a", "val": 1, "name": "alice"}))).await);

    assert_eq!(dao.update("users", &bo(json!({"id": "a", "name": "alicia"}))).await.unwrap(), 1);

    let fetched = dao.fetch_one("users", json!({"id": "a"}).into()).await.unwrap().unwrap();
    assert_eq!(fetched.get_attr::<String>("name").unwrap(), "alicia");
    assert_eq!(fetched.get_raw("val"), Some(&json!(null)));
}

#[tokio::test]
async fn test_null_attributes_are_written_as_null() {
    let (_pool, dao) = sql_users_dao().await;
    assert_ok!(dao.create("users", &bo(json!({"id": "a", "val": null, "score": null}))).await);
    assert_eq!(dao.save("users", &bo(json!({"id": "a", "val": 3, "score": null}))).await.unwrap(), 1);

    let unscored = dao
        .fetch_many("users", Some(json!({"score": null}).into()), None, 0, 0)
        .await
        .unwrap();
    assert_eq!(ids(&unscored), vec!["a"]);
    assert_eq!(unscored[0].get_attr::<i64>("val").unwrap(), 3);
}

#[tokio::test]
async fn test_boolean_and_numeric_columns_round_trip() {
    let pool = common::sqlite_pool().await;
    execute(&pool, "CREATE TABLE t_ledger (id TEXT PRIMARY KEY, active BOOLEAN, amount NUMERIC, seen DATETIME)").await;
    let dao = KeyedDao::new(Arc::new(SqlSession::new(&pool)), Arc::new(GenericRowMapper::new()))
        .with_storage("ledger", ["id"])
        .with_table("ledger", "t_ledger");

    assert_ok!(dao.create("ledger", &bo(json!({"id": "a", "active": true, "amount": 5}))).await);
    assert_ok!(dao.create("ledger", &bo(json!({"id": "b", "active": false, "amount": 2.5, "seen": "2024-01-02 03:04:05"}))).await);

    let a = dao.fetch_one("ledger", json!({"id": "a"}).into()).await.unwrap().unwrap();
    assert_eq!(a.get_raw("active"), Some(&json!(true)));
    assert_eq!(a.get_raw("amount"), Some(&json!(5)));
    assert_eq!(a.get_raw("seen"), Some(&json!(null)));

    let b = dao.fetch_one("ledger", json!({"id": "b"}).into()).await.unwrap().unwrap();
    assert_eq!(b.get_raw("active"), Some(&json!(false)));
    assert_eq!(b.get_raw("amount"), Some(&json!(2.5)));
    assert_eq!(b.get_attr::<String>("seen").unwrap(), "2024-01-02 03:04:05");

    let sorted = dao
        .fetch_many("ledger", None, Some(json!({"amount": 1}).into()), 0, 0)
        .await
        .unwrap();
    assert_eq!(ids(&sorted), vec!["b", "a"]);
}

#[tokio::test]
async fn test_delete_twice() {
    let (_pool, dao) = sql_users_dao().await;
    let user = bo(json!({"id": "u1", "val": 1}));
    assert_ok!(dao.create("users", &user).await);

    assert_eq!(dao.delete("users", &user).await.unwrap(), 1);
    assert_eq!(dao.delete("users", &user).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_many_counts_rows() {
    let (_pool, dao) = sql_users_dao().await;
    seed(&dao).await;

    assert_eq!(dao.delete_many("users", json!({"name": "nobody"}).into()).await.unwrap(), 0);
    assert_eq!(dao.delete_many("users", FilterInput::from(r#"{"val": 20}"#)).await.unwrap(), 1);
    // An empty filter matches every row.
    assert_eq!(dao.delete_many("users", json!({}).into()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_fetch_many_sorting_and_paging() {
    let (_pool, dao) = sql_users_dao().await;
    seed(&dao).await;

    let sorted = dao
        .fetch_many("users", None, Some(SortingInput::from(r#"{"val": 1}"#)), 0, -1)
        .await
        .unwrap();
    assert_eq!(ids(&sorted), vec!["u2", "u3", "u1", "u4"]);

    let page = dao
        .fetch_many("users", None, Some(json!({"val": "desc"}).into()), 1, 2)
        .await
        .unwrap();
    assert_eq!(ids(&page), vec!["u1", "u3"]);

    let tail = dao
        .fetch_many("users", None, Some(json!({"val": 1}).into()), 3, 0)
        .await
        .unwrap();
    assert_eq!(ids(&tail), vec!["u4"]);

    let past_end = dao
        .fetch_many("users", None, Some(json!({"val": 1}).into()), 10, 5)
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_fetch_many_filters() {
    let (_pool, dao) = sql_users_dao().await;
    seed(&dao).await;
    assert_ok!(dao.create("users", &bo(json!({"id": "u5", "val": 20}))).await);

    let by_text = dao
        .fetch_many("users", Some(FilterInput::from(r#"{"val": 20}"#)), Some(json!({"id": 1}).into()), 0, 0)
        .await
        .unwrap();
    assert_eq!(ids(&by_text), vec!["u3", "u5"]);

    let by_bytes = dao
        .fetch_many("users", Some(FilterInput::from(br#"{"name": "bob"}"#.to_vec())), None, 0, 0)
        .await
        .unwrap();
    assert_eq!(ids(&by_bytes), vec!["u3"]);

    let unnamed = dao
        .fetch_many("users", Some(json!({"name": null}).into()), None, 0, 0)
        .await
        .unwrap();
    assert_eq!(ids(&unnamed), vec!["u5"]);
}

#[tokio::test]
async fn test_malformed_filter_is_rejected() {
    let (_pool, dao) = sql_users_dao().await;

    let err = assert_err!(dao.fetch_one("users", FilterInput::from("[1, 2]")).await);
    assert!(err.is_translation());
    assert_err!(dao.fetch_many("users", None, Some(json!({"val": "sideways"}).into()), 0, 0).await);
}

#[tokio::test]
async fn test_mapper_translates_names() {
    let to_col: TranslationTable = HashMap::from([(
        "users".to_string(),
        HashMap::from([("userId".to_string(), "id".to_string()), ("displayName".to_string(), "name".to_string())]),
    )]);
    let to_field: TranslationTable = HashMap::from([(
        "*".to_string(),
        HashMap::from([("id".to_string(), "userId".to_string()), ("name".to_string(), "displayName".to_string())]),
    )]);
    let mapper = GenericRowMapper::new()
        .with_gbo_field_to_col_name(to_col)
        .with_col_name_to_gbo_field(to_field)
        .with_columns("users", vec!["id".to_string(), "name".to_string()]);
    let (_pool, dao) = sql_users_dao_with(Arc::new(mapper)).await;

    let user = bo(json!({"userId": "u1", "displayName": "alice", "val": 3}));
    assert_eq!(dao.create("users", &user).await.unwrap(), 1);

    let fetched = dao.fetch_one("users", json!({"id": "u1"}).into()).await.unwrap().unwrap();
    assert_eq!(fetched.get_attr::<String>("userId").unwrap(), "u1");
    assert_eq!(fetched.get_attr::<String>("displayName").unwrap(), "alice");
    // Only the configured columns are selected.
    assert!(!fetched.contains_attr("val"));
}

#[tokio::test]
async fn test_file_database_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gendao.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        min_connections: 1,
        max_connections: 2,
        ..DatabaseConfig::default()
    };

    {
        let pool = Arc::new(DatabasePool::new(&config).await.unwrap());
        assert_ok!(pool.health_check().await);
        execute(&pool, common::USERS_DDL).await;
        let dao = KeyedDao::new(Arc::new(SqlSession::new(&pool)), Arc::new(GenericRowMapper::new()))
            .with_storage("users", ["id"])
            .with_table("users", "t_users");
        assert_ok!(dao.create("users", &bo(json!({"id": "kept", "val": 1}))).await);
        pool.close().await;
    }

    let pool = DatabasePool::new(&config).await.unwrap();
    let dao = KeyedDao::new(Arc::new(SqlSession::new(&pool)), Arc::new(GenericRowMapper::new()))
        .with_storage("users", ["id"])
        .with_table("users", "t_users");
    let fetched = dao.fetch_one("users", json!({"id": "kept"}).into()).await.unwrap();
    assert!(fetched.is_some());
}
