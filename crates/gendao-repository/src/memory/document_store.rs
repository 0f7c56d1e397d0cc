//! In-memory document store.

use async_trait::async_trait;
use gendao_core::{sort_rows, BackendSession, Capabilities, Filter, GendaoError, GendaoResult, Query, Row, ALL_COLUMNS};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

type Document = Map<String, Value>;

/// Schema-free [`BackendSession`] keeping JSON documents per collection.
///
/// Documents are stored encoded and returned as [`Row::Bytes`] in insertion
/// order unless sorted. There are no unique indexes: duplicates are only
/// prevented through `insert_unless_exists`, which checks and writes under
/// one write lock.
#[derive(Debug, Default)]
pub struct DocumentStore {
    collections: RwLock<HashMap<String, Vec<Vec<u8>>>>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, Vec::len)
    }

    /// Names of the non-empty collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

fn encode(row: Row) -> GendaoResult<Vec<u8>> {
    let document = row
        .to_map()?
        .ok_or_else(|| GendaoError::translation("Cannot store a null document"))?;
    Ok(serde_json::to_vec(&document)?)
}

fn decode(bytes: &[u8]) -> GendaoResult<Document> {
    Ok(serde_json::from_slice(bytes)?)
}

fn project(document: Document, columns: &[String]) -> Document {
    if columns.is_empty() || columns.iter().any(|c| c == ALL_COLUMNS) {
        return document;
    }
    document
        .into_iter()
        .filter(|(key, _)| columns.contains(key))
        .collect()
}

#[async_trait]
impl BackendSession for DocumentStore {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_paging: true,
            transactions: true,
            atomic_create: false,
        }
    }

    async fn insert(&self, table: &str, row: Row) -> GendaoResult<()> {
        let bytes = encode(row)?;
        self.collections.write().entry(table.to_string()).or_default().push(bytes);
        Ok(())
    }

    async fn insert_unless_exists(&self, table: &str, filter: &Filter, row: Row) -> GendaoResult<bool> {
        let bytes = encode(row)?;
        let mut collections = self.collections.write();
        let docs = collections.entry(table.to_string()).or_default();
        for existing in docs.iter() {
            if filter.matches(&decode(existing)?) {
                debug!(table, "Document already exists");
                return Ok(false);
            }
        }
        docs.push(bytes);
        Ok(true)
    }

    async fn replace(&self, table: &str, filter: &Filter, row: Row, upsert: bool) -> GendaoResult<usize> {
        let bytes = encode(row)?;
        let mut collections = self.collections.write();
        let docs = collections.entry(table.to_string()).or_default();

        let mut matched = Vec::new();
        for (index, existing) in docs.iter().enumerate() {
            if filter.matches(&decode(existing)?) {
                matched.push(index);
            }
        }
        for &index in &matched {
            docs[index].clone_from(&bytes);
        }

        let mut replaced = matched.len();
        if replaced == 0 && upsert {
            docs.push(bytes);
            replaced = 1;
        }
        Ok(replaced)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> GendaoResult<usize> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(table) else {
            return Ok(0);
        };

        let total = docs.len();
        let mut kept = Vec::with_capacity(total);
        for bytes in docs.iter() {
            if !filter.matches(&decode(bytes)?) {
                kept.push(bytes.clone());
            }
        }
        *docs = kept;
        Ok(total - docs.len())
    }

    async fn query(&self, table: &str, query: &Query) -> GendaoResult<Vec<Row>> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(table) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for bytes in docs {
            let document = decode(bytes)?;
            if query.filter.matches(&document) {
                matched.push(document);
            }
        }
        drop(collections);

        sort_rows(&mut matched, &query.sorting);
        matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|document| Ok(Row::Bytes(serde_json::to_vec(&project(document, &query.columns))?)))
            .collect()
    }
}
