//! In-Memory Data Client
//!
//! A [`DataClient`] that keeps tables in process memory. It mirrors the
//! remote store's observable behavior closely enough for the helper and the
//! HTTP layer to run unchanged against it: integer ids are assigned on insert,
//! duplicate ids are rejected with the unique-violation code, and single-row
//! reads that match nothing report [`NO_ROWS_CODE`](crate::db::NO_ROWS_CODE).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::db::{filter_text, DataClient, Filters, RemoteError, RowRange};

const UNIQUE_VIOLATION_CODE: &str = "23505";

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: i64,
    rows: Vec<Map<String, Value>>,
}

impl MemoryTable {
    fn matching(&self, filters: &Filters) -> impl Iterator<Item = &Map<String, Value>> {
        let filters = filters.clone();
        self.rows.iter().filter(move |row| filters.matches(row))
    }

    fn contains_id(&self, id: &Value) -> bool {
        let wanted = filter_text(id);
        self.rows
            .iter()
            .any(|row| row.get("id").map(filter_text).as_deref() == Some(wanted.as_str()))
    }
}

// == Memory Client ==
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DataClient for MemoryClient {
    async fn count(&self, table: &str, filters: &Filters) -> Result<u64, RemoteError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|t| t.matching(filters).count() as u64)
            .unwrap_or(0))
    }

    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        range: Option<RowRange>,
    ) -> Result<Vec<Value>, RemoteError> {
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let rows = t.matching(filters).map(|row| Value::Object(row.clone()));
        let rows: Vec<Value> = match range {
            Some(range) => rows
                .skip(usize::try_from(range.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(range.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows.collect(),
        };
        Ok(rows)
    }

    async fn select_single(&self, table: &str, filters: &Filters) -> Result<Value, RemoteError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&Map<String, Value>> = tables
            .get(table)
            .map(|t| t.matching(filters).collect())
            .unwrap_or_default();

        if matches.len() != 1 {
            return Err(RemoteError::no_rows());
        }
        Ok(Value::Object(matches.remove(0).clone()))
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();

        // validate the whole batch before touching the table
        let mut next_id = t.next_id;
        let mut staged = Vec::with_capacity(rows.len());
        for mut row in rows {
            match row.get("id").cloned() {
                Some(id) if !id.is_null() => {
                    let taken = t.contains_id(&id)
                        || staged
                            .iter()
                            .any(|r: &Map<String, Value>| r.get("id") == Some(&id));
                    if taken {
                        return Err(RemoteError::with_code(
                            UNIQUE_VIOLATION_CODE,
                            format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
                        ));
                    }
                    if let Some(n) = id.as_i64() {
                        next_id = next_id.max(n);
                    }
                }
                _ => {
                    next_id += 1;
                    row.insert("id".to_string(), Value::from(next_id));
                }
            }
            staged.push(row);
        }

        t.next_id = next_id;
        t.rows.extend(staged.iter().cloned());
        Ok(staged.into_iter().map(Value::Object).collect())
    }

    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        patch: Map<String, Value>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in t.rows.iter_mut().filter(|row| filters.matches(row)) {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            updated.push(Value::Object(row.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, RemoteError> {
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let (removed, kept): (Vec<_>, Vec<_>) =
            t.rows.drain(..).partition(|row| filters.matches(row));
        t.rows = kept;
        Ok(removed.into_iter().map(Value::Object).collect())
    }
}
