//! Remote Data Client
//!
//! The seam between the database helper and whatever serves the tables:
//! a hosted PostgREST endpoint in production, [`MemoryClient`] in tests and
//! local runs.
//!
//! [`MemoryClient`]: crate::db::MemoryClient

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error code the remote store uses when a single-row request matched no rows.
pub const NO_ROWS_CODE: &str = "PGRST116";

// == Remote Error ==
/// Failure reported by the remote store, in PostgREST's error body shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            ..Self::default()
        }
    }

    /// The "no rows" error returned for a single-row request that matched nothing.
    pub fn no_rows() -> Self {
        Self::with_code(
            NO_ROWS_CODE,
            "JSON object requested, multiple (or no) rows returned",
        )
    }

    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS_CODE)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

// == Filters ==
/// Equality filters (`column = value`), kept in column order.
///
/// Null values are dropped on insertion: a missing filter never turns into
/// an `IS NULL` condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(BTreeMap<String, Value>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `column = value`, ignoring nulls. `Option` values map `None` to null.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if !value.is_null() {
            self.0.insert(column.into(), value);
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut filters = Self::new();
        for (column, value) in map {
            filters.insert(column, value);
        }
        filters
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-level match, comparing values by their textual form.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.iter().all(|(column, expected)| {
            row.get(column)
                .map(|actual| filter_text(actual) == filter_text(expected))
                .unwrap_or(false)
        })
    }

    /// Canonical rendering used in cache keys: a JSON object in column order.
    ///
    /// Columns and values are JSON-escaped, so separators inside a value
    /// cannot make two different filter sets share a key.
    pub fn cache_fragment(&self) -> String {
        let object: Map<String, Value> = self
            .0
            .iter()
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        Value::Object(object).to_string()
    }
}

/// Renders a filter value the way it appears in a query string.
pub fn filter_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// == Row Range ==
/// A window of rows: `limit` rows starting at zero-based `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub offset: u64,
    pub limit: u64,
}

impl RowRange {
    /// Inclusive index of the last row in the window.
    ///
    /// Saturates at `u64::MAX` for windows that start near the end of the range.
    pub fn last(&self) -> u64 {
        self.offset.saturating_add(self.limit.saturating_sub(1))
    }
}

// == Data Client Trait ==
/// Table operations the remote store offers.
///
/// Rows travel as JSON objects. Every call is an independent round trip.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Exact number of rows matching `filters`.
    async fn count(&self, table: &str, filters: &Filters) -> Result<u64, RemoteError>;

    /// Rows matching `filters`, ordered by id, optionally windowed.
    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        range: Option<RowRange>,
    ) -> Result<Vec<Value>, RemoteError>;

    /// Exactly one row, or a [`NO_ROWS_CODE`] error.
    async fn select_single(&self, table: &str, filters: &Filters) -> Result<Value, RemoteError>;

    /// Inserts `rows` and returns them as stored.
    async fn insert(
        &self,
        table: &str,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<Value>, RemoteError>;

    /// Applies `patch` to matching rows and returns the updated rows.
    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        patch: Map<String, Value>,
    ) -> Result<Vec<Value>, RemoteError>;

    /// Deletes matching rows and returns what was removed.
    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, RemoteError>;
}
