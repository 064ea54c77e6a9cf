//! PostgREST Data Client
//!
//! [`DataClient`] backed by the hosted project's REST endpoint
//! (`<project>/rest/v1`) through the `postgrest` crate.

use async_trait::async_trait;
use postgrest::{Builder, Postgrest};
use serde_json::{Map, Value};
use tracing::debug;

use crate::db::{filter_text, DataClient, Filters, RemoteError, RowRange};

// == Postgrest Client ==
pub struct PostgrestClient {
    rest: Postgrest,
    /// Bearer token sent with every request; the anon key until a user signs in
    bearer: String,
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient").finish_non_exhaustive()
    }
}

impl PostgrestClient {
    /// Creates a client for `project_url` authenticated with the project's anon key.
    pub fn new(project_url: &str, anon_key: &str) -> Self {
        let endpoint = format!("{}/rest/v1", project_url.trim_end_matches('/'));
        Self {
            rest: Postgrest::new(endpoint).insert_header("apikey", anon_key),
            bearer: anon_key.to_string(),
        }
    }

    /// Sends `access_token` instead of the anon key, so row-level security
    /// policies see the signed-in user.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.bearer = access_token.into();
        self
    }

    fn table(&self, table: &str, filters: &Filters) -> Builder {
        let mut builder = self.rest.from(table).auth(&self.bearer);
        for (column, value) in filters.iter() {
            builder = builder.eq(column, filter_text(value));
        }
        builder
    }
}

/// Executes `builder`, returning the parsed body and the total from `Content-Range`.
async fn send(builder: Builder) -> Result<(Value, Option<u64>), RemoteError> {
    let response = builder
        .execute()
        .await
        .map_err(|e| RemoteError::new(format!("request failed: {}", e)))?;

    let status = response.status();
    let total = response
        .headers()
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(content_range_total);
    let body = response
        .text()
        .await
        .map_err(|e| RemoteError::new(format!("failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(error_from_body(status.as_u16(), &body));
    }

    let value = if body.trim().is_empty() {
        Value::Array(Vec::new())
    } else {
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::new(format!("malformed response body: {}", e)))?
    };
    Ok((value, total))
}

async fn send_rows(builder: Builder) -> Result<Vec<Value>, RemoteError> {
    match send(builder).await?.0 {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![single]),
    }
}

/// Total row count from a `Content-Range` header such as `0-19/57` or `*/0`.
fn saturating_usize(index: u64) -> usize {
    usize::try_from(index).unwrap_or(usize::MAX)
}

fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn error_from_body(status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<RemoteError>(body) {
        Ok(err) if !err.message.is_empty() || err.code.is_some() => err,
        _ => RemoteError::new(format!("HTTP {}: {}", status, body.trim())),
    }
}

#[async_trait]
impl DataClient for PostgrestClient {
    async fn count(&self, table: &str, filters: &Filters) -> Result<u64, RemoteError> {
        let builder = self
            .table(table, filters)
            .select("id")
            .exact_count()
            .range(0, 0);
        let (_, total) = send(builder).await?;
        total.ok_or_else(|| RemoteError::new("response carried no Content-Range total"))
    }

    async fn select(
        &self,
        table: &str,
        filters: &Filters,
        range: Option<RowRange>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut builder = self.table(table, filters).select("*").order("id.asc");
        if let Some(range) = range {
            builder = builder.range(saturating_usize(range.offset), saturating_usize(range.last()));
        }
        debug!(table, ?range, "postgrest select");
        send_rows(builder).await
    }

    async fn select_single(&self, table: &str, filters: &Filters) -> Result<Value, RemoteError> {
        let builder = self.table(table, filters).select("*").single();
        Ok(send(builder).await?.0)
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<Value>, RemoteError> {
        let body = Value::Array(rows.into_iter().map(Value::Object).collect()).to_string();
        send_rows(self.table(table, &Filters::new()).insert(body)).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        patch: Map<String, Value>,
    ) -> Result<Vec<Value>, RemoteError> {
        let body = Value::Object(patch).to_string();
        send_rows(self.table(table, filters).update(body)).await
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, RemoteError> {
        send_rows(self.table(table, filters).delete()).await
    }
}
