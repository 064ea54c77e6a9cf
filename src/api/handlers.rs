//! API Handlers
//!
//! HTTP request handlers for the table, cache and session endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::cache::SharedCache;
use crate::config::Config;
use crate::db::{DataClient, DatabaseHelper, MemoryClient, Paginated, Record, RecordId, Row};
use crate::error::{Result, StoreError};
use crate::models::{
    object, CreateBody, DeleteResponse, HealthResponse, InvalidationResponse, ListQuery,
    StatsResponse,
};
use crate::queries::{self, PortalQueries, SessionDetails, TrainingSession};

/// Application state shared across all handlers.
///
/// The client and cache are shared by every table helper, so a write through
/// any endpoint invalidates what the others read.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn DataClient>,
    pub cache: SharedCache<Value>,
    pub config: Arc<Config>,
    pub queries: PortalQueries,
}

impl AppState {
    pub fn new(client: Arc<dyn DataClient>, config: Config) -> Self {
        let cache = SharedCache::new();
        let queries = PortalQueries::from_config(client.clone(), cache.clone(), &config);
        Self {
            client,
            cache,
            config: Arc::new(config),
            queries,
        }
    }

    /// State backed by in-process tables.
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(MemoryClient::new()), config)
    }

    /// Helper for an exposed table. Unknown tables are reported as not found.
    pub fn helper(&self, table: &str) -> Result<DatabaseHelper> {
        if !self.config.serves(table) {
            return Err(StoreError::NotFound(format!("table '{}'", table)));
        }
        let helper = DatabaseHelper::new(table, self.client.clone(), self.cache.clone());
        Ok(queries::tuned(&self.config, helper))
    }
}

/// Handler for GET /tables/:table
///
/// `page` and `limit` select the window; other parameters filter by column.
pub async fn list_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Paginated<Row>>> {
    let helper = state.helper(&table)?;
    let query = ListQuery::from_params(params, state.config.page_limit)?;

    let page = helper.get_all(query.pagination, &query.filters).await?;
    Ok(Json(page))
}

/// Handler for GET /tables/:table/:id
pub async fn get_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Row>> {
    let helper = state.helper(&table)?;

    helper
        .get_by_id(RecordId::parse(&id))
        .await?
        .map(Json)
        .ok_or_else(|| StoreError::NotFound(format!("{}/{}", table, id)))
}

/// Handler for POST /tables/:table
///
/// An object body creates one row; an array body creates all of them at once.
pub async fn create_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>)> {
    let helper = state.helper(&table)?;

    let created = match CreateBody::try_from(body)? {
        CreateBody::One(row) => json_value(&table, helper.create(&row).await?)?,
        CreateBody::Many(rows) => json_value(&table, helper.create_many(&rows).await?)?,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for PATCH /tables/:table/:id
pub async fn update_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Row>> {
    let helper = state.helper(&table)?;
    let patch = object(body)?;

    let row = helper.update(RecordId::parse(&id), &patch).await?;
    Ok(Json(row))
}

/// Handler for DELETE /tables/:table/:id
pub async fn delete_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let helper = state.helper(&table)?;

    helper.delete(RecordId::parse(&id)).await?;
    Ok(Json(DeleteResponse::new(table, id)))
}

/// Handler for GET /sessions/:id/details
pub async fn session_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetails>> {
    state
        .queries
        .session_details(RecordId::parse(&id))
        .await?
        .map(Json)
        .ok_or_else(|| StoreError::NotFound(format!("sessions/{}", id)))
}

/// Handler for POST /sessions/:id/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record<TrainingSession>>> {
    let session = state.queries.cancel_session(RecordId::parse(&id)).await?;
    Ok(Json(session))
}

/// Handler for DELETE /cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<InvalidationResponse> {
    let removed = state.cache.clear().await;
    Json(InvalidationResponse::cleared(removed))
}

/// Handler for DELETE /cache/:prefix
pub async fn delete_cache_prefix(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Json<InvalidationResponse> {
    let removed = state.cache.delete_by_prefix(&prefix).await;
    Json(InvalidationResponse::prefix(&prefix, removed))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.config.backend.as_str()))
}

fn json_value<T: serde::Serialize>(table: &str, value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| StoreError::Decode {
        table: table.to_string(),
        source,
    })
}
