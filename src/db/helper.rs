//! Database Helper
//!
//! Generic list/get/create/update/delete over one remote table, reading
//! through the shared cache and invalidating it on every successful write.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cache::{keys, SharedCache};
use crate::db::{DataClient, Filters, Paginated, Pagination, Record, RecordId, RemoteError};
use crate::error::{Operation, Result, StoreError};

pub const DEFAULT_READ_TTL_SECS: u64 = 300;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_LIMIT: u64 = 100;

// == Database Helper ==
/// CRUD and pagination for the table named at construction.
///
/// `T` is the shape of the table's own columns; `id`, `created_at` and
/// `updated_at` are handled by [`Record`]. Cache keys follow
/// [`crate::cache::keys`].
pub struct DatabaseHelper<T = Map<String, Value>> {
    table: String,
    client: Arc<dyn DataClient>,
    cache: SharedCache<Value>,
    ttl_seconds: u64,
    timeout: Duration,
    max_limit: u64,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for DatabaseHelper<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            client: Arc::clone(&self.client),
            cache: self.cache.clone(),
            ttl_seconds: self.ttl_seconds,
            timeout: self.timeout,
            max_limit: self.max_limit,
            _record: PhantomData,
        }
    }
}

impl<T> DatabaseHelper<T> {
    /// Same table, client, cache and settings, decoding rows as `U`.
    pub fn retyped<U>(&self) -> DatabaseHelper<U> {
        DatabaseHelper {
            table: self.table.clone(),
            client: Arc::clone(&self.client),
            cache: self.cache.clone(),
            ttl_seconds: self.ttl_seconds,
            timeout: self.timeout,
            max_limit: self.max_limit,
            _record: PhantomData,
        }
    }
}

impl<T> DatabaseHelper<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(
        table: impl Into<String>,
        client: Arc<dyn DataClient>,
        cache: SharedCache<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            client,
            cache,
            ttl_seconds: DEFAULT_READ_TTL_SECS,
            timeout: DEFAULT_TIMEOUT,
            max_limit: DEFAULT_MAX_LIMIT,
            _record: PhantomData,
        }
    }

    /// How long reads stay cached.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Upper bound for every remote round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_limit(mut self, max_limit: u64) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn cache(&self) -> &SharedCache<Value> {
        &self.cache
    }

    pub fn client(&self) -> &Arc<dyn DataClient> {
        &self.client
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    // == Get All ==
    /// One page of rows matching `filters`, with total/page metadata.
    pub async fn get_all(
        &self,
        pagination: Pagination,
        filters: &Filters,
    ) -> Result<Paginated<Record<T>>> {
        let pagination = pagination.normalized(self.max_limit);
        let key = keys::list_key(
            &self.table,
            pagination.page,
            pagination.limit,
            &filters.cache_fragment(),
        );

        let page = self
            .cache
            .get_or_set_in(&[self.table.as_str()], &key, self.ttl_seconds, || {
                self.fetch_page(pagination, filters)
            })
            .await?;
        self.decode(page)
    }

    async fn fetch_page(&self, pagination: Pagination, filters: &Filters) -> Result<Value> {
        let (total, rows) = tokio::try_join!(
            self.call(Operation::Count, self.client.count(&self.table, filters)),
            self.call(
                Operation::List,
                self.client
                    .select(&self.table, filters, Some(pagination.range()))
            ),
        )?;
        debug!(
            table = %self.table,
            page = pagination.page,
            total,
            rows = rows.len(),
            "fetched page"
        );

        let page = Paginated {
            pagination: crate::db::PaginationMeta::new(total, pagination),
            data: rows,
        };
        serde_json::to_value(page).map_err(|source| self.decode_error(source))
    }

    // == Get By Id ==
    /// The row with `id`, or `None` when the remote store reports no rows.
    pub async fn get_by_id(&self, id: impl Into<RecordId>) -> Result<Option<Record<T>>> {
        let id = id.into();
        let key = keys::record_key(&self.table, &id);
        if let Some(row) = self.cache.get(&key).await {
            return self.decode(row).map(Some);
        }

        let seen = self.cache.generation(&[self.table.as_str()]).await;
        let filters = id_filter(&id);
        let fetched = self
            .call(
                Operation::Get,
                self.client.select_single(&self.table, &filters),
            )
            .await;
        match fetched {
            Ok(row) => {
                let record = self.decode(row.clone())?;
                self.cache
                    .set_if_current(key, row, self.ttl_seconds, &seen)
                    .await;
                Ok(Some(record))
            }
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    // == Create ==
    /// Inserts one row, stamping `created_at` when the payload has none.
    pub async fn create<P>(&self, payload: &P) -> Result<Record<T>>
    where
        P: Serialize + ?Sized,
    {
        let row = self.new_row(payload)?;
        let rows = self
            .call(Operation::Create, self.client.insert(&self.table, vec![row]))
            .await?;
        self.invalidate_lists().await;

        let row = rows.into_iter().next().ok_or_else(|| StoreError::NoRowReturned {
            table: self.table.clone(),
            operation: Operation::Create,
        })?;
        debug!(table = %self.table, "created row");
        self.decode(row)
    }

    // == Create Many ==
    /// Inserts all payloads in one round trip. Empty input never reaches the store.
    pub async fn create_many<P>(&self, payloads: &[P]) -> Result<Vec<Record<T>>>
    where
        P: Serialize,
    {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let rows = payloads
            .iter()
            .map(|payload| self.new_row(payload))
            .collect::<Result<Vec<_>>>()?;
        let created = self
            .call(
                Operation::CreateMany,
                self.client.insert(&self.table, rows),
            )
            .await?;
        self.invalidate_lists().await;

        debug!(table = %self.table, count = created.len(), "created rows");
        created.into_iter().map(|row| self.decode(row)).collect()
    }

    // == Update ==
    /// Applies `payload` to the row with `id`. `id` and `created_at` in the
    /// payload are ignored; `updated_at` is stamped.
    pub async fn update<P>(&self, id: impl Into<RecordId>, payload: &P) -> Result<Record<T>>
    where
        P: Serialize + ?Sized,
    {
        let id = id.into();
        let mut patch = self.payload_object(payload)?;
        patch.remove("id");
        patch.remove("created_at");
        patch.insert("updated_at".to_string(), Value::from(now_rfc3339()));

        let rows = self
            .call(
                Operation::Update,
                self.client.update(&self.table, &id_filter(&id), patch),
            )
            .await?;
        self.invalidate_record(&id).await;

        let row = rows.into_iter().next().ok_or_else(|| StoreError::NoRowReturned {
            table: self.table.clone(),
            operation: Operation::Update,
        })?;
        debug!(table = %self.table, %id, "updated row");
        self.decode(row)
    }

    // == Delete ==
    /// Deletes the row with `id`. Deleting a row that is already gone succeeds.
    pub async fn delete(&self, id: impl Into<RecordId>) -> Result<()> {
        let id = id.into();
        let removed = self
            .call(
                Operation::Delete,
                self.client.delete(&self.table, &id_filter(&id)),
            )
            .await?;
        self.invalidate_record(&id).await;

        debug!(table = %self.table, %id, removed = removed.len(), "deleted row");
        Ok(())
    }

    // == Invalidation ==
    /// Drops every cached list page of this table.
    pub async fn invalidate_lists(&self) -> usize {
        keys::invalidate_lists(&self.cache, &self.table).await
    }

    /// Drops the cached row with `id`, its details bundle, and every list page.
    pub async fn invalidate_record(&self, id: &RecordId) -> usize {
        keys::invalidate_record(&self.cache, &self.table, id).await
    }

    // == Internals ==
    /// Runs one remote round trip under the configured timeout, wrapping
    /// failures with this table's name.
    pub(crate) async fn call<R, F>(&self, operation: Operation, request: F) -> Result<R>
    where
        F: Future<Output = std::result::Result<R, RemoteError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                if !source.is_no_rows() {
                    warn!(table = %self.table, %operation, error = %source, "remote operation failed");
                }
                Err(StoreError::OperationFailed {
                    table: self.table.clone(),
                    operation,
                    source,
                })
            }
            Err(_) => {
                warn!(table = %self.table, %operation, timeout_ms = self.timeout.as_millis() as u64, "remote operation timed out");
                Err(StoreError::Timeout {
                    table: self.table.clone(),
                    operation,
                    after: self.timeout,
                })
            }
        }
    }

    fn payload_object<P>(&self, payload: &P) -> Result<Map<String, Value>>
    where
        P: Serialize + ?Sized,
    {
        match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::InvalidPayload {
                table: self.table.clone(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(StoreError::InvalidPayload {
                table: self.table.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn new_row<P>(&self, payload: &P) -> Result<Map<String, Value>>
    where
        P: Serialize + ?Sized,
    {
        let mut row = self.payload_object(payload)?;
        if row.get("created_at").map_or(true, Value::is_null) {
            row.insert("created_at".to_string(), Value::from(now_rfc3339()));
        }
        Ok(row)
    }

    fn decode<R: DeserializeOwned>(&self, value: Value) -> Result<R> {
        serde_json::from_value(value).map_err(|source| self.decode_error(source))
    }

    fn decode_error(&self, source: serde_json::Error) -> StoreError {
        StoreError::Decode {
            table: self.table.clone(),
            source,
        }
    }
}

fn id_filter(id: &RecordId) -> Filters {
    Filters::new().eq("id", id.to_value())
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
