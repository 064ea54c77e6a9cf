//! Compensating Batches
//!
//! Groups several helper writes so they can be undone together on failure.
//! This is not a database transaction: there is no isolation, other clients
//! can observe intermediate states, and a rollback is a second series of
//! writes that can itself fail. Each write records its inverse; `rollback`
//! replays the inverses newest first.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::db::{DatabaseHelper, Record, RecordId};
use crate::error::{Result, StoreError};

enum Compensation {
    /// Undo a create
    Remove { helper: DatabaseHelper, id: RecordId },
    /// Undo an update by writing the previous column values back
    Restore {
        helper: DatabaseHelper,
        id: RecordId,
        previous: Map<String, Value>,
    },
    /// Undo a delete by inserting the removed row again, id included
    Reinsert {
        helper: DatabaseHelper,
        row: Map<String, Value>,
    },
}

impl Compensation {
    async fn apply(self) -> Result<()> {
        match self {
            Compensation::Remove { helper, id } => helper.delete(id).await,
            Compensation::Restore {
                helper,
                id,
                previous,
            } => helper.update(id, &previous).await.map(|_| ()),
            Compensation::Reinsert { helper, row } => helper.create(&row).await.map(|_| ()),
        }
    }
}

// == Compensating Batch ==
#[derive(Default)]
pub struct CompensatingBatch {
    undo: Vec<Compensation>,
}

impl CompensatingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that would be compensated on rollback.
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub async fn create<T, P>(&mut self, helper: &DatabaseHelper<T>, payload: &P) -> Result<Record<T>>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let created = helper.create(payload).await?;
        self.undo.push(Compensation::Remove {
            helper: helper.retyped(),
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub async fn update<T, P>(
        &mut self,
        helper: &DatabaseHelper<T>,
        id: impl Into<RecordId>,
        payload: &P,
    ) -> Result<Record<T>>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let id = id.into();
        let untyped: DatabaseHelper = helper.retyped();
        let previous = untyped
            .get_by_id(id.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", helper.table(), id)))?;

        let updated = helper.update(id.clone(), payload).await?;
        self.undo.push(Compensation::Restore {
            helper: untyped,
            id,
            previous: previous.fields,
        });
        Ok(updated)
    }

    /// Deletes the row with `id`. A row that is already gone records nothing.
    pub async fn delete<T>(&mut self, helper: &DatabaseHelper<T>, id: impl Into<RecordId>) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let id = id.into();
        let untyped: DatabaseHelper = helper.retyped();
        let previous = untyped.get_by_id(id.clone()).await?;

        helper.delete(id).await?;
        if let Some(previous) = previous {
            let row = match serde_json::to_value(&previous) {
                Ok(Value::Object(row)) => row,
                _ => previous.fields,
            };
            self.undo.push(Compensation::Reinsert {
                helper: untyped,
                row,
            });
        }
        Ok(())
    }

    /// Keeps every write and forgets the compensations.
    pub fn commit(self) {
        if !self.undo.is_empty() {
            info!(writes = self.undo.len(), "compensating batch committed");
        }
    }

    /// Replays compensations newest first. Failures are logged and returned;
    /// the remaining compensations still run.
    pub async fn rollback(mut self) -> Vec<StoreError> {
        let mut failures = Vec::new();
        while let Some(compensation) = self.undo.pop() {
            if let Err(err) = compensation.apply().await {
                error!(error = %err, "compensation failed");
                failures.push(err);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SharedCache;
    use crate::db::{Filters, MemoryClient, Pagination};
    use serde_json::json;
    use std::sync::Arc;

    fn helper(table: &str, client: &Arc<MemoryClient>) -> DatabaseHelper {
        DatabaseHelper::new(table, client.clone(), SharedCache::new())
    }

    #[tokio::test]
    async fn test_rollback_undoes_writes_in_reverse() {
        let client = Arc::new(MemoryClient::new());
        let groups = helper("groups", &client);
        let kept = groups.create(&json!({"name": "Kept"})).await.unwrap();
        let doomed = groups.create(&json!({"name": "Doomed"})).await.unwrap();

        let mut batch = CompensatingBatch::new();
        batch.create(&groups, &json!({"name": "New"})).await.unwrap();
        batch
            .update(&groups, kept.id.clone(), &json!({"name": "Renamed"}))
            .await
            .unwrap();
        batch.delete(&groups, doomed.id.clone()).await.unwrap();
        assert_eq!(batch.len(), 3);

        let failures = batch.rollback().await;

        assert!(failures.is_empty());
        let page = groups
            .get_all(Pagination::default(), &Filters::new())
            .await
            .unwrap();
        let mut names: Vec<String> = page
            .data
            .iter()
            .map(|r| r.fields["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Doomed", "Kept"]);

        let restored = groups.get_by_id(doomed.id.clone()).await.unwrap().unwrap();
        assert_eq!(restored.created_at, doomed.created_at);
    }

    #[tokio::test]
    async fn test_update_of_missing_row_records_nothing() {
        let client = Arc::new(MemoryClient::new());
        let groups = helper("groups", &client);
        let mut batch = CompensatingBatch::new();

        let err = batch
            .update(&groups, 5, &json!({"name": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_commit_keeps_writes() {
        let client = Arc::new(MemoryClient::new());
        let groups = helper("groups", &client);

        let mut batch = CompensatingBatch::new();
        batch.create(&groups, &json!({"name": "A"})).await.unwrap();
        batch.commit();

        assert_eq!(client.row_count("groups").await, 1);
    }
}
