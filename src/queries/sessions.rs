//! Session Queries
//!
//! Training sessions of a group, the cached details bundle (session plus its
//! attendance rows) and cancellation as a compensating batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::cache::keys;
use crate::db::{CompensatingBatch, Filters, Paginated, Pagination, Record, RecordId};
use crate::error::{Result, StoreError};
use crate::queries::{Attendance, PortalQueries, ATTENDANCE};

pub const SESSIONS: &str = "sessions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub group_id: i64,
    pub starts_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub session: Record<TrainingSession>,
    pub attendance: Vec<Record<Attendance>>,
}

fn session_number(id: &RecordId) -> Result<i64> {
    match id {
        RecordId::Int(n) => Ok(*n),
        RecordId::Text(text) => text
            .parse()
            .map_err(|_| StoreError::InvalidRequest(format!("invalid session id '{}'", text))),
    }
}

impl PortalQueries {
    pub async fn sessions_for_group(
        &self,
        group_id: i64,
        pagination: Pagination,
    ) -> Result<Paginated<Record<TrainingSession>>> {
        let filters = Filters::new().eq("group_id", group_id);
        self.sessions.get_all(pagination, &filters).await
    }

    /// Schedules a session for an existing group. The status is always
    /// `scheduled` on creation.
    pub async fn schedule_session(
        &self,
        session: &TrainingSession,
    ) -> Result<Record<TrainingSession>> {
        if self.get_group(session.group_id).await?.is_none() {
            return Err(StoreError::NotFound(format!(
                "groups/{}",
                session.group_id
            )));
        }
        let session = TrainingSession {
            status: SessionStatus::Scheduled,
            ..session.clone()
        };
        self.sessions.create(&session).await
    }

    // == Session Details ==
    /// The session with all its attendance rows, cached under
    /// `sessions:<id>:details`. Missing sessions are not cached.
    pub async fn session_details(
        &self,
        id: impl Into<RecordId>,
    ) -> Result<Option<SessionDetails>> {
        let id = id.into();
        let key = keys::details_key(SESSIONS, &id);
        if let Some(cached) = self.cache().get(&key).await {
            return serde_json::from_value(cached)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    table: SESSIONS.to_string(),
                    source,
                });
        }

        let seen = self.cache().generation(&[SESSIONS, ATTENDANCE]).await;
        let Some(session) = self.sessions.get_by_id(id.clone()).await? else {
            return Ok(None);
        };
        let attendance = self.attendance_rows(session_number(&id)?).await?;
        let details = SessionDetails {
            session,
            attendance,
        };

        let value = serde_json::to_value(&details).map_err(|source| StoreError::Decode {
            table: SESSIONS.to_string(),
            source,
        })?;
        self.cache()
            .set_if_current(key, value, self.sessions.ttl_seconds(), &seen)
            .await;
        Ok(Some(details))
    }

    // == Cancel Session ==
    /// Marks the session cancelled and removes its attendance rows. If any
    /// step fails the earlier steps are compensated and the first error is
    /// returned. Cancelling an already cancelled session changes nothing.
    pub async fn cancel_session(
        &self,
        id: impl Into<RecordId>,
    ) -> Result<Record<TrainingSession>> {
        let id = id.into();
        let session = self
            .sessions
            .get_by_id(id.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", SESSIONS, id)))?;
        if session.fields.status == SessionStatus::Cancelled {
            return Ok(session);
        }

        let mut batch = CompensatingBatch::new();
        match self.cancel_steps(&mut batch, &id).await {
            Ok(cancelled) => {
                batch.commit();
                self.cache()
                    .delete(&keys::details_key(SESSIONS, &id))
                    .await;
                info!(session = %id, "session cancelled");
                Ok(cancelled)
            }
            Err(err) => {
                let failures = batch.rollback().await;
                if !failures.is_empty() {
                    warn!(
                        session = %id,
                        failures = failures.len(),
                        "session cancel only partly rolled back"
                    );
                }
                Err(err)
            }
        }
    }

    async fn cancel_steps(
        &self,
        batch: &mut CompensatingBatch,
        id: &RecordId,
    ) -> Result<Record<TrainingSession>> {
        let cancelled = batch
            .update(
                &self.sessions,
                id,
                &json!({ "status": SessionStatus::Cancelled }),
            )
            .await?;
        for row in self.attendance_rows(session_number(id)?).await? {
            batch.delete(&self.attendance, row.id).await?;
        }
        Ok(cancelled)
    }
}
