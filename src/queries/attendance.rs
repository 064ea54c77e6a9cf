//! Attendance Queries
//!
//! Per-member attendance rows for a training session. Status changes are
//! addressed by `(session_id, member_id)` rather than row id, so they go to
//! the client directly and invalidate the cache by hand.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::keys;
use crate::db::{Filters, Paginated, Pagination, Record};
use crate::error::{Operation, Result, StoreError};
use crate::queries::{PortalQueries, SESSIONS};

pub const ATTENDANCE: &str = "attendance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub session_id: i64,
    pub member_id: i64,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One line of a roll call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub member_id: i64,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

fn decode_rows(rows: Vec<Value>) -> Result<Vec<Record<Attendance>>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|source| StoreError::Decode {
                table: ATTENDANCE.to_string(),
                source,
            })
        })
        .collect()
}

impl PortalQueries {
    pub async fn attendance_for_session(
        &self,
        session_id: i64,
        pagination: Pagination,
    ) -> Result<Paginated<Record<Attendance>>> {
        let filters = Filters::new().eq("session_id", session_id);
        self.attendance.get_all(pagination, &filters).await
    }

    /// Every attendance row of a session, unpaginated and uncached.
    pub(crate) async fn attendance_rows(&self, session_id: i64) -> Result<Vec<Record<Attendance>>> {
        let filters = Filters::new().eq("session_id", session_id);
        let rows = self
            .attendance
            .call(
                Operation::List,
                self.attendance.client().select(ATTENDANCE, &filters, None),
            )
            .await?;
        decode_rows(rows)
    }

    /// Records a roll call in one insert.
    pub async fn record_attendance(
        &self,
        session_id: i64,
        entries: &[AttendanceEntry],
    ) -> Result<Vec<Record<Attendance>>> {
        let rows: Vec<Attendance> = entries
            .iter()
            .map(|entry| Attendance {
                session_id,
                member_id: entry.member_id,
                status: entry.status,
                note: entry.note.clone(),
            })
            .collect();

        let created = self.attendance.create_many(&rows).await?;
        if !created.is_empty() {
            self.cache()
                .delete(&keys::details_key(SESSIONS, session_id))
                .await;
        }
        Ok(created)
    }

    /// Sets one member's status for a session. Returns the updated rows,
    /// empty when the member has no attendance row.
    pub async fn set_attendance_status(
        &self,
        session_id: i64,
        member_id: i64,
        status: AttendanceStatus,
    ) -> Result<Vec<Record<Attendance>>> {
        let filters = Filters::new()
            .eq("session_id", session_id)
            .eq("member_id", member_id);
        let mut patch = Map::new();
        patch.insert("status".to_string(), serde_json::json!(status));
        patch.insert("updated_at".to_string(), Value::from(Utc::now().to_rfc3339()));

        let rows = self
            .attendance
            .call(
                Operation::Update,
                self.attendance.client().update(ATTENDANCE, &filters, patch),
            )
            .await?;
        let updated = decode_rows(rows)?;

        let cache = self.cache();
        for row in &updated {
            keys::invalidate_record(cache, ATTENDANCE, &row.id).await;
        }
        if updated.is_empty() {
            keys::invalidate_lists(cache, ATTENDANCE).await;
        }
        cache.delete(&keys::details_key(SESSIONS, session_id)).await;

        debug!(session_id, member_id, rows = updated.len(), "attendance status set");
        Ok(updated)
    }
}
