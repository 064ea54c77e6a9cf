//! Patient appointments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{Filters, Paginated, Pagination, Record, RecordId};
use crate::error::{Result, StoreError};
use crate::queries::PortalQueries;

pub const APPOINTMENTS: &str = "appointments";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Booked,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub patient_id: i64,
    pub practitioner_id: i64,
    pub starts_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
}

impl PortalQueries {
    /// A patient's appointments, optionally narrowed to one status.
    pub async fn appointments_for_patient(
        &self,
        patient_id: i64,
        status: Option<AppointmentStatus>,
        pagination: Pagination,
    ) -> Result<Paginated<Record<Appointment>>> {
        let mut filters = Filters::new().eq("patient_id", patient_id);
        if let Some(status) = status {
            filters.insert("status", json!(status));
        }
        self.appointments.get_all(pagination, &filters).await
    }

    /// Books a future appointment.
    pub async fn book_appointment(&self, appointment: &Appointment) -> Result<Record<Appointment>> {
        if appointment.starts_at <= Utc::now() {
            return Err(StoreError::InvalidRequest(
                "appointments must start in the future".to_string(),
            ));
        }
        let appointment = Appointment {
            status: AppointmentStatus::Booked,
            ..appointment.clone()
        };
        self.appointments.create(&appointment).await
    }

    pub async fn reschedule_appointment(
        &self,
        id: impl Into<RecordId>,
        starts_at: DateTime<Utc>,
    ) -> Result<Record<Appointment>> {
        let id = id.into();
        let current = self
            .appointments
            .get_by_id(id.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", APPOINTMENTS, id)))?;
        if current.fields.status != AppointmentStatus::Booked {
            return Err(StoreError::InvalidRequest(format!(
                "appointment {} is no longer booked",
                id
            )));
        }
        if starts_at <= Utc::now() {
            return Err(StoreError::InvalidRequest(
                "appointments must start in the future".to_string(),
            ));
        }
        self.appointments
            .update(id, &json!({ "starts_at": starts_at }))
            .await
    }

    pub async fn cancel_appointment(&self, id: impl Into<RecordId>) -> Result<Record<Appointment>> {
        self.appointments
            .update(id, &json!({ "status": AppointmentStatus::Cancelled }))
            .await
    }
}
