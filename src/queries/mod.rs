//! Query Modules
//!
//! Typed access to the portal's tables. Each operation is a thin composition
//! of [`DatabaseHelper`] calls; the few that write outside the helper keep the
//! cache key namespace in step themselves.

mod appointments;
mod attendance;
mod groups;
mod sessions;

pub use appointments::{Appointment, AppointmentStatus, APPOINTMENTS};
pub use attendance::{Attendance, AttendanceEntry, AttendanceStatus, ATTENDANCE};
pub use groups::{Group, GROUPS};
pub use sessions::{SessionDetails, SessionStatus, TrainingSession, SESSIONS};

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::cache::SharedCache;
use crate::config::Config;
use crate::db::{DataClient, DatabaseHelper};

// == Portal Queries ==
/// One helper per table, all sharing a client and cache.
#[derive(Clone)]
pub struct PortalQueries {
    groups: DatabaseHelper<Group>,
    sessions: DatabaseHelper<TrainingSession>,
    attendance: DatabaseHelper<Attendance>,
    appointments: DatabaseHelper<Appointment>,
}

impl PortalQueries {
    pub fn new(client: Arc<dyn DataClient>, cache: SharedCache<Value>) -> Self {
        Self {
            groups: DatabaseHelper::new(GROUPS, client.clone(), cache.clone()),
            sessions: DatabaseHelper::new(SESSIONS, client.clone(), cache.clone()),
            attendance: DatabaseHelper::new(ATTENDANCE, client.clone(), cache.clone()),
            appointments: DatabaseHelper::new(APPOINTMENTS, client, cache),
        }
    }

    /// Applies the configured TTL, timeout and page limit to every helper.
    pub fn from_config(
        client: Arc<dyn DataClient>,
        cache: SharedCache<Value>,
        config: &Config,
    ) -> Self {
        let queries = Self::new(client, cache);
        Self {
            groups: tuned(config, queries.groups),
            sessions: tuned(config, queries.sessions),
            attendance: tuned(config, queries.attendance),
            appointments: tuned(config, queries.appointments),
        }
    }

    fn cache(&self) -> &SharedCache<Value> {
        self.groups.cache()
    }
}

pub(crate) fn tuned<T>(config: &Config, helper: DatabaseHelper<T>) -> DatabaseHelper<T>
where
    T: Serialize + DeserializeOwned,
{
    helper
        .with_ttl(config.default_ttl)
        .with_timeout(config.request_timeout)
        .with_max_limit(config.max_page_limit)
}
