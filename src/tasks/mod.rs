//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expired entry purge: sweeps expired cache entries when `CLEANUP_INTERVAL` is set

mod cleanup;

pub use cleanup::spawn_purge_task;
