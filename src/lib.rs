//! Portal Store - cached data access for a training and appointments portal
//!
//! A TTL read cache in front of a remote PostgREST-style table store, with a
//! generic table helper, typed query modules and an HTTP surface.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queries;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::{Backend, Config};
pub use error::{Result, StoreError};
pub use tasks::spawn_purge_task;
