//! Request and Response models for the table API
//!
//! Rows themselves travel as [`Row`](crate::db::Row); these are the query
//! strings, write bodies and status payloads around them.

pub mod requests;
pub mod responses;

pub use requests::{object, CreateBody, ListQuery};
pub use responses::{DeleteResponse, HealthResponse, InvalidationResponse, StatsResponse};
