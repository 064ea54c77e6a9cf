//! API Module
//!
//! HTTP handlers and routing over the cached table helpers.
//!
//! # Endpoints
//! - `GET /tables/:table` - List rows (`page`, `limit`, column filters)
//! - `POST /tables/:table` - Create one or many rows
//! - `GET /tables/:table/:id` - Fetch a row
//! - `PATCH /tables/:table/:id` - Update a row
//! - `DELETE /tables/:table/:id` - Delete a row
//! - `GET /sessions/:id/details` - Session bundle
//! - `POST /sessions/:id/cancel` - Cancel a session
//! - `DELETE /cache`, `DELETE /cache/:prefix` - Invalidate cache entries
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
