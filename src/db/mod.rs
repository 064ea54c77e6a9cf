//! Database Module
//!
//! Remote table access: the [`DataClient`] seam with its memory and PostgREST
//! implementations, and the cached [`DatabaseHelper`] built on top.

mod client;
mod compensation;
mod helper;
mod memory;
mod pagination;
mod record;
mod rest;

pub use client::{filter_text, DataClient, Filters, RemoteError, RowRange, NO_ROWS_CODE};
pub use compensation::CompensatingBatch;
pub use helper::{DatabaseHelper, DEFAULT_MAX_LIMIT, DEFAULT_READ_TTL_SECS, DEFAULT_TIMEOUT};
pub use memory::MemoryClient;
pub use pagination::{Paginated, Pagination, PaginationMeta, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use record::{Record, RecordId, Row};
pub use rest::PostgrestClient;
