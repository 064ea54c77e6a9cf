//! Pagination
//!
//! 1-based page requests and the metadata returned with each page.

use serde::{Deserialize, Serialize};

use crate::db::RowRange;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;

fn default_page() -> u64 {
    DEFAULT_PAGE
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

// == Pagination ==
/// Requested page. Missing fields fall back to page 1 and 20 rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Clamps page to at least 1 and limit into `1..=max_limit`.
    pub fn normalized(self, max_limit: u64) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn range(&self) -> RowRange {
        RowRange {
            offset: self.offset(),
            limit: self.limit,
        }
    }
}

// == Pagination Meta ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl PaginationMeta {
    /// Builds metadata for `total` matching rows; `pages = ceil(total / limit)`.
    pub fn new(total: u64, pagination: Pagination) -> Self {
        let limit = pagination.limit.max(1);
        Self {
            total,
            page: pagination.page,
            limit,
            pages: total.div_ceil(limit),
        }
    }
}

// == Paginated ==
/// One page of rows plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}
