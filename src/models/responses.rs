//! Response DTOs for the table API
//!
//! Defines the structure of outgoing HTTP response bodies that are not rows.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for row deletion (DELETE /tables/:table/:id)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub table: String,
    pub id: String,
}

impl DeleteResponse {
    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        let table = table.into();
        let id = id.into();
        Self {
            message: format!("Row '{}' deleted from '{}'", id, table),
            table,
            id,
        }
    }
}

/// Response body for cache invalidation (DELETE /cache, DELETE /cache/:prefix)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResponse {
    pub message: String,
    /// Number of cache entries removed
    pub removed: usize,
}

impl InvalidationResponse {
    pub fn cleared(removed: usize) -> Self {
        Self {
            message: "Cache cleared".to_string(),
            removed,
        }
    }

    pub fn prefix(prefix: &str, removed: usize) -> Self {
        Self {
            message: format!("Removed keys starting with '{}'", prefix),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped lazily because their TTL had elapsed
    pub expirations: u64,
    /// Entries dropped by writes or explicit invalidation
    pub invalidations: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Active data backend
    pub backend: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            backend: backend.into(),
        }
    }
}
