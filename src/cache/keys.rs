//! Cache Key Namespace
//!
//! Key shapes shared by everything that caches table data:
//!
//! - `<table>:<id>` - a single record
//! - `<table>:<id>:details` - a record bundled with related rows
//! - `<table>:list:...` - a page of a list query
//! - `<table>s:list:...` - pluralized list keys used by older call sites
//!
//! Code that writes a table without going through
//! [`DatabaseHelper`](crate::db::DatabaseHelper) must call
//! [`invalidate_record`] / [`invalidate_lists`] itself. Both bump the
//! table's generation before deleting, so a read that was already in flight
//! cannot put its older snapshot back.

use std::fmt::Display;

use crate::cache::SharedCache;

pub fn record_key(table: &str, id: impl Display) -> String {
    format!("{}:{}", table, id)
}

pub fn details_key(table: &str, id: impl Display) -> String {
    format!("{}:{}:details", table, id)
}

pub fn list_prefix(table: &str) -> String {
    format!("{}:list:", table)
}

pub fn plural_list_prefix(table: &str) -> String {
    format!("{}s:list:", table)
}

/// Builds the list key for one page and filter set.
///
/// `filters` must already be in a canonical order.
pub fn list_key(table: &str, page: u64, limit: u64, filters: &str) -> String {
    format!("{}page={}:limit={}:{}", list_prefix(table), page, limit, filters)
}

/// Drops every cached list page for `table`. Returns the number of keys removed.
pub async fn invalidate_lists<V: Clone>(cache: &SharedCache<V>, table: &str) -> usize {
    cache.bump_generation(table).await;
    cache.delete_by_prefix(&list_prefix(table)).await
        + cache.delete_by_prefix(&plural_list_prefix(table)).await
}

/// Drops the cached record, its details bundle and every list page for `table`.
pub async fn invalidate_record<V: Clone>(
    cache: &SharedCache<V>,
    table: &str,
    id: impl Display,
) -> usize {
    cache.bump_generation(table).await;
    let mut removed = 0;
    if cache.delete(&record_key(table, &id)).await {
        removed += 1;
    }
    if cache.delete(&details_key(table, &id)).await {
        removed += 1;
    }
    removed + invalidate_lists(cache, table).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(record_key("groups", 7), "groups:7");
        assert_eq!(details_key("sessions", "abc"), "sessions:abc:details");
        assert_eq!(list_prefix("groups"), "groups:list:");
        assert_eq!(plural_list_prefix("group"), "groups:list:");
        assert_eq!(
            list_key("groups", 2, 20, "trainer_id=3"),
            "groups:list:page=2:limit=20:trainer_id=3"
        );
    }

    #[tokio::test]
    async fn test_invalidate_record_leaves_other_records() {
        let cache: SharedCache<u32> = SharedCache::new();
        cache.set("groups:1", 1, 60).await;
        cache.set("groups:1:details", 1, 60).await;
        cache.set("groups:2", 2, 60).await;
        cache.set("groups:list:page=1:limit=20:", 3, 60).await;
        cache.set("groupss:list:page=1", 4, 60).await;
        cache.set("sessions:list:page=1", 5, 60).await;

        let removed = invalidate_record(&cache, "groups", 1).await;

        assert_eq!(removed, 4);
        assert!(cache.has("groups:2").await);
        assert!(cache.has("sessions:list:page=1").await);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_invalidation_bumps_table_generation() {
        let cache: SharedCache<u32> = SharedCache::new();
        let before_lists = cache.generation(&["groups"]).await;
        let sessions = cache.generation(&["sessions"]).await;

        invalidate_lists(&cache, "groups").await;
        let before_record = cache.generation(&["groups"]).await;
        invalidate_record(&cache, "groups", 1).await;

        assert!(!cache.set_if_current("groups:list:page=1", 1, 60, &before_lists).await);
        assert!(!cache.set_if_current("groups:1", 1, 60, &before_record).await);
        assert!(cache.set_if_current("sessions:1", 2, 60, &sessions).await);
        assert_eq!(cache.len().await, 1);
    }
}
