//! Expired Entry Purge
//!
//! Optional background task that sweeps expired cache entries. Reads already
//! evict lazily; the sweep only bounds memory held by keys nobody reads again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns the purge loop, or returns `None` when `interval_secs` is 0.
///
/// The returned handle is aborted on shutdown.
pub fn spawn_purge_task<V>(cache: SharedCache<V>, interval_secs: u64) -> Option<JoinHandle<()>>
where
    V: Clone + Send + Sync + 'static,
{
    if interval_secs == 0 {
        return None;
    }
    let interval = Duration::from_secs(interval_secs);

    Some(tokio::spawn(async move {
        info!(interval_secs, "starting expired entry purge task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired().await;
            if removed > 0 {
                info!(removed, "purged expired cache entries");
            } else {
                debug!("no expired cache entries to purge");
            }
        }
    }))
}
