//! Cache Module
//!
//! In-memory TTL cache with lazy expiration and prefix invalidation.

mod clock;
mod entry;
pub mod keys;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use shared::SharedCache;
pub use stats::CacheStats;
pub use store::{CacheStore, Generation};
