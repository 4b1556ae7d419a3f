//! Query cache with tag-based invalidation.
//!
//! This module knows nothing about HTTP or books:
//! - Entries are keyed by operation name plus normalized arguments
//! - Entries carry tags; invalidating a tag marks every matching entry stale
//! - Fetch tokens keep slow responses from overwriting newer ones
//! - Entries without subscribers are evicted after a retention window

mod key;
mod store;

pub use key::{CacheKey, Tag};
pub use store::{CacheStore, EntrySnapshot, EntryStatus, FetchMode, FetchTicket, Resolution};
