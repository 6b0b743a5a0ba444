//! Durable response cache for offline support.
//!
//! This module provides the persistent response store that:
//! - Keeps raw request/response pairs keyed by full request URL
//! - Partitions entries into generations (`<app>-api-v<N>`, `<app>-static-v<N>`)
//! - Applies cache-first and stale-while-revalidate strategies around a fetcher
//! - Garbage-collects partitions of older generations once per activation

mod generation;
mod layer;
mod storage;
mod traits;

pub use generation::{CacheGeneration, Partition};
pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::{CacheEntry, CacheResult, CacheSource, RequestKey, StoredResponse};
