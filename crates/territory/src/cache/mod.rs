//! Multi-tier cache in front of the resolution chain.
//!
//! Tiers, fastest first:
//! - [`MemoryTier`]: per-process `moka` cache, LRU-bounded, swept on an interval
//! - `RedisTier`: shared across instances (`cache-redis` feature)
//! - durable store: provided by a storage crate through [`CacheTier`]
//! - [`StaticFileTier`]: JSON documents on disk
//!
//! [`TieredCache`] reads through and writes through all of them.

mod entry;
mod file;
mod key;
mod memory;
#[cfg(feature = "cache-redis")]
mod redis;
mod tier;
mod tiered;

pub use entry::{CacheCategory, CacheEntry, TtlTable};
pub use file::StaticFileTier;
pub use key::{CacheKey, ANALYSIS_NAMESPACE, RESOLUTION_NAMESPACE};
pub use memory::{CacheStats, MemoryTier};
#[cfg(feature = "cache-redis")]
pub use self::redis::RedisTier;
pub use tier::{CacheError, CacheTier};
pub use tiered::TieredCache;
