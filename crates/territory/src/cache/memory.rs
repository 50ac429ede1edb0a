//! In-process cache tier backed by `moka`.
//!
//! Entries live for whatever TTL their [`CacheEntry`] carries, so values
//! backfilled from slower tiers keep their remaining lifetime. Capacity is
//! enforced in least-recently-used order. Moka applies evictions and
//! expirations during its housekeeping; [`MemoryTier::sweep`] forces a pass
//! and a background task can run it on an interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::tier::{CacheError, CacheTier};

/// Counters for the in-process tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Live entries dropped to make room.
    pub evictions: u64,
    /// Entries dropped because their TTL passed.
    pub expirations: u64,
    pub entries: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn record_removal(&self, cause: RemovalCause) {
        match cause {
            RemovalCause::Size => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
            RemovalCause::Expired => {
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

/// Expires each entry after its own remaining TTL.
struct EntryTtl;

impl Expiry<String, CacheEntry<String>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<String>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.remaining())
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<String>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.remaining())
    }
}

pub struct MemoryTier {
    cache: Cache<String, CacheEntry<String>>,
    counters: Arc<Counters>,
}

impl MemoryTier {
    pub fn new(max_entries: usize) -> Self {
        let counters = Arc::new(Counters::default());
        let listener_counters = counters.clone();
        let cache = Cache::builder()
            .max_capacity(max_entries.max(1) as u64)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryTtl)
            .eviction_listener(move |key: Arc<String>, _value, cause| {
                if cause == RemovalCause::Size {
                    debug!("Evicted least recently used cache key {}", key);
                }
                listener_counters.record_removal(cause);
            })
            .build();
        Self { cache, counters }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Entry count as of the last housekeeping pass.
    pub fn len(&self) -> usize {
        usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies pending evictions and drops expired entries. Returns how many
    /// entries expired during the pass.
    pub async fn sweep(&self) -> u64 {
        let before = self.counters.expirations.load(Ordering::Relaxed);
        self.cache.run_pending_tasks().await;
        self.counters.expirations.load(Ordering::Relaxed) - before
    }

    /// Runs [`sweep`](Self::sweep) every `interval` until the tier is dropped
    /// or the returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let tier: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(tier) = tier.upgrade() else {
                    break;
                };
                let removed = tier.sweep().await;
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        })
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<String>>, CacheError> {
        match self.cache.get(key.as_str()).await {
            Some(mut entry) if !entry.is_expired() => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                entry.touch();
                Ok(Some(entry))
            }
            _ => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry<String>) -> Result<(), CacheError> {
        self.cache.insert(key.as_str().to_string(), entry).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.cache.invalidate(key.as_str()).await;
        Ok(())
    }
}
