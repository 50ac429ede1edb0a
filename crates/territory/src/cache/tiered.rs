use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::entry::{CacheCategory, CacheEntry, TtlTable};
use super::key::CacheKey;
use super::memory::{CacheStats, MemoryTier};
use super::tier::CacheTier;

/// Read-through, write-through cache over an ordered list of tiers.
///
/// The in-process tier is always first. Slower tiers are consulted in the
/// order they were added. Tier failures never reach the caller: a failed
/// read is a miss and a failed write is logged and dropped.
pub struct TieredCache {
    memory: Arc<MemoryTier>,
    tiers: Vec<Arc<dyn CacheTier>>,
    ttl: TtlTable,
}

impl TieredCache {
    pub fn new(memory: Arc<MemoryTier>, ttl: TtlTable) -> Self {
        let first: Arc<dyn CacheTier> = memory.clone();
        Self {
            memory,
            tiers: vec![first],
            ttl,
        }
    }

    /// Appends a slower tier.
    pub fn with_tier(mut self, tier: Arc<dyn CacheTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn memory(&self) -> &Arc<MemoryTier> {
        &self.memory
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub fn ttl_table(&self) -> &TtlTable {
        &self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.memory.stats()
    }

    /// Returns the first live entry, copying it into every faster tier.
    pub async fn get_entry(&self, key: &CacheKey) -> Option<CacheEntry<String>> {
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(Some(entry)) if !entry.is_expired() => {
                    debug!("Cache hit for {} in {} tier", key, tier.name());
                    if index > 0 {
                        self.fan_out(&self.tiers[..index], key, &entry).await;
                    }
                    return Some(entry);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("Cache tier {} read failed for {}: {}", tier.name(), key, err);
                }
            }
        }
        None
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = self.get_entry(key).await?;
        match serde_json::from_str(&entry.value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Discarding undecodable cache entry {}: {}", key, err);
                None
            }
        }
    }

    /// Stores `value` in every tier with the category's TTL.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, category: CacheCategory) {
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(err) => {
                warn!("Not caching {}: {}", key, err);
                return;
            }
        };
        let entry = CacheEntry::new(body, self.ttl.ttl(category));
        self.fan_out(&self.tiers, key, &entry).await;
    }

    /// Removes `key` from every tier.
    pub async fn invalidate(&self, key: &CacheKey) {
        let removals = self.tiers.iter().map(|tier| async move {
            (tier.name(), tier.remove(key).await)
        });
        for (name, result) in join_all(removals).await {
            if let Err(err) = result {
                warn!("Cache tier {} failed to remove {}: {}", name, key, err);
            }
        }
    }

    async fn fan_out(&self, tiers: &[Arc<dyn CacheTier>], key: &CacheKey, entry: &CacheEntry<String>) {
        let writes = tiers.iter().map(|tier| async move {
            (tier.name(), tier.set(key, entry.clone()).await)
        });
        for (name, result) in join_all(writes).await {
            if let Err(err) = result {
                warn!("Cache tier {} failed to store {}: {}", name, key, err);
            }
        }
    }
}
