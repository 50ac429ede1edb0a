use async_trait::async_trait;
use thiserror::Error;

use super::entry::CacheEntry;
use super::key::CacheKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache tier unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// One storage layer of the tiered cache.
///
/// Values are stored pre-serialized as JSON. A tier must never return an
/// expired entry and must replace a key's entry atomically on `set`.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Short name used in logs and stats.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<String>>, CacheError>;

    async fn set(&self, key: &CacheKey, entry: CacheEntry<String>) -> Result<(), CacheError>;

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}
