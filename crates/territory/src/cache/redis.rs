//! Distributed cache tier backed by Redis.
//!
//! Entries are stored as JSON strings with a server-side expiry equal to the
//! entry's remaining TTL. Connection loss surfaces as `Unavailable`; the
//! tiered cache treats that as a miss.

use async_trait::async_trait;
use log::info;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::tier::{CacheError, CacheTier};

pub struct RedisTier {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisTier {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let manager = ConnectionManager::new(client).await.map_err(unavailable)?;
        info!("Connected to redis cache tier");
        Ok(Self {
            manager,
            prefix: prefix.into(),
        })
    }

    fn redis_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

fn backend(err: redis::RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        unavailable(err)
    } else {
        CacheError::Backend(err.to_string())
    }
}

#[async_trait]
impl CacheTier for RedisTier {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry<String>>, CacheError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(self.redis_key(key)).await.map_err(backend)?;
        match raw {
            Some(raw) => {
                let entry: CacheEntry<String> = serde_json::from_str(&raw)?;
                Ok((!entry.is_expired()).then_some(entry))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry<String>) -> Result<(), CacheError> {
        let seconds = entry.remaining().as_secs();
        if seconds == 0 {
            return Ok(());
        }
        let body = serde_json::to_string(&entry)?;
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(self.redis_key(key), body, seconds)
            .await
            .map_err(backend)
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(self.redis_key(key)).await.map_err(backend)
    }
}
