//! Database model for durable cache entries.

use diesel::prelude::*;
use territory_core::cache::{CacheEntry, CacheKey};

use crate::errors::Result;
use crate::utils::{from_db_timestamp, to_db_timestamp};

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::cache_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CacheEntryDB {
    pub cache_key: String,
    pub namespace: String,
    pub value: String,
    pub created_at: String,
    pub expires_at: String,
    pub ttl_ms: i64,
    pub access_count: i64,
    pub last_accessed_at: String,
}

impl CacheEntryDB {
    pub fn from_entry(key: &CacheKey, entry: &CacheEntry<String>) -> Self {
        Self {
            cache_key: key.as_str().to_string(),
            namespace: key.namespace().to_string(),
            value: entry.value.clone(),
            created_at: to_db_timestamp(entry.created_at),
            expires_at: to_db_timestamp(entry.expires_at()),
            ttl_ms: i64::try_from(entry.ttl_ms).unwrap_or(i64::MAX),
            access_count: i64::try_from(entry.access_count).unwrap_or(i64::MAX),
            last_accessed_at: to_db_timestamp(entry.last_accessed_at),
        }
    }

    pub fn into_entry(self) -> Result<CacheEntry<String>> {
        Ok(CacheEntry {
            value: self.value,
            created_at: from_db_timestamp(&self.created_at)?,
            ttl_ms: u64::try_from(self.ttl_ms).unwrap_or_default(),
            access_count: u64::try_from(self.access_count).unwrap_or_default(),
            last_accessed_at: from_db_timestamp(&self.last_accessed_at)?,
        })
    }
}
