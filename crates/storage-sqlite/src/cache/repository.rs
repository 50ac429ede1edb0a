//! Durable cache tier backed by the `cache_entries` table.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;

use territory_core::cache::{CacheEntry, CacheError, CacheKey, CacheTier};

use super::model::CacheEntryDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::schema::cache_entries;
use crate::schema::cache_entries::dsl::*;
use crate::utils::to_db_timestamp;

pub struct SqliteCacheTier {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteCacheTier {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn get_impl(&self, key: &CacheKey) -> Result<Option<CacheEntryDB>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(cache_entries
            .find(key.as_str())
            .select(CacheEntryDB::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// Deletes every expired row. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = to_db_timestamp(Utc::now());
        let removed = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(cache_entries.filter(expires_at.le(now))).execute(conn)?)
            })
            .await?;
        if removed > 0 {
            debug!("Purged {} expired cache rows", removed);
        }
        Ok(removed)
    }

    /// Number of stored rows in a namespace, expired or not.
    pub fn count_namespace(&self, ns: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(cache_entries
            .filter(namespace.eq(ns))
            .count()
            .get_result(&mut conn)?)
    }
}

#[async_trait]
impl CacheTier for SqliteCacheTier {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, key: &CacheKey) -> std::result::Result<Option<CacheEntry<String>>, CacheError> {
        let Some(row) = self.get_impl(key)? else {
            return Ok(None);
        };
        let entry = row.into_entry()?;
        if entry.is_expired() {
            self.remove(key).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry<String>) -> std::result::Result<(), CacheError> {
        let row = CacheEntryDB::from_entry(key, &entry);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::replace_into(cache_entries::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> std::result::Result<(), CacheError> {
        let target = key.as_str().to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(cache_entries.find(target)).execute(conn)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
