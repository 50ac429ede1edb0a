//! SQLite storage for territory resolution.
//!
//! This crate is the only place in the workspace where Diesel dependencies
//! exist. It implements traits defined in `territory-core`:
//! - [`SqliteCacheTier`]: durable tier for the tiered cache (`CacheTier`)
//! - [`ValidationLogRepository`]: append-only audit trail (`ValidationLogSink`)
//!
//! ```text
//!      territory-core (engine, traits)
//!                  │
//!                  ▼
//!   storage-sqlite (this crate) ── write actor ──┐
//!                  │ r2d2 pool (reads)            │
//!                  ▼                              ▼
//!                         SQLite DB
//! ```
//!
//! All writes are serialized through one connection owned by the write
//! actor; reads use the pool.

pub mod cache;
pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;
pub mod validation_logs;

pub use cache::SqliteCacheTier;
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};
pub use errors::{Result, StorageError};
pub use validation_logs::ValidationLogRepository;

use std::sync::Arc;

/// Opened database: pool, writer and the repositories built on them.
pub struct SqliteStorage {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
}

impl SqliteStorage {
    /// Creates the file if needed, applies migrations and starts the write
    /// actor. Must be called from inside a tokio runtime.
    pub fn open(db_path: &str) -> Result<Self> {
        init(db_path)?;
        let pool = create_pool(db_path)?;
        run_migrations(&pool)?;
        let writer = spawn_writer((*pool).clone());
        Ok(Self { pool, writer })
    }

    pub fn cache_tier(&self) -> SqliteCacheTier {
        SqliteCacheTier::new(self.pool.clone(), self.writer.clone())
    }

    pub fn validation_logs(&self) -> ValidationLogRepository {
        ValidationLogRepository::new(self.pool.clone(), self.writer.clone())
    }
}
