use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use territory_core::audit::{AuditError, ValidationLogSink};
use territory_core::ValidationLog;

use super::model::{NewValidationLogDB, ValidationLogDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::Result;
use crate::schema::validation_logs;
use crate::schema::validation_logs::dsl::*;
use crate::utils::to_db_timestamp;

/// Append-only store for resolution audit records.
pub struct ValidationLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ValidationLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub async fn insert(&self, log: ValidationLog) -> Result<()> {
        let row = NewValidationLogDB::from(log);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(validation_logs::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    /// Most recent records first.
    pub fn recent(&self, limit: i64) -> Result<Vec<ValidationLog>> {
        let mut conn = get_connection(&self.pool)?;
        validation_logs
            .order(id.desc())
            .limit(limit)
            .select(ValidationLogDB::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ValidationLogDB::into_log)
            .collect()
    }

    pub fn for_postal_code(&self, code: &str) -> Result<Vec<ValidationLog>> {
        let mut conn = get_connection(&self.pool)?;
        validation_logs
            .filter(postal_code.eq(code))
            .order(id.asc())
            .select(ValidationLogDB::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ValidationLogDB::into_log)
            .collect()
    }

    /// Failure counts per error code since `since`, most frequent first.
    pub fn error_counts_since(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>> {
        let mut conn = get_connection(&self.pool)?;
        let rows: Vec<(Option<String>, i64)> = validation_logs
            .filter(logged_at.ge(to_db_timestamp(since)))
            .filter(error_code.is_not_null())
            .group_by(error_code)
            .select((error_code, diesel::dsl::count_star()))
            .order(diesel::dsl::count_star().desc())
            .load(&mut conn)?;
        Ok(rows
            .into_iter()
            .filter_map(|(code, count)| code.map(|code| (code, count)))
            .collect())
    }

    /// Deletes records logged before `cutoff`. Returns the number removed.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = to_db_timestamp(cutoff);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(validation_logs.filter(logged_at.lt(cutoff))).execute(conn)?)
            })
            .await
    }
}

#[async_trait]
impl ValidationLogSink for ValidationLogRepository {
    async fn record(&self, log: ValidationLog) -> std::result::Result<(), AuditError> {
        self.insert(log).await.map_err(AuditError::from)
    }
}
