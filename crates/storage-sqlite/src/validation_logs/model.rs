//! Database models for the append-only validation log.

use diesel::prelude::*;
use territory_core::{Confidence, StrategyId, ValidationLog};

use crate::errors::Result;
use crate::utils::{from_db_timestamp, to_db_timestamp};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::validation_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ValidationLogDB {
    pub id: i32,
    pub postal_code: String,
    pub is_valid: bool,
    pub source: Option<String>,
    pub confidence: Option<String>,
    pub operator_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub from_cache: bool,
    pub logged_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::validation_logs)]
pub struct NewValidationLogDB {
    pub postal_code: String,
    pub is_valid: bool,
    pub source: Option<String>,
    pub confidence: Option<String>,
    pub operator_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
    pub from_cache: bool,
    pub logged_at: String,
}

impl From<ValidationLog> for NewValidationLogDB {
    fn from(log: ValidationLog) -> Self {
        Self {
            postal_code: log.postal_code,
            is_valid: log.is_valid,
            source: log.source.map(|s| s.as_str().to_string()),
            confidence: log.confidence.map(|c| c.as_str().to_string()),
            operator_id: log.operator_id,
            error_code: log.error_code,
            error_message: log.error,
            processing_time_ms: i64::try_from(log.processing_time_ms).unwrap_or(i64::MAX),
            from_cache: log.from_cache,
            logged_at: to_db_timestamp(log.logged_at),
        }
    }
}

impl ValidationLogDB {
    /// Unknown source or confidence strings read back as `None`.
    pub fn into_log(self) -> Result<ValidationLog> {
        Ok(ValidationLog {
            postal_code: self.postal_code,
            is_valid: self.is_valid,
            source: self.source.as_deref().and_then(StrategyId::parse),
            confidence: self.confidence.as_deref().and_then(Confidence::parse),
            operator_id: self.operator_id,
            error_code: self.error_code,
            error: self.error_message,
            processing_time_ms: u64::try_from(self.processing_time_ms).unwrap_or_default(),
            from_cache: self.from_cache,
            logged_at: from_db_timestamp(&self.logged_at)?,
        })
    }
}
