//! Helpers shared by the repositories.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::Result;

/// Renders a timestamp as fixed-width RFC 3339 UTC with millisecond
/// precision. Stored this way, text comparison in SQL matches time order.
pub fn to_db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
