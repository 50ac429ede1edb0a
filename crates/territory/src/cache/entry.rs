use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Selects the time-to-live of a cached value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Resolutions won by the external registry.
    ExternalRegistry,
    /// Resolutions won by extension, street or static configuration.
    AddressResolution,
    /// Resolutions only the postal-code fallback could answer.
    PostalFallback,
    /// Postal-code-only pre-checks.
    PostalAnalysis,
    /// Static boundary lookups keyed by postal code.
    StaticBoundary,
}

impl CacheCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExternalRegistry => "external_registry",
            Self::AddressResolution => "address_resolution",
            Self::PostalFallback => "postal_fallback",
            Self::PostalAnalysis => "postal_analysis",
            Self::StaticBoundary => "static_boundary",
        }
    }
}

const HOUR: u64 = 60 * 60;

/// TTL per category, in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TtlTable {
    pub external_registry_secs: u64,
    pub address_resolution_secs: u64,
    pub postal_fallback_secs: u64,
    pub postal_analysis_secs: u64,
    pub static_boundary_secs: u64,
}

impl Default for TtlTable {
    fn default() -> Self {
        Self {
            external_registry_secs: HOUR,
            address_resolution_secs: 24 * HOUR,
            postal_fallback_secs: 6 * HOUR,
            postal_analysis_secs: 24 * HOUR,
            static_boundary_secs: 7 * 24 * HOUR,
        }
    }
}

impl TtlTable {
    pub fn ttl(&self, category: CacheCategory) -> Duration {
        let secs = match category {
            CacheCategory::ExternalRegistry => self.external_registry_secs,
            CacheCategory::AddressResolution => self.address_resolution_secs,
            CacheCategory::PostalFallback => self.postal_fallback_secs,
            CacheCategory::PostalAnalysis => self.postal_analysis_secs,
            CacheCategory::StaticBoundary => self.static_boundary_secs,
        };
        Duration::from_secs(secs)
    }
}

/// A cached value with its bookkeeping. Every tier stores this shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: DateTime<Utc>,
    pub ttl_ms: u64,
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            access_count: 0,
            last_accessed_at: now,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::try_milliseconds(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX))
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        (self.expires_at() - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Records a read.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
    }

    /// Swaps the payload, keeping creation time and counters.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEntry<U> {
        CacheEntry {
            value: f(self.value),
            created_at: self.created_at,
            ttl_ms: self.ttl_ms,
            access_count: self.access_count,
            last_accessed_at: self.last_accessed_at,
        }
    }
}
