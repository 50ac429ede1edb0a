//! Append-only audit trail of resolution attempts.
//!
//! The orchestrator records one [`ValidationLog`] per attempt through a
//! [`ValidationLogSink`]. Sinks are write-only from the engine's point of
//! view, and a failing sink never fails a resolution.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::{info, warn};
use thiserror::Error;

use crate::models::ValidationLog;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("Audit storage error: {0}")]
    Storage(String),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ValidationLogSink: Send + Sync {
    async fn record(&self, log: ValidationLog) -> Result<(), AuditError>;
}

/// Emits each record as a structured log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ValidationLogSink for LogSink {
    async fn record(&self, log: ValidationLog) -> Result<(), AuditError> {
        info!(
            target: "territory::audit",
            "postal_code={} valid={} source={} confidence={} operator={} error_code={} cached={} elapsed_ms={}",
            log.postal_code,
            log.is_valid,
            log.source.map(|s| s.as_str()).unwrap_or("-"),
            log.confidence.map(|c| c.as_str()).unwrap_or("-"),
            log.operator_id.as_deref().unwrap_or("-"),
            log.error_code.as_deref().unwrap_or("-"),
            log.from_cache,
            log.processing_time_ms,
        );
        Ok(())
    }
}

/// Keeps the most recent records in memory.
pub struct MemorySink {
    records: Mutex<VecDeque<ValidationLog>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1_024))),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ValidationLog>> {
        self.records.lock().unwrap_or_else(|poisoned| {
            warn!("Audit sink mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn records(&self) -> Vec<ValidationLog> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl ValidationLogSink for MemorySink {
    async fn record(&self, log: ValidationLog) -> Result<(), AuditError> {
        let mut records = self.lock();
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(log);
        Ok(())
    }
}
