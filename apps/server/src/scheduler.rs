//! Background maintenance for the durable stores.
//!
//! Purges expired cache rows and prunes old validation logs on a fixed
//! hourly interval.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

const MAINTENANCE_INTERVAL_SECS: u64 = 60 * 60;

/// Delay before the first run so startup is not slowed down.
const INITIAL_DELAY_SECS: u64 = 60;

pub fn start_maintenance_scheduler(state: Arc<AppState>) {
    tokio::spawn(async move {
        info!("Maintenance scheduler started (hourly)");
        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        let mut ticker = interval(Duration::from_secs(MAINTENANCE_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            run_maintenance(&state).await;
        }
    });
}

pub async fn run_maintenance(state: &AppState) {
    match state.cache_tier.purge_expired().await {
        Ok(0) => debug!("No expired cache rows"),
        Ok(removed) => info!("Purged {} expired cache rows", removed),
        Err(e) => warn!("Cache purge failed: {}", e),
    }

    if state.log_retention_days <= 0 {
        return;
    }
    let cutoff = Utc::now() - ChronoDuration::days(state.log_retention_days);
    match state.validation_logs.prune_before(cutoff).await {
        Ok(0) => debug!("No validation logs older than {} days", state.log_retention_days),
        Ok(removed) => info!("Pruned {} validation logs", removed),
        Err(e) => warn!("Validation log pruning failed: {}", e),
    }
}
