//! Ranking Refresh Background Job
//!
//! Rebuilds one cache slot on a fixed interval so rankings stay fresh
//! without waiting for an explicit `/create-*-heap` call:
//!
//! 1. User ranking every 30 minutes
//! 2. Post ranking every 15 minutes
//!
//! A failed cycle is logged and the loop carries on.

use crate::config::SchedulerConfig;
use crate::services::refresh::{CacheSlot, RefreshError, RefreshOrchestrator, RefreshReport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Configuration for one slot's refresh loop
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub initial_delay: Duration,
}

impl RefreshSchedulerConfig {
    pub fn user_ranking(config: &SchedulerConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: Duration::from_secs(config.user_interval_secs),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        }
    }

    pub fn post_ranking(config: &SchedulerConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: Duration::from_secs(config.post_interval_secs),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        }
    }
}

/// Start the refresh loop for `slot`. Returns immediately when disabled.
pub async fn start_refresh_scheduler(
    orchestrator: Arc<RefreshOrchestrator>,
    slot: Arc<CacheSlot>,
    config: RefreshSchedulerConfig,
) {
    if !config.enabled {
        tracing::info!(slot = %slot.kind(), "Refresh scheduler disabled by configuration");
        return;
    }

    tracing::info!(
        slot = %slot.kind(),
        interval_secs = config.interval.as_secs(),
        initial_delay_secs = config.initial_delay.as_secs(),
        "Starting refresh scheduler"
    );

    sleep(config.initial_delay).await;

    loop {
        // Outcome is already logged by the cycle
        let _ = run_refresh_cycle(&orchestrator, &slot).await;
        sleep(config.interval).await;
    }
}

/// Run a single scheduled refresh of `slot`
pub async fn run_refresh_cycle(
    orchestrator: &RefreshOrchestrator,
    slot: &CacheSlot,
) -> Result<RefreshReport, RefreshError> {
    let cycle_start = Instant::now();
    let outcome = orchestrator.refresh(slot).await;

    match &outcome {
        Ok(report) => {
            tracing::info!(
                slot = %slot.kind(),
                inserted = report.inserted,
                skipped = report.skipped,
                duration_ms = cycle_start.elapsed().as_millis(),
                "Scheduled refresh completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                slot = %slot.kind(),
                error = %e,
                duration_ms = cycle_start.elapsed().as_millis(),
                "Scheduled refresh failed"
            );
        }
    }

    outcome
}
