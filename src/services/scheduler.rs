//! NAV refresh scheduler
//!
//! Periodic background task that triggers the NAV refresh pass, decoupled
//! from request handling. A slot where the whole pass fails (positions
//! could not be loaded, commit failed) is retried a bounded number of
//! times with backoff; per-position quote failures are handled inside the
//! pass itself and never retried here.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::services::investment::{InvestmentService, RefreshOutcome};

/// Periodic trigger for the NAV refresh job.
pub struct NavRefreshScheduler {
    investments: Arc<InvestmentService>,
    config: SchedulerConfig,
}

impl NavRefreshScheduler {
    pub fn new(investments: Arc<InvestmentService>, config: SchedulerConfig) -> Self {
        Self {
            investments,
            config,
        }
    }

    /// Spawn the scheduler loop. The first pass runs one full interval
    /// after startup.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.config.refresh_interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it.
            interval.tick().await;

            loop {
                interval.tick().await;
                self.run_slot().await;
            }
        })
    }

    /// Run one scheduled slot, retrying whole-pass failures with backoff.
    pub async fn run_slot(&self) {
        for attempt in 1..=self.config.max_attempts {
            match self.investments.refresh_all_navs().await {
                Ok(RefreshOutcome::Completed { updated, failed }) => {
                    tracing::info!(updated, failed, "Scheduled NAV refresh completed");
                    return;
                }
                Ok(RefreshOutcome::AlreadyRunning) => {
                    tracing::warn!("NAV refresh already in flight, skipping this slot");
                    return;
                }
                Err(e) if attempt < self.config.max_attempts => {
                    tracing::warn!(attempt, "NAV refresh pass failed, will retry: {:#}", e);
                    tokio::time::sleep(Duration::from_secs(
                        self.config.retry_backoff_secs * attempt as u64,
                    ))
                    .await;
                }
                Err(e) => {
                    tracing::error!(
                        attempts = self.config.max_attempts,
                        "NAV refresh pass failed, giving up until next slot: {:#}",
                        e
                    );
                }
            }
        }
    }
}
