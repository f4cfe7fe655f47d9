use crate::channels::{Notice, Notifier};
use crate::core::clock::Clock;
use crate::core::models::{InventoryItem, InventoryResponse};
use crate::core::settings::Settings;
use crate::core::state::StateFile;
use crate::core::tracker::{Decision, Suppression, VinTracker};
use crate::providers::InventorySource;
use anyhow::{Context, Result};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    pub interval: Duration,
    /// Run the retention sweep on every Nth cycle.
    pub cleanup_every: u64,
}

impl From<&Settings> for LoopOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            interval: settings.check_interval(),
            cleanup_every: settings.cleanup_every_cycles,
        }
    }
}

/// Outcome counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    /// Match count reported by the source, which may exceed the page size.
    pub listed: u64,
    pub processed: usize,
    pub skipped: usize,
    pub notified: usize,
    pub failed: usize,
    pub suppressed: usize,
    pub removed: usize,
    pub tracked: usize,
}

pub struct PollingLoop {
    tracker: VinTracker,
    source: Arc<dyn InventorySource>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    options: LoopOptions,
    state: Option<StateFile>,
    cycle: u64,
}

impl PollingLoop {
    pub fn new(
        tracker: VinTracker,
        source: Arc<dyn InventorySource>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        options: LoopOptions,
    ) -> Self {
        Self {
            tracker,
            source,
            notifier,
            clock,
            options: LoopOptions {
                cleanup_every: options.cleanup_every.max(1),
                ..options
            },
            state: None,
            cycle: 0,
        }
    }

    /// Persist the tracker after every cleanup sweep and on shutdown.
    pub fn with_state_file(mut self, state: StateFile) -> Self {
        self.state = Some(state);
        self
    }

    pub fn tracker(&self) -> &VinTracker {
        &self.tracker
    }

    /// Polls until `shutdown` resolves. A failed cycle is logged and the loop
    /// carries on after the normal interval.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let config = *self.tracker.config();
        tracing::info!(
            source = self.source.name(),
            channel = self.notifier.channel_type(),
            cooldown_hours = config.cooldown.num_minutes() as f64 / 60.0,
            max_notifications = config.max_notifications,
            interval_secs = self.options.interval.as_secs_f64(),
            tracked = self.tracker.len(),
            "Stock tracker started"
        );

        tokio::pin!(shutdown);

        loop {
            match self.run_cycle().await {
                Ok(report) => log_report(&report),
                Err(e) => {
                    tracing::error!(cycle = self.cycle, error = %format!("{e:#}"), "Inventory check failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.options.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!(cycles = self.cycle, "Shutdown requested, stopping");
                    break;
                }
            }
        }

        self.persist();
        Ok(())
    }

    /// One poll: optional cleanup, fetch, then every record in order.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle += 1;
        let mut report = CycleReport {
            cycle: self.cycle,
            ..CycleReport::default()
        };

        if self.cycle % self.options.cleanup_every == 0 {
            report.removed = self.tracker.cleanup(self.clock.now());
            self.persist();
        }

        let response = self
            .source
            .fetch()
            .await
            .with_context(|| format!("{} fetch failed", self.source.name()))?;

        report.listed = response.total_matches_found;
        self.process_response(&response, &mut report).await;
        report.tracked = self.tracker.len();

        Ok(report)
    }

    async fn process_response(&mut self, response: &InventoryResponse, report: &mut CycleReport) {
        if response.is_empty() {
            tracing::info!(cycle = self.cycle, "No vehicles in stock or no data returned");
            return;
        }

        tracing::info!(
            cycle = self.cycle,
            listed = response.total_matches_found,
            records = response.results.len(),
            "Processing inventory"
        );

        for record in &response.results {
            self.process_record(record, report).await;
        }
    }

    async fn process_record(&mut self, record: &Value, report: &mut CycleReport) {
        let item = match InventoryItem::from_value(record) {
            Ok(item) => item,
            Err(e) => {
                report.skipped += 1;
                tracing::warn!(error = %e, "Skipping inventory record");
                tracing::debug!(%record, "Skipped record");
                return;
            }
        };
        report.processed += 1;

        let now = self.clock.now();
        let is_repeat = self.tracker.is_tracked(&item.vin);

        let notice = match self.tracker.decide(&item.vin, now) {
            Decision::First => Notice::first(),
            Decision::Repeat { notification_count } => Notice::repeat(notification_count),
            Decision::Suppressed(reason) => {
                self.tracker.record_observation(&item.vin, now, false);
                report.suppressed += 1;
                log_suppression(&item.vin, reason);
                return;
            }
        };

        if is_repeat {
            tracing::info!(vin = %item.vin, trim = %item.trim_name, "Vehicle back in stock");
        } else {
            tracing::info!(vin = %item.vin, trim = %item.trim_name, "New vehicle found");
        }

        let delivered = self.notifier.notify(&item, notice).await;
        self.tracker.record_observation(&item.vin, now, delivered);
        if delivered {
            report.notified += 1;
        } else {
            report.failed += 1;
        }
    }

    fn persist(&self) {
        let Some(state) = &self.state else {
            return;
        };
        if let Err(e) = state.save(&self.tracker.snapshot(self.clock.now())) {
            tracing::warn!(path = ?state.path(), error = %format!("{e:#}"), "Failed to save tracker state");
        }
    }
}

fn log_suppression(vin: &str, reason: Suppression) {
    match reason {
        Suppression::CapReached => {
            tracing::debug!(vin, "Notification limit reached");
        }
        Suppression::Cooldown { remaining } => {
            tracing::debug!(
                vin,
                minutes_left = remaining.num_minutes(),
                "Cooling down"
            );
        }
    }
}

fn log_report(report: &CycleReport) {
    tracing::info!(
        cycle = report.cycle,
        processed = report.processed,
        skipped = report.skipped,
        notified = report.notified,
        failed = report.failed,
        suppressed = report.suppressed,
        removed = report.removed,
        tracked = report.tracked,
        "Cycle complete"
    );
}
