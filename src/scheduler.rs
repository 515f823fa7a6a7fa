//! # Sync Scheduler
//!
//! Background task that walks the enabled sync configurations each tick and
//! triggers entity passes whose `next_sync_at` has come due. Cadence state
//! lives in the `qube_sync_status` rows written by the orchestrator, so a
//! restarted process picks up where the last one left off.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use sea_orm::DatabaseConnection;
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::models::sync_status::Model as SyncStatusModel;
use crate::models::{EntityKind, SyncFrequency};
use crate::repositories::{SyncConfigRepository, SyncStatusRepository};
use crate::sync::{EntitySyncReport, SyncService};

/// Entity kinds the scheduler triggers. Kinds without a working sync pass
/// are left to manual invocation so their failure stubs do not churn the
/// status tables every tick.
const SCHEDULED_KINDS: [EntityKind; 2] = [EntityKind::Properties, EntityKind::Transactions];

/// Background scheduler service.
pub struct SyncScheduler {
    config: SchedulerConfig,
    sync: Arc<SyncService>,
    configs: SyncConfigRepository,
    statuses: SyncStatusRepository,
}

/// Counters for one scheduler tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickStats {
    /// (building, entity) pairs evaluated.
    pub examined: u64,
    /// Pairs that were due and ran.
    pub triggered: u64,
    /// Triggered passes whose report came back unsuccessful, plus pairs
    /// whose status lookup failed.
    pub failed: u64,
    /// Pairs skipped because they were not due or are manual-only.
    pub skipped_not_due: u64,
}

impl SyncScheduler {
    pub fn new(
        config: SchedulerConfig,
        db: Arc<DatabaseConnection>,
        sync: Arc<SyncService>,
    ) -> Self {
        Self {
            config,
            sync,
            configs: SyncConfigRepository::new(db.clone()),
            statuses: SyncStatusRepository::new(db),
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.tick_interval_seconds,
            "Starting sync scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    if let Err(err) = self.tick().await {
                        error!(error = ?err, "Scheduler tick failed");
                    }
                    histogram!("qube_scheduler_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    /// Evaluate every enabled building once and run the due passes.
    pub async fn tick(&self) -> Result<TickStats> {
        let now = Utc::now();
        let mut stats = TickStats::default();

        let enabled = self.configs.list_enabled().await?;
        gauge!("qube_scheduler_enabled_buildings").set(enabled.len() as f64);

        for config in &enabled {
            for kind in SCHEDULED_KINDS {
                stats.examined += 1;

                if config.frequency_for(kind) == SyncFrequency::Manual {
                    stats.skipped_not_due += 1;
                    continue;
                }

                let status = match self.statuses.find(&config.building_id, kind).await {
                    Ok(status) => status,
                    Err(err) => {
                        stats.failed += 1;
                        warn!(
                            building_id = %config.building_id,
                            entity = %kind,
                            error = %err,
                            "Failed to load sync status for scheduling"
                        );
                        continue;
                    }
                };

                if !is_due(status.as_ref(), now) {
                    stats.skipped_not_due += 1;
                    continue;
                }

                stats.triggered += 1;
                counter!("qube_scheduler_passes_triggered_total", "entity" => kind.as_str())
                    .increment(1);

                let report = self.run_pass(&config.building_id, kind).await;
                if !report.success {
                    stats.failed += 1;
                    warn!(
                        building_id = %config.building_id,
                        entity = %kind,
                        errors = ?report.errors,
                        "Scheduled sync pass failed"
                    );
                }
            }
        }

        counter!("qube_scheduler_ticks_total").increment(1);
        debug!(
            examined = stats.examined,
            triggered = stats.triggered,
            failed = stats.failed,
            skipped_not_due = stats.skipped_not_due,
            "Scheduler tick completed"
        );

        Ok(stats)
    }

    async fn run_pass(&self, building_id: &str, kind: EntityKind) -> EntitySyncReport {
        match kind {
            EntityKind::Properties => self.sync.sync_properties(building_id).await,
            EntityKind::Units => self.sync.sync_units(building_id).await,
            EntityKind::Tenancies => self.sync.sync_tenancies(building_id).await,
            EntityKind::Contacts => self.sync.sync_contacts(building_id).await,
            EntityKind::Transactions => self.sync.sync_transactions(building_id, None, None).await,
            EntityKind::Budgets => self.sync.sync_budgets(building_id).await,
            EntityKind::Invoices => self.sync.sync_invoices(building_id).await,
            EntityKind::WorkOrders => self.sync.sync_work_orders(building_id).await,
            EntityKind::Documents => self.sync.sync_documents(building_id).await,
        }
    }
}

/// A pair with no status row has never synced and is due immediately. A row
/// without a recorded `next_sync_at` is also due, which lets a building
/// switched from manual to a timed frequency catch up on the next tick.
fn is_due(status: Option<&SyncStatusModel>, now: DateTime<Utc>) -> bool {
    match status {
        None => true,
        Some(row) => row
            .next_sync_at
            .map(|next| next.with_timezone(&Utc) <= now)
            .unwrap_or(true),
    }
}
