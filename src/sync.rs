//! Sync orchestration between the MRI Qube API and the local mirror tables.
//!
//! Properties and transactions have working sync passes; the remaining
//! entity kinds are placeholders that report failure until implemented.
//! Conflict policy is remote-wins-if-newer, judged on `lastModified`
//! against the stored `mri_last_modified`.

use chrono::{DateTime, NaiveDate, Utc};
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::client::QubeClient;
use crate::models::sync_error::error_type;
use crate::models::sync_status::status;
use crate::models::{EntityKind, SyncFrequency, sync_config::Model as SyncConfigModel};
use crate::repositories::{
    PropertyRepository, SyncConfigRepository, SyncErrorRepository, SyncStatusRepository,
    TransactionRepository, sync_status::SyncStatusUpdate,
};
use crate::resources::ListQuery;

/// Page size requested from list endpoints.
const PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched in one pass. 50 pages of 100 records
/// matches the remote API's own result window.
const MAX_PAGES: u32 = 50;

/// Abort message when a building has no usable sync configuration.
const NOT_CONFIGURED_MESSAGE: &str = "MRI sync not configured or disabled for this building";

/// Outcome of one entity sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySyncReport {
    pub entity: EntityKind,
    pub success: bool,
    pub records_processed: i32,
    pub records_created: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
    pub errors: Vec<String>,
    pub duration_ms: i64,
}

impl EntitySyncReport {
    fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            success: false,
            records_processed: 0,
            records_created: 0,
            records_updated: 0,
            records_skipped: 0,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// Outcome of a full building fan-out.
///
/// When the properties pass fails, dependent entity reports are absent
/// from `reports` rather than marked failed.
#[derive(Debug, Clone, Serialize)]
pub struct BuildingSyncReport {
    pub building_id: String,
    pub reports: BTreeMap<EntityKind, EntitySyncReport>,
    pub duration_ms: i64,
}

impl BuildingSyncReport {
    /// True when every executed pass succeeded.
    pub fn success(&self) -> bool {
        !self.reports.is_empty() && self.reports.values().all(|report| report.success)
    }
}

enum Applied {
    Created,
    Updated,
    Skipped,
}

/// Orchestrates entity sync passes for buildings.
pub struct SyncService {
    client: Arc<QubeClient>,
    configs: SyncConfigRepository,
    statuses: SyncStatusRepository,
    errors: SyncErrorRepository,
    properties: PropertyRepository,
    transactions: TransactionRepository,
}

impl SyncService {
    pub fn new(client: Arc<QubeClient>, db: Arc<DatabaseConnection>) -> Self {
        Self {
            client,
            configs: SyncConfigRepository::new(db.clone()),
            statuses: SyncStatusRepository::new(db.clone()),
            errors: SyncErrorRepository::new(db.clone()),
            properties: PropertyRepository::new(db.clone()),
            transactions: TransactionRepository::new(db),
        }
    }

    /// Syncs the property list for a building.
    pub async fn sync_properties(&self, building_id: &str) -> EntitySyncReport {
        let started = Instant::now();
        let mut report = EntitySyncReport::new(EntityKind::Properties);

        let config = match self.load_enabled_config(building_id).await {
            Ok(config) => config,
            Err(message) => {
                return abort_pass(report, building_id, message, started);
            }
        };

        if let Err(err) = self.client.load_config_from_database(building_id).await {
            let message = format!("Failed to load Qube credentials: {err}");
            return abort_pass(report, building_id, message, started);
        }

        let mut remote_records = Vec::new();
        let mut page = 1;
        loop {
            let query = ListQuery::new().page(page).limit(PAGE_SIZE);
            match self.client.get_properties(query).await {
                Ok(batch) => {
                    let fetched = batch.data.len();
                    remote_records.extend(batch.data);
                    if fetched < PAGE_SIZE as usize {
                        break;
                    }
                    if page >= MAX_PAGES {
                        warn!(building_id = %building_id, pages = page, "Property fetch hit the page cap");
                        break;
                    }
                    page += 1;
                }
                Err(err) => {
                    let message = format!("Failed to fetch properties: {err}");
                    return abort_pass(report, building_id, message, started);
                }
            }
        }

        for remote in &remote_records {
            report.records_processed += 1;
            let existing = match self.properties.find_by_qube_id(building_id, &remote.id).await {
                Ok(existing) => existing,
                Err(err) => {
                    self.note_record_failure(&mut report, building_id, Some(&remote.id), &err)
                        .await;
                    continue;
                }
            };

            let outcome = match existing {
                None => self
                    .properties
                    .insert_from_remote(building_id, remote)
                    .await
                    .map(|_| Applied::Created),
                Some(local) if remote_wins(remote.last_modified, local.mri_last_modified) => self
                    .properties
                    .update_from_remote(&local, remote)
                    .await
                    .map(|_| Applied::Updated),
                Some(_) => Ok(Applied::Skipped),
            };

            match outcome {
                Ok(Applied::Created) => report.records_created += 1,
                Ok(Applied::Updated) => report.records_updated += 1,
                Ok(Applied::Skipped) => report.records_skipped += 1,
                Err(err) => {
                    self.note_record_failure(&mut report, building_id, Some(&remote.id), &err)
                        .await;
                }
            }
        }

        self.finish_pass(building_id, &config, report, started).await
    }

    /// Syncs ledger transactions for a building, optionally bounded by a
    /// date range.
    pub async fn sync_transactions(
        &self,
        building_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EntitySyncReport {
        let started = Instant::now();
        let mut report = EntitySyncReport::new(EntityKind::Transactions);

        let config = match self.load_enabled_config(building_id).await {
            Ok(config) => config,
            Err(message) => {
                return abort_pass(report, building_id, message, started);
            }
        };

        if let Err(err) = self.client.load_config_from_database(building_id).await {
            let message = format!("Failed to load Qube credentials: {err}");
            return abort_pass(report, building_id, message, started);
        }

        let mut remote_records = Vec::new();
        let mut page = 1;
        loop {
            let mut query = ListQuery::new().page(page).limit(PAGE_SIZE);
            if let Some(from) = from {
                query = query.start_date(from);
            }
            if let Some(to) = to {
                query = query.end_date(to);
            }

            match self.client.get_transactions(query).await {
                Ok(batch) => {
                    let fetched = batch.data.len();
                    remote_records.extend(batch.data);
                    if fetched < PAGE_SIZE as usize {
                        break;
                    }
                    if page >= MAX_PAGES {
                        warn!(building_id = %building_id, pages = page, "Transaction fetch hit the page cap");
                        break;
                    }
                    page += 1;
                }
                Err(err) => {
                    let message = format!("Failed to fetch transactions: {err}");
                    return abort_pass(report, building_id, message, started);
                }
            }
        }

        for remote in &remote_records {
            report.records_processed += 1;
            let existing = match self
                .transactions
                .find_by_qube_id(building_id, &remote.id)
                .await
            {
                Ok(existing) => existing,
                Err(err) => {
                    self.note_record_failure(&mut report, building_id, Some(&remote.id), &err)
                        .await;
                    continue;
                }
            };

            let outcome = match existing {
                None => self
                    .transactions
                    .insert_from_remote(building_id, remote)
                    .await
                    .map(|_| Applied::Created),
                Some(local) if remote_wins(remote.last_modified, local.mri_last_modified) => self
                    .transactions
                    .update_from_remote(&local, remote)
                    .await
                    .map(|_| Applied::Updated),
                Some(_) => Ok(Applied::Skipped),
            };

            match outcome {
                Ok(Applied::Created) => report.records_created += 1,
                Ok(Applied::Updated) => report.records_updated += 1,
                Ok(Applied::Skipped) => report.records_skipped += 1,
                Err(err) => {
                    self.note_record_failure(&mut report, building_id, Some(&remote.id), &err)
                        .await;
                }
            }
        }

        self.finish_pass(building_id, &config, report, started).await
    }

    pub async fn sync_units(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::Units)
    }

    pub async fn sync_tenancies(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::Tenancies)
    }

    pub async fn sync_contacts(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::Contacts)
    }

    pub async fn sync_budgets(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::Budgets)
    }

    pub async fn sync_invoices(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::Invoices)
    }

    pub async fn sync_work_orders(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::WorkOrders)
    }

    pub async fn sync_documents(&self, building_id: &str) -> EntitySyncReport {
        self.not_implemented(building_id, EntityKind::Documents)
    }

    /// Full fan-out for a building.
    ///
    /// Properties sync first; only if that pass succeeds do the dependent
    /// entity passes run (their records reference property ids).
    pub async fn sync_building(&self, building_id: &str) -> BuildingSyncReport {
        let started = Instant::now();
        info!(building_id = %building_id, "Starting full building sync");

        let mut reports = BTreeMap::new();

        let properties = self.sync_properties(building_id).await;
        let properties_succeeded = properties.success;
        reports.insert(EntityKind::Properties, properties);

        if properties_succeeded {
            reports.insert(EntityKind::Units, self.sync_units(building_id).await);
            reports.insert(EntityKind::Tenancies, self.sync_tenancies(building_id).await);
            reports.insert(EntityKind::Contacts, self.sync_contacts(building_id).await);
            reports.insert(
                EntityKind::Transactions,
                self.sync_transactions(building_id, None, None).await,
            );
            reports.insert(EntityKind::Budgets, self.sync_budgets(building_id).await);
            reports.insert(EntityKind::Invoices, self.sync_invoices(building_id).await);
            reports.insert(EntityKind::WorkOrders, self.sync_work_orders(building_id).await);
            reports.insert(EntityKind::Documents, self.sync_documents(building_id).await);
        } else {
            warn!(building_id = %building_id, "Properties sync failed, skipping dependent entity syncs");
        }

        let report = BuildingSyncReport {
            building_id: building_id.to_string(),
            reports,
            duration_ms: started.elapsed().as_millis() as i64,
        };

        info!(
            building_id = %building_id,
            passes = report.reports.len(),
            success = report.success(),
            duration_ms = report.duration_ms,
            "Building sync finished"
        );

        report
    }

    /// Loads the building's sync config, mapping every unusable state to
    /// the abort message for the report.
    async fn load_enabled_config(&self, building_id: &str) -> Result<SyncConfigModel, String> {
        match self.configs.find_by_building(building_id).await {
            Ok(Some(config)) if config.is_enabled => Ok(config),
            Ok(_) => Err(NOT_CONFIGURED_MESSAGE.to_string()),
            Err(err) => Err(format!("Failed to load sync config: {err}")),
        }
    }

    /// Records a per-record failure in the report and the error log,
    /// then lets the batch continue.
    async fn note_record_failure(
        &self,
        report: &mut EntitySyncReport,
        building_id: &str,
        entity_id: Option<&str>,
        err: &anyhow::Error,
    ) {
        let message = match entity_id {
            Some(id) => format!("{id}: {err}"),
            None => err.to_string(),
        };
        report.errors.push(message);

        if let Err(log_err) = self
            .errors
            .record(
                building_id,
                report.entity,
                entity_id,
                error_type::DATABASE,
                &err.to_string(),
            )
            .await
        {
            warn!(building_id = %building_id, error = %log_err, "Failed to append sync error row");
        }
    }

    /// Upserts the status row for a completed pass and seals the report.
    async fn finish_pass(
        &self,
        building_id: &str,
        config: &SyncConfigModel,
        mut report: EntitySyncReport,
        started: Instant,
    ) -> EntitySyncReport {
        report.duration_ms = started.elapsed().as_millis() as i64;

        let pass_status = if report.errors.is_empty() {
            status::SUCCEEDED
        } else {
            status::FAILED
        };
        let next_sync_at = next_sync_time(config.frequency_for(report.entity), Utc::now());

        let update = SyncStatusUpdate {
            building_id: building_id.to_string(),
            entity: report.entity,
            status: pass_status.to_string(),
            records_processed: report.records_processed,
            records_created: report.records_created,
            records_updated: report.records_updated,
            records_skipped: report.records_skipped,
            duration_ms: report.duration_ms,
            error_message: if report.errors.is_empty() {
                None
            } else {
                Some(report.errors.join("; "))
            },
            next_sync_at,
        };

        if let Err(err) = self.statuses.upsert(update).await {
            warn!(building_id = %building_id, entity = %report.entity, error = %err, "Failed to upsert sync status");
            report.errors.push(format!("Failed to update sync status: {err}"));
        }

        report.success = report.errors.is_empty();

        counter!("qube_sync_passes_total", "entity" => report.entity.as_str()).increment(1);
        counter!("qube_sync_records_created_total", "entity" => report.entity.as_str())
            .increment(report.records_created as u64);
        counter!("qube_sync_records_updated_total", "entity" => report.entity.as_str())
            .increment(report.records_updated as u64);
        histogram!("qube_sync_pass_duration_ms", "entity" => report.entity.as_str())
            .record(report.duration_ms as f64);

        info!(
            building_id = %building_id,
            entity = %report.entity,
            success = report.success,
            processed = report.records_processed,
            created = report.records_created,
            updated = report.records_updated,
            skipped = report.records_skipped,
            duration_ms = report.duration_ms,
            "Sync pass finished"
        );

        report
    }

    /// Failed report for an entity kind whose sync is not built yet.
    /// No API call, no database writes.
    fn not_implemented(&self, building_id: &str, entity: EntityKind) -> EntitySyncReport {
        warn!(building_id = %building_id, entity = %entity, "Sync requested for unimplemented entity");
        counter!("qube_sync_not_implemented_total", "entity" => entity.as_str()).increment(1);

        let mut report = EntitySyncReport::new(entity);
        report
            .errors
            .push(crate::error::QubeError::NotImplemented(entity).to_string());
        report
    }
}

/// Failed report for a pass aborted before any database write.
fn abort_pass(
    mut report: EntitySyncReport,
    building_id: &str,
    message: String,
    started: Instant,
) -> EntitySyncReport {
    warn!(building_id = %building_id, entity = %report.entity, error = %message, "Sync pass aborted");
    counter!("qube_sync_aborted_total", "entity" => report.entity.as_str()).increment(1);

    report.errors.push(message);
    report.duration_ms = started.elapsed().as_millis() as i64;
    report.success = false;
    report
}

/// Remote-wins-if-newer decision.
///
/// A record with no remote timestamp is never applied over an existing
/// row; a row with no stored timestamp always accepts the remote copy.
fn remote_wins(
    remote: Option<DateTime<Utc>>,
    local: Option<DateTimeWithTimeZone>,
) -> bool {
    match (remote, local) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(remote), Some(local)) => remote > local.with_timezone(&Utc),
    }
}

/// Next due time for a frequency; manual syncs are never due.
fn next_sync_time(frequency: SyncFrequency, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    frequency.interval().map(|interval| now + interval)
}
