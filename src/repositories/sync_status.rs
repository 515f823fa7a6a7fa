//! # Sync Status Repository
//!
//! One row per (building, entity type) summarizing the latest sync pass.
//! Rows are overwritten on every completed pass; no history is kept here.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::EntityKind;
use crate::models::sync_status::{self, Entity as SyncStatus, Model as SyncStatusModel};

/// Summary of a finished sync pass, written over the previous row
#[derive(Debug, Clone)]
pub struct SyncStatusUpdate {
    pub building_id: String,
    pub entity: EntityKind,
    pub status: String,
    pub records_processed: i32,
    pub records_created: i32,
    pub records_updated: i32,
    pub records_skipped: i32,
    pub duration_ms: i64,
    pub error_message: Option<String>,
    pub next_sync_at: Option<DateTime<Utc>>,
}

/// Repository for sync status database operations
pub struct SyncStatusRepository {
    db: Arc<DatabaseConnection>,
}

impl SyncStatusRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the latest status row for a (building, entity) pair
    pub async fn find(
        &self,
        building_id: &str,
        entity: EntityKind,
    ) -> Result<Option<SyncStatusModel>> {
        let row = SyncStatus::find()
            .filter(sync_status::Column::BuildingId.eq(building_id))
            .filter(sync_status::Column::EntityType.eq(entity.as_str()))
            .one(self.db.as_ref())
            .await?;

        Ok(row)
    }

    /// List every status row for a building
    pub async fn list_for_building(&self, building_id: &str) -> Result<Vec<SyncStatusModel>> {
        let rows = SyncStatus::find()
            .filter(sync_status::Column::BuildingId.eq(building_id))
            .all(self.db.as_ref())
            .await?;

        Ok(rows)
    }

    /// Overwrite (or create) the status row for a (building, entity) pair
    pub async fn upsert(&self, update: SyncStatusUpdate) -> Result<SyncStatusModel> {
        let now = Utc::now();

        match self.find(&update.building_id, update.entity).await? {
            Some(existing) => {
                let row = sync_status::ActiveModel {
                    id: Set(existing.id),
                    status: Set(update.status),
                    last_synced_at: Set(now.into()),
                    records_processed: Set(update.records_processed),
                    records_created: Set(update.records_created),
                    records_updated: Set(update.records_updated),
                    records_skipped: Set(update.records_skipped),
                    duration_ms: Set(update.duration_ms),
                    error_message: Set(update.error_message),
                    next_sync_at: Set(update.next_sync_at.map(Into::into)),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                Ok(row.update(self.db.as_ref()).await?)
            }
            None => {
                let row = sync_status::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    building_id: Set(update.building_id),
                    entity_type: Set(update.entity.as_str().to_string()),
                    status: Set(update.status),
                    last_synced_at: Set(now.into()),
                    records_processed: Set(update.records_processed),
                    records_created: Set(update.records_created),
                    records_updated: Set(update.records_updated),
                    records_skipped: Set(update.records_skipped),
                    duration_ms: Set(update.duration_ms),
                    error_message: Set(update.error_message),
                    next_sync_at: Set(update.next_sync_at.map(Into::into)),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                Ok(row.insert(self.db.as_ref()).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sync_status::status;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};

    async fn setup_test_db() -> Arc<DatabaseConnection> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "PRAGMA foreign_keys = OFF".to_string(),
        ))
        .await
        .unwrap();
        Arc::new(db)
    }

    fn succeeded_update(building_id: &str, entity: EntityKind) -> SyncStatusUpdate {
        SyncStatusUpdate {
            building_id: building_id.to_string(),
            entity,
            status: status::SUCCEEDED.to_string(),
            records_processed: 5,
            records_created: 3,
            records_updated: 1,
            records_skipped: 1,
            duration_ms: 120,
            error_message: None,
            next_sync_at: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn upsert_inserts_then_overwrites() {
        let db = setup_test_db().await;
        let repo = SyncStatusRepository::new(db);

        let first = repo
            .upsert(succeeded_update("b1", EntityKind::Properties))
            .await
            .unwrap();
        assert_eq!(first.records_created, 3);

        let mut second = succeeded_update("b1", EntityKind::Properties);
        second.status = status::FAILED.to_string();
        second.records_created = 0;
        second.error_message = Some("boom".to_string());

        let overwritten = repo.upsert(second).await.unwrap();
        assert_eq!(overwritten.id, first.id);
        assert_eq!(overwritten.status, status::FAILED);
        assert_eq!(overwritten.records_created, 0);
        assert_eq!(overwritten.error_message.as_deref(), Some("boom"));

        // Still exactly one row for the pair.
        let rows = repo.list_for_building("b1").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn rows_are_scoped_per_entity() {
        let db = setup_test_db().await;
        let repo = SyncStatusRepository::new(db);

        repo.upsert(succeeded_update("b1", EntityKind::Properties))
            .await
            .unwrap();
        repo.upsert(succeeded_update("b1", EntityKind::Transactions))
            .await
            .unwrap();

        assert_eq!(repo.list_for_building("b1").await.unwrap().len(), 2);
        assert!(
            repo.find("b1", EntityKind::Units)
                .await
                .unwrap()
                .is_none()
        );
    }
}
