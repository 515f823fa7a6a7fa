//! # Sync Error Repository
//!
//! Append-only log of per-record sync failures. The sync path only ever
//! inserts here; resolution is an operator action.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::EntityKind;
use crate::models::sync_error::{self, Entity as SyncError, Model as SyncErrorModel};

/// Repository for sync error database operations
pub struct SyncErrorRepository {
    db: Arc<DatabaseConnection>,
}

impl SyncErrorRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a failure row
    pub async fn record(
        &self,
        building_id: &str,
        entity: EntityKind,
        entity_id: Option<&str>,
        error_type: &str,
        error_message: &str,
    ) -> Result<SyncErrorModel> {
        let row = sync_error::ActiveModel {
            id: Set(Uuid::new_v4()),
            building_id: Set(building_id.to_string()),
            entity_type: Set(entity.as_str().to_string()),
            entity_id: Set(entity_id.map(str::to_string)),
            error_type: Set(error_type.to_string()),
            error_message: Set(error_message.to_string()),
            resolved: Set(false),
            created_at: Set(Utc::now().into()),
        };

        Ok(row.insert(self.db.as_ref()).await?)
    }

    /// List unresolved failures for a building, newest first
    pub async fn list_unresolved(&self, building_id: &str) -> Result<Vec<SyncErrorModel>> {
        let rows = SyncError::find()
            .filter(sync_error::Column::BuildingId.eq(building_id))
            .filter(sync_error::Column::Resolved.eq(false))
            .order_by_desc(sync_error::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sync_error::error_type;
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

    #[tokio::test]
    async fn record_appends_rows() {
        let db = setup_test_db().await;
        let repo = SyncErrorRepository::new(db);

        repo.record(
            "b1",
            EntityKind::Properties,
            Some("P-1"),
            error_type::DATABASE,
            "insert failed",
        )
        .await
        .unwrap();
        repo.record("b1", EntityKind::Properties, None, error_type::API, "fetch failed")
            .await
            .unwrap();

        let rows = repo.list_unresolved("b1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| !r.resolved));
        assert!(rows.iter().any(|r| r.entity_id.as_deref() == Some("P-1")));
    }

    #[tokio::test]
    async fn listing_is_scoped_to_building() {
        let db = setup_test_db().await;
        let repo = SyncErrorRepository::new(db);

        repo.record("b1", EntityKind::Transactions, None, error_type::API, "x")
            .await
            .unwrap();

        assert!(repo.list_unresolved("b2").await.unwrap().is_empty());
    }
}
