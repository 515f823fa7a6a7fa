//! # Sync Config Repository
//!
//! Per-building sync configuration records: the enabled flag, the Qube
//! property the building maps to, and per-entity frequency overrides.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::sync_config::{self, Entity as SyncConfig, Model as SyncConfigModel};

/// Request data for creating or replacing a building's sync configuration
#[derive(Debug, Clone)]
pub struct UpsertSyncConfigRequest {
    pub building_id: String,
    pub qube_property_id: String,
    pub is_enabled: bool,
    /// Map of entity type string to frequency string, e.g. `{"properties": "hourly"}`
    pub frequencies: Option<Value>,
}

/// Repository for sync configuration database operations
pub struct SyncConfigRepository {
    db: Arc<DatabaseConnection>,
}

impl SyncConfigRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the sync configuration for a building
    pub async fn find_by_building(&self, building_id: &str) -> Result<Option<SyncConfigModel>> {
        let row = SyncConfig::find()
            .filter(sync_config::Column::BuildingId.eq(building_id))
            .one(self.db.as_ref())
            .await?;

        Ok(row)
    }

    /// List every building with syncing enabled
    pub async fn list_enabled(&self) -> Result<Vec<SyncConfigModel>> {
        let rows = SyncConfig::find()
            .filter(sync_config::Column::IsEnabled.eq(true))
            .all(self.db.as_ref())
            .await?;

        Ok(rows)
    }

    /// Create or replace a building's sync configuration
    pub async fn upsert(&self, request: UpsertSyncConfigRequest) -> Result<SyncConfigModel> {
        if request.building_id.trim().is_empty() {
            return Err(anyhow!("building id cannot be empty"));
        }

        let now = Utc::now();

        match self.find_by_building(&request.building_id).await? {
            Some(existing) => {
                let update = sync_config::ActiveModel {
                    id: Set(existing.id),
                    qube_property_id: Set(request.qube_property_id),
                    is_enabled: Set(request.is_enabled),
                    frequencies: Set(request.frequencies),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                Ok(update.update(self.db.as_ref()).await?)
            }
            None => {
                let insert = sync_config::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    building_id: Set(request.building_id),
                    qube_property_id: Set(request.qube_property_id),
                    is_enabled: Set(request.is_enabled),
                    frequencies: Set(request.frequencies),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                Ok(insert.insert(self.db.as_ref()).await?)
            }
        }
    }
}
