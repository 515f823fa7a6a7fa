//! # Property Repository
//!
//! Local mirror rows for remote Qube properties, keyed by
//! `(building_id, qube_id)`.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::property::{self, Entity as Property, Model as PropertyModel};
use crate::resources::QubeProperty;

/// Repository for mirrored property database operations
pub struct PropertyRepository {
    db: Arc<DatabaseConnection>,
}

impl PropertyRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the mirror row for a remote property id within a building
    pub async fn find_by_qube_id(
        &self,
        building_id: &str,
        qube_id: &str,
    ) -> Result<Option<PropertyModel>> {
        let row = Property::find()
            .filter(property::Column::BuildingId.eq(building_id))
            .filter(property::Column::QubeId.eq(qube_id))
            .one(self.db.as_ref())
            .await?;

        Ok(row)
    }

    /// Count mirror rows for a building
    pub async fn count_for_building(&self, building_id: &str) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let count = Property::find()
            .filter(property::Column::BuildingId.eq(building_id))
            .count(self.db.as_ref())
            .await?;

        Ok(count)
    }

    /// Insert a new mirror row from a remote record
    pub async fn insert_from_remote(
        &self,
        building_id: &str,
        remote: &QubeProperty,
    ) -> Result<PropertyModel> {
        let now = Utc::now();

        let row = property::ActiveModel {
            id: Set(Uuid::new_v4()),
            building_id: Set(building_id.to_string()),
            qube_id: Set(remote.id.clone()),
            name: Set(remote.name.clone()),
            address_line1: Set(remote.address_line1.clone()),
            address_line2: Set(remote.address_line2.clone()),
            city: Set(remote.city.clone()),
            postcode: Set(remote.postcode.clone()),
            property_type: Set(remote.property_type.clone()),
            status: Set(remote.status.clone()),
            units_count: Set(remote.units_count),
            payload: Set(Some(serde_json::to_value(remote)?)),
            mri_last_modified: Set(remote.last_modified.map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(row.insert(self.db.as_ref()).await?)
    }

    /// Overwrite an existing mirror row with a newer remote record
    pub async fn update_from_remote(
        &self,
        existing: &PropertyModel,
        remote: &QubeProperty,
    ) -> Result<PropertyModel> {
        let row = property::ActiveModel {
            id: Set(existing.id),
            name: Set(remote.name.clone()),
            address_line1: Set(remote.address_line1.clone()),
            address_line2: Set(remote.address_line2.clone()),
            city: Set(remote.city.clone()),
            postcode: Set(remote.postcode.clone()),
            property_type: Set(remote.property_type.clone()),
            status: Set(remote.status.clone()),
            units_count: Set(remote.units_count),
            payload: Set(Some(serde_json::to_value(remote)?)),
            mri_last_modified: Set(remote.last_modified.map(Into::into)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        Ok(row.update(self.db.as_ref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn remote(id: &str, name: &str) -> QubeProperty {
        QubeProperty {
            id: id.to_string(),
            name: name.to_string(),
            address_line1: Some("1 High Street".to_string()),
            address_line2: None,
            city: Some("Leeds".to_string()),
            postcode: Some("LS1 1AA".to_string()),
            property_type: Some("residential".to_string()),
            status: Some("active".to_string()),
            units_count: Some(12),
            last_modified: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let db = setup_test_db().await;
        let repo = PropertyRepository::new(db);

        let inserted = repo
            .insert_from_remote("b1", &remote("P-1", "Mill House"))
            .await
            .unwrap();
        assert_eq!(inserted.qube_id, "P-1");
        assert_eq!(inserted.name, "Mill House");
        assert!(inserted.payload.is_some());

        let found = repo.find_by_qube_id("b1", "P-1").await.unwrap().unwrap();
        assert_eq!(found.id, inserted.id);

        // Same qube id under another building is a different row space.
        assert!(repo.find_by_qube_id("b2", "P-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites_fields_in_place() {
        let db = setup_test_db().await;
        let repo = PropertyRepository::new(db);

        let inserted = repo
            .insert_from_remote("b1", &remote("P-1", "Mill House"))
            .await
            .unwrap();

        let updated = repo
            .update_from_remote(&inserted, &remote("P-1", "Mill House (renamed)"))
            .await
            .unwrap();

        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.name, "Mill House (renamed)");
        assert_eq!(repo.count_for_building("b1").await.unwrap(), 1);
    }
}
