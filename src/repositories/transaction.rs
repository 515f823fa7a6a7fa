//! # Transaction Repository
//!
//! Local mirror rows for remote Qube ledger transactions, keyed by
//! `(building_id, qube_id)`.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::transaction::{self, Entity as Transaction, Model as TransactionModel};
use crate::resources::QubeTransaction;

/// Repository for mirrored transaction database operations
pub struct TransactionRepository {
    db: Arc<DatabaseConnection>,
}

impl TransactionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the mirror row for a remote transaction id within a building
    pub async fn find_by_qube_id(
        &self,
        building_id: &str,
        qube_id: &str,
    ) -> Result<Option<TransactionModel>> {
        let row = Transaction::find()
            .filter(transaction::Column::BuildingId.eq(building_id))
            .filter(transaction::Column::QubeId.eq(qube_id))
            .one(self.db.as_ref())
            .await?;

        Ok(row)
    }

    /// Count mirror rows for a building
    pub async fn count_for_building(&self, building_id: &str) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let count = Transaction::find()
            .filter(transaction::Column::BuildingId.eq(building_id))
            .count(self.db.as_ref())
            .await?;

        Ok(count)
    }

    /// Insert a new mirror row from a remote record
    pub async fn insert_from_remote(
        &self,
        building_id: &str,
        remote: &QubeTransaction,
    ) -> Result<TransactionModel> {
        let now = Utc::now();

        let row = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            building_id: Set(building_id.to_string()),
            qube_id: Set(remote.id.clone()),
            property_qube_id: Set(remote.property_id.clone()),
            transaction_date: Set(remote.transaction_date.map(Into::into)),
            amount: Set(remote.amount.unwrap_or(0.0)),
            vat_amount: Set(remote.vat_amount),
            description: Set(remote.description.clone()),
            category: Set(remote.category.clone()),
            status: Set(remote.status.clone()),
            reference: Set(remote.reference.clone()),
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
        existing: &TransactionModel,
        remote: &QubeTransaction,
    ) -> Result<TransactionModel> {
        let row = transaction::ActiveModel {
            id: Set(existing.id),
            property_qube_id: Set(remote.property_id.clone()),
            transaction_date: Set(remote.transaction_date.map(Into::into)),
            amount: Set(remote.amount.unwrap_or(0.0)),
            vat_amount: Set(remote.vat_amount),
            description: Set(remote.description.clone()),
            category: Set(remote.category.clone()),
            status: Set(remote.status.clone()),
            reference: Set(remote.reference.clone()),
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

    fn remote(id: &str, amount: f64) -> QubeTransaction {
        QubeTransaction {
            id: id.to_string(),
            property_id: Some("P-1".to_string()),
            transaction_date: Some(Utc::now()),
            amount: Some(amount),
            vat_amount: Some(amount * 0.2),
            description: Some("Window cleaning".to_string()),
            category: Some("service_charge".to_string()),
            status: Some("posted".to_string()),
            reference: Some("INV-77".to_string()),
            last_modified: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn insert_then_update_round_trips() {
        let db = setup_test_db().await;
        let repo = TransactionRepository::new(db);

        let inserted = repo
            .insert_from_remote("b1", &remote("T-1", 120.0))
            .await
            .unwrap();
        assert_eq!(inserted.amount, 120.0);
        assert_eq!(inserted.reference.as_deref(), Some("INV-77"));

        let updated = repo
            .update_from_remote(&inserted, &remote("T-1", 150.0))
            .await
            .unwrap();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.amount, 150.0);
        assert_eq!(repo.count_for_building("b1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_amount_defaults_to_zero() {
        let db = setup_test_db().await;
        let repo = TransactionRepository::new(db);

        let mut record = remote("T-2", 0.0);
        record.amount = None;

        let inserted = repo.insert_from_remote("b1", &record).await.unwrap();
        assert_eq!(inserted.amount, 0.0);
    }
}
