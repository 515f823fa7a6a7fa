//! # Credential Repository
//!
//! Building-scoped MRI Qube credential records, including the persisted
//! token cache columns maintained by the token manager.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::credential::{self, Entity as QubeCredential, Model as CredentialModel};

/// Request data for creating or replacing a building's credentials
#[derive(Debug, Clone)]
pub struct UpsertCredentialRequest {
    pub building_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub environment: String,
}

/// Repository for Qube credential database operations
pub struct CredentialRepository {
    db: Arc<DatabaseConnection>,
}

impl CredentialRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the credential record for a building
    pub async fn find_by_building(&self, building_id: &str) -> Result<Option<CredentialModel>> {
        let row = QubeCredential::find()
            .filter(credential::Column::BuildingId.eq(building_id))
            .one(self.db.as_ref())
            .await?;

        Ok(row)
    }

    /// Create or replace a building's credentials.
    ///
    /// Replacing clears any persisted token cache columns since a token
    /// issued for the old credentials is no longer trustworthy.
    pub async fn upsert(&self, request: UpsertCredentialRequest) -> Result<CredentialModel> {
        if request.building_id.trim().is_empty() {
            return Err(anyhow!("building id cannot be empty"));
        }

        let now = Utc::now();

        match self.find_by_building(&request.building_id).await? {
            Some(existing) => {
                let update = credential::ActiveModel {
                    id: Set(existing.id),
                    client_id: Set(request.client_id),
                    client_secret: Set(request.client_secret),
                    base_url: Set(request.base_url),
                    environment: Set(request.environment),
                    access_token: Set(None),
                    token_type: Set(None),
                    token_expires_in: Set(None),
                    token_obtained_at: Set(None),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                Ok(update.update(self.db.as_ref()).await?)
            }
            None => {
                let insert = credential::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    building_id: Set(request.building_id),
                    client_id: Set(request.client_id),
                    client_secret: Set(request.client_secret),
                    base_url: Set(request.base_url),
                    environment: Set(request.environment),
                    access_token: Set(None),
                    token_type: Set(None),
                    token_expires_in: Set(None),
                    token_obtained_at: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                Ok(insert.insert(self.db.as_ref()).await?)
            }
        }
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

    fn request(building_id: &str) -> UpsertCredentialRequest {
        UpsertCredentialRequest {
            building_id: building_id.to_string(),
            client_id: "client-1".to_string(),
            client_secret: "secret-1".to_string(),
            base_url: "https://api.sandbox.mriqube.com".to_string(),
            environment: "sandbox".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_replaces() {
        let db = setup_test_db().await;
        let repo = CredentialRepository::new(db);

        let created = repo.upsert(request("b1")).await.unwrap();
        assert_eq!(created.building_id, "b1");
        assert_eq!(created.client_id, "client-1");

        let mut replacement = request("b1");
        replacement.client_id = "client-2".to_string();
        let replaced = repo.upsert(replacement).await.unwrap();

        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.client_id, "client-2");
    }

    #[tokio::test]
    async fn replacing_credentials_clears_token_cache() {
        let db = setup_test_db().await;
        let repo = CredentialRepository::new(db.clone());

        let created = repo.upsert(request("b1")).await.unwrap();

        let with_token = credential::ActiveModel {
            id: Set(created.id),
            access_token: Set(Some("tok".to_string())),
            token_type: Set(Some("Bearer".to_string())),
            token_expires_in: Set(Some(3600)),
            token_obtained_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        with_token.update(db.as_ref()).await.unwrap();

        repo.upsert(request("b1")).await.unwrap();

        let row = repo.find_by_building("b1").await.unwrap().unwrap();
        assert!(row.access_token.is_none());
        assert!(row.token_obtained_at.is_none());
    }

    #[tokio::test]
    async fn find_returns_none_for_unknown_building() {
        let db = setup_test_db().await;
        let repo = CredentialRepository::new(db);

        assert!(repo.find_by_building("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_building_id_is_rejected() {
        let db = setup_test_db().await;
        let repo = CredentialRepository::new(db);

        assert!(repo.upsert(request("  ")).await.is_err());
    }
}
