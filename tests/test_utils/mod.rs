//! Test utilities for database and Qube API testing.
//!
//! Provides an in-memory SQLite database with migrations applied, an
//! `AppConfig` pointed at a wiremock server, and fixture helpers for the
//! sync tables.

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qube_sync::config::AppConfig;
use qube_sync::repositories::sync_config::UpsertSyncConfigRequest;
use qube_sync::repositories::{CredentialRepository, SyncConfigRepository};
use qube_sync::repositories::credential::UpsertCredentialRequest;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks so fixtures can be inserted without the full relation graph.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(Arc::new(db))
}

/// Builds an `AppConfig` with Qube credentials pointed at a mock server.
///
/// Retry delays and queue spacing are shrunk so failure-path tests finish
/// quickly.
#[allow(dead_code)]
pub fn test_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.qube_client_id = Some("test-client".to_string());
    config.qube_client_secret = Some("test-secret".to_string());
    config.qube_base_url = Some(base_url.to_string());
    config.api.requests_per_minute = 6_000;
    config.api.base_delay_ms = 10;
    config.api.max_delay_ms = 50;
    config
}

/// Mounts the OAuth token endpoint on the mock server.
#[allow(dead_code)]
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-access-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Seeds a sync configuration row for a building.
#[allow(dead_code)]
pub async fn seed_sync_config(
    db: &Arc<DatabaseConnection>,
    building_id: &str,
    is_enabled: bool,
) -> Result<()> {
    SyncConfigRepository::new(db.clone())
        .upsert(UpsertSyncConfigRequest {
            building_id: building_id.to_string(),
            qube_property_id: format!("qube-{building_id}"),
            is_enabled,
            frequencies: None,
        })
        .await?;
    Ok(())
}

/// Seeds a credential row for a building pointing at the given base URL.
#[allow(dead_code)]
pub async fn seed_credentials(
    db: &Arc<DatabaseConnection>,
    building_id: &str,
    base_url: &str,
) -> Result<()> {
    CredentialRepository::new(db.clone())
        .upsert(UpsertCredentialRequest {
            building_id: building_id.to_string(),
            client_id: "db-client".to_string(),
            client_secret: "db-secret".to_string(),
            base_url: base_url.to_string(),
            environment: "sandbox".to_string(),
        })
        .await?;
    Ok(())
}

/// JSON body for a single page of list results.
#[allow(dead_code)]
pub fn page_body(data: serde_json::Value) -> serde_json::Value {
    let total = data.as_array().map(|items| items.len()).unwrap_or(0);
    json!({
        "data": data,
        "page": 1,
        "totalCount": total
    })
}
