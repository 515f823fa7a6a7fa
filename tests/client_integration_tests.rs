//! Integration tests for the Qube API client against a wiremock server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod test_utils;
use test_utils::{
    mount_token_endpoint, page_body, seed_credentials, setup_test_db, test_config,
};

use qube_sync::client::QubeClient;
use qube_sync::config::AppConfig;
use qube_sync::error::QubeError;
use qube_sync::models::credential;
use qube_sync::resources::ListQuery;

async fn client_for(server: &MockServer) -> (Arc<QubeClient>, Arc<sea_orm::DatabaseConnection>) {
    let db = setup_test_db().await.expect("test db");
    let config = test_config(&server.uri());
    let client = QubeClient::new(db.clone(), &config).expect("build client");
    (Arc::new(client), db)
}

#[tokio::test]
async fn token_is_fetched_once_and_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "cached-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties/p1"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p1",
            "name": "Harbour House"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let first = client.get_property("p1").await.expect("first request");
    assert_eq!(first.name, "Harbour House");

    let second = client.get_property("p1").await.expect("second request");
    assert_eq!(second.id, "p1");
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_retried() {
    let mock_server = MockServer::start().await;

    // One fetch for the initial token, one after the 401 invalidates it.
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(json!([
            {"id": "p1", "name": "Harbour House"}
        ]))))
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let page = client
        .get_properties(ListQuery::new().page(1).limit(10))
        .await
        .expect("request succeeds after token refresh");
    assert_eq!(page.data.len(), 1);
}

#[tokio::test]
async fn rate_limited_request_waits_for_retry_after() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "1")
                .set_body_string("slow down"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(json!([]))))
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let started = Instant::now();
    client
        .get_properties(ListQuery::new())
        .await
        .expect("request succeeds after waiting out the rate limit");
    assert!(
        started.elapsed() >= Duration::from_secs(1),
        "retry happened before the Retry-After window elapsed"
    );
}

#[tokio::test]
async fn unconfigured_client_fails_fast_without_api_calls() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    let db = setup_test_db().await.expect("test db");
    // No credentials at all.
    let config = AppConfig::default();
    let client = QubeClient::new(db, &config).expect("build client");

    let err = client
        .get_properties(ListQuery::new())
        .await
        .expect_err("unconfigured client must not issue requests");
    assert!(matches!(err, QubeError::NotConfigured));

    let received = mock_server
        .received_requests()
        .await
        .expect("request recording enabled");
    assert!(received.is_empty(), "no request should reach the server");
}

#[tokio::test]
async fn test_connection_reports_reachable_api() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let status = client.test_connection().await;
    assert!(status.connected);
    assert_eq!(status.message, "MRI Qube API is reachable");
}

#[tokio::test]
async fn test_connection_reports_unreachable_api() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(500).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let status = client.test_connection().await;
    assert!(!status.connected);
    assert!(!status.message.is_empty());
}

#[tokio::test]
async fn server_errors_surface_status_and_body() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let err = client
        .get_properties(ListQuery::new())
        .await
        .expect_err("persistent 503 exhausts retries");
    match err {
        QubeError::Api { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("upstream down"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn persisted_token_is_adopted_after_database_config_load() {
    let mock_server = MockServer::start().await;
    // No token endpoint mounted: any fetch attempt would fail the request.

    let db = setup_test_db().await.expect("test db");
    seed_credentials(&db, "b1", &mock_server.uri())
        .await
        .expect("seed credentials");

    // Stash a still-valid token on the credential row, as a previous
    // process run would have.
    let row = credential::Entity::find()
        .filter(credential::Column::BuildingId.eq("b1"))
        .one(db.as_ref())
        .await
        .expect("query credentials")
        .expect("credential row exists");
    let mut stored: credential::ActiveModel = row.into();
    stored.access_token = Set(Some("persisted-token".to_string()));
    stored.token_type = Set(Some("Bearer".to_string()));
    stored.token_expires_in = Set(Some(3600));
    stored.token_obtained_at = Set(Some(Utc::now().into()));
    stored.update(db.as_ref()).await.expect("store token columns");

    Mock::given(method("GET"))
        .and(path("/api/v1/properties/p1"))
        .and(header("authorization", "Bearer persisted-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p1",
            "name": "Harbour House"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = AppConfig::default();
    let client = QubeClient::new(db, &config).expect("build client");
    assert!(!client.is_configured().await);

    let loaded = client
        .load_config_from_database("b1")
        .await
        .expect("adopt database credentials");
    assert!(loaded);
    assert!(client.is_configured().await);

    let property = client.get_property("p1").await.expect("request succeeds");
    assert_eq!(property.id, "p1");
}

#[tokio::test]
async fn missing_credential_row_keeps_environment_settings() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/properties/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p1",
            "name": "Harbour House"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _db) = client_for(&mock_server).await;

    let loaded = client
        .load_config_from_database("unmapped")
        .await
        .expect("lookup succeeds");
    assert!(!loaded);

    // Environment settings are still live.
    assert!(client.is_configured().await);
    client.get_property("p1").await.expect("request succeeds");
}
