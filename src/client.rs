//! MRI Qube API client.
//!
//! Owns the runtime credential state, the OAuth token cache and the
//! rate-limited request queue. Every resource getter funnels through one
//! retry executor, so backoff, 401 recovery and 429 handling behave the
//! same on every endpoint.

use metrics::counter;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ApiClientConfig, AppConfig, default_base_url_for};
use crate::error::QubeError;
use crate::models::credential;
use crate::queue::RateLimitedQueue;
use crate::resources::{
    ApiPage, ConnectionStatus, ListQuery, QubeBudget, QubeContact, QubeDocument, QubeInvoice,
    QubeProperty, QubeTenancy, QubeTransaction, QubeUnit, QubeWorkOrder,
};
use crate::token::TokenManager;

/// Fallback wait in seconds when a 429 response has no usable
/// `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Runtime connection settings for the Qube API.
///
/// Values may come from process configuration or from a building's stored
/// credential record. Fields may be empty; [`QubeConfig::is_configured`]
/// gates actual API use.
#[derive(Debug, Clone)]
pub struct QubeConfig {
    /// Building whose credential record supplied these values, when loaded
    /// from the database.
    pub building_id: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub environment: String,
}

impl QubeConfig {
    /// True when client id, client secret and base URL are all present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.base_url.is_empty()
    }

    /// Builds the initial runtime config from process configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let has_credentials =
            config.qube_client_id.is_some() && config.qube_client_secret.is_some();
        let base_url = config
            .qube_base_url
            .clone()
            .or_else(|| has_credentials.then(|| default_base_url_for(&config.qube_environment)))
            .unwrap_or_default();

        Self {
            building_id: None,
            client_id: config.qube_client_id.clone().unwrap_or_default(),
            client_secret: config.qube_client_secret.clone().unwrap_or_default(),
            base_url,
            environment: config.qube_environment.clone(),
        }
    }
}

/// Partial update applied over the current [`QubeConfig`].
#[derive(Debug, Clone, Default)]
pub struct QubeConfigPatch {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
    pub environment: Option<String>,
}

/// Client for the MRI Qube REST API.
pub struct QubeClient {
    http: reqwest::Client,
    db: Arc<DatabaseConnection>,
    config: RwLock<QubeConfig>,
    tokens: Arc<TokenManager>,
    queue: RateLimitedQueue,
    api: ApiClientConfig,
}

impl QubeClient {
    /// Creates a client from process configuration.
    ///
    /// Must be called from within a Tokio runtime (the request queue
    /// spawns its drain task here).
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Result<Self, QubeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.api.connect_timeout_secs))
            .user_agent(concat!("qube-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = Arc::new(TokenManager::new(
            http.clone(),
            db.clone(),
            config.api.token_expiry_margin_secs,
        ));

        Ok(Self {
            http,
            db,
            config: RwLock::new(QubeConfig::from_app_config(config)),
            tokens,
            queue: RateLimitedQueue::new(config.api.requests_per_minute),
            api: config.api.clone(),
        })
    }

    /// Whether enough configuration is present to talk to the API.
    pub async fn is_configured(&self) -> bool {
        self.config.read().await.is_configured()
    }

    /// A copy of the current runtime configuration.
    pub async fn config_snapshot(&self) -> QubeConfig {
        self.config.read().await.clone()
    }

    /// Applies a partial configuration update.
    ///
    /// Any cached token is dropped since it may belong to the previous
    /// credentials.
    pub async fn update_config(&self, patch: QubeConfigPatch) {
        {
            let mut config = self.config.write().await;
            if let Some(client_id) = patch.client_id {
                config.client_id = client_id;
            }
            if let Some(client_secret) = patch.client_secret {
                config.client_secret = client_secret;
            }
            if let Some(base_url) = patch.base_url {
                config.base_url = base_url;
            }
            if let Some(environment) = patch.environment {
                config.environment = environment;
            }
            info!(environment = %config.environment, configured = config.is_configured(), "Updated Qube configuration");
        }

        self.tokens.invalidate().await;
    }

    /// Replaces the runtime configuration with a building's stored
    /// credential record.
    ///
    /// Returns `Ok(false)` when the building has no credential row, in
    /// which case the current (environment-seeded) settings stay in
    /// effect.
    pub async fn load_config_from_database(&self, building_id: &str) -> Result<bool, QubeError> {
        let Some(row) = credential::Entity::find()
            .filter(credential::Column::BuildingId.eq(building_id))
            .one(self.db.as_ref())
            .await?
        else {
            debug!(building_id = %building_id, "No stored Qube credentials, keeping current settings");
            return Ok(false);
        };

        {
            let mut config = self.config.write().await;
            *config = QubeConfig {
                building_id: Some(row.building_id),
                client_id: row.client_id,
                client_secret: row.client_secret,
                base_url: row.base_url,
                environment: row.environment,
            };
        }

        self.tokens.invalidate().await;
        info!(building_id = %building_id, "Loaded Qube credentials from database");

        Ok(true)
    }

    /// Probes the health endpoint and reports the outcome for display.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let started = Instant::now();
        let probe = self
            .get_json::<serde_json::Value>("/api/v1/health", Vec::new())
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match probe {
            Ok(_) => ConnectionStatus {
                connected: true,
                message: "MRI Qube API is reachable".to_string(),
                latency_ms,
            },
            Err(err) => ConnectionStatus {
                connected: false,
                message: err.to_string(),
                latency_ms,
            },
        }
    }

    pub async fn get_properties(&self, query: ListQuery) -> Result<ApiPage<QubeProperty>, QubeError> {
        self.get_json("/api/v1/properties", query.to_query_pairs()).await
    }

    pub async fn get_property(&self, id: &str) -> Result<QubeProperty, QubeError> {
        self.get_json(&format!("/api/v1/properties/{id}"), Vec::new()).await
    }

    pub async fn get_units(&self, query: ListQuery) -> Result<ApiPage<QubeUnit>, QubeError> {
        self.get_json("/api/v1/units", query.to_query_pairs()).await
    }

    pub async fn get_unit(&self, id: &str) -> Result<QubeUnit, QubeError> {
        self.get_json(&format!("/api/v1/units/{id}"), Vec::new()).await
    }

    pub async fn get_tenancies(&self, query: ListQuery) -> Result<ApiPage<QubeTenancy>, QubeError> {
        self.get_json("/api/v1/tenancies", query.to_query_pairs()).await
    }

    pub async fn get_tenancy(&self, id: &str) -> Result<QubeTenancy, QubeError> {
        self.get_json(&format!("/api/v1/tenancies/{id}"), Vec::new()).await
    }

    pub async fn get_contacts(&self, query: ListQuery) -> Result<ApiPage<QubeContact>, QubeError> {
        self.get_json("/api/v1/contacts", query.to_query_pairs()).await
    }

    pub async fn get_contact(&self, id: &str) -> Result<QubeContact, QubeError> {
        self.get_json(&format!("/api/v1/contacts/{id}"), Vec::new()).await
    }

    pub async fn get_transactions(
        &self,
        query: ListQuery,
    ) -> Result<ApiPage<QubeTransaction>, QubeError> {
        self.get_json("/api/v1/transactions", query.to_query_pairs()).await
    }

    pub async fn get_transaction(&self, id: &str) -> Result<QubeTransaction, QubeError> {
        self.get_json(&format!("/api/v1/transactions/{id}"), Vec::new()).await
    }

    pub async fn get_budgets(&self, query: ListQuery) -> Result<ApiPage<QubeBudget>, QubeError> {
        self.get_json("/api/v1/budgets", query.to_query_pairs()).await
    }

    pub async fn get_budget(&self, id: &str) -> Result<QubeBudget, QubeError> {
        self.get_json(&format!("/api/v1/budgets/{id}"), Vec::new()).await
    }

    pub async fn get_invoices(&self, query: ListQuery) -> Result<ApiPage<QubeInvoice>, QubeError> {
        self.get_json("/api/v1/invoices", query.to_query_pairs()).await
    }

    pub async fn get_invoice(&self, id: &str) -> Result<QubeInvoice, QubeError> {
        self.get_json(&format!("/api/v1/invoices/{id}"), Vec::new()).await
    }

    pub async fn get_work_orders(
        &self,
        query: ListQuery,
    ) -> Result<ApiPage<QubeWorkOrder>, QubeError> {
        self.get_json("/api/v1/work-orders", query.to_query_pairs()).await
    }

    pub async fn get_work_order(&self, id: &str) -> Result<QubeWorkOrder, QubeError> {
        self.get_json(&format!("/api/v1/work-orders/{id}"), Vec::new()).await
    }

    pub async fn get_documents(&self, query: ListQuery) -> Result<ApiPage<QubeDocument>, QubeError> {
        self.get_json("/api/v1/documents", query.to_query_pairs()).await
    }

    pub async fn get_document(&self, id: &str) -> Result<QubeDocument, QubeError> {
        self.get_json(&format!("/api/v1/documents/{id}"), Vec::new()).await
    }

    /// Runs a GET request through the queue with the full retry policy.
    async fn get_json<T>(&self, path: &str, query: Vec<(String, String)>) -> Result<T, QubeError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let config = self.config.read().await.clone();
        if !config.is_configured() {
            return Err(QubeError::NotConfigured);
        }

        let mut attempts: u32 = 0;
        let mut backoff_failures: u32 = 0;

        loop {
            let result = self
                .queue
                .enqueue(attempt_get::<T>(
                    self.http.clone(),
                    self.tokens.clone(),
                    config.clone(),
                    path.to_string(),
                    query.clone(),
                ))
                .await
                .and_then(|inner| inner);

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempts += 1;
            if !err.is_retryable() || attempts > self.api.max_retries {
                counter!("qube_api_requests_failed_total").increment(1);
                return Err(err);
            }

            // 429 waits exactly what the server asked for; a stale token
            // retries immediately after invalidation; everything else
            // follows the exponential backoff schedule.
            let delay = match &err {
                QubeError::RateLimited { retry_after_secs } => {
                    counter!("qube_api_rate_limited_total").increment(1);
                    Duration::from_secs(*retry_after_secs)
                }
                QubeError::Unauthorized { .. } => Duration::ZERO,
                _ => {
                    backoff_failures += 1;
                    delay_for_attempt(&self.api, backoff_failures)
                }
            };

            warn!(
                path = %path,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Qube API request failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// One queued request attempt: authenticate, send, classify the response.
async fn attempt_get<T>(
    http: reqwest::Client,
    tokens: Arc<TokenManager>,
    config: QubeConfig,
    path: String,
    query: Vec<(String, String)>,
) -> Result<T, QubeError>
where
    T: DeserializeOwned,
{
    let bearer = tokens.authenticate(&config).await?;
    let url = format!("{}{}", config.base_url.trim_end_matches('/'), path);

    debug!(path = %path, "Sending Qube API request");
    counter!("qube_api_requests_total").increment(1);

    let response = http
        .get(url)
        .query(&query)
        .header(reqwest::header::AUTHORIZATION, bearer)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    if status == StatusCode::UNAUTHORIZED {
        // The cached token is no good; the next attempt fetches a fresh one.
        tokens.invalidate().await;
        let body = response.text().await.unwrap_or_default();
        return Err(QubeError::unauthorized(format!(
            "Qube API rejected the access token: {}",
            truncate(&body)
        )));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = parse_retry_after(response.headers());
        return Err(QubeError::RateLimited { retry_after_secs });
    }

    let body = response.text().await.unwrap_or_default();
    Err(QubeError::api(status.as_u16(), truncate(&body)))
}

/// Seconds to wait from a 429 response's `Retry-After` header.
fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Backoff delay before generic-failure retry number `backoff_attempt`
/// (1-based).
fn delay_for_attempt(policy: &ApiClientConfig, backoff_attempt: u32) -> Duration {
    let exponent = backoff_attempt.saturating_sub(1);
    let delay_ms =
        policy.base_delay_ms as f64 * policy.backoff_multiplier.powi(exponent.min(63) as i32);
    Duration::from_millis(delay_ms.min(policy.max_delay_ms as f64) as u64)
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}
