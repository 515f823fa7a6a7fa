//! OAuth2 client-credentials token management for the Qube API.
//!
//! Holds at most one live token per process. The cache lock is held across
//! the token endpoint call, so concurrent callers never trigger more than
//! one in-flight refresh.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::QubeConfig;
use crate::error::QubeError;
use crate::models::credential;

/// A bearer token obtained from the OAuth2 token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub obtained_at: DateTime<Utc>,
}

impl OAuthToken {
    /// True while more than `margin_secs` of lifetime remains.
    pub fn is_valid(&self, margin_secs: u64) -> bool {
        let usable = self.expires_in - margin_secs as i64;
        Utc::now() < self.obtained_at + Duration::seconds(usable)
    }

    /// Renders the `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Wire shape of the token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

/// Manages the process-wide OAuth token cache.
pub struct TokenManager {
    http: reqwest::Client,
    db: Arc<DatabaseConnection>,
    cached: Mutex<Option<OAuthToken>>,
    expiry_margin_secs: u64,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, db: Arc<DatabaseConnection>, expiry_margin_secs: u64) -> Self {
        Self {
            http,
            db,
            cached: Mutex::new(None),
            expiry_margin_secs,
        }
    }

    /// Returns a valid `Authorization` header value, fetching a fresh token
    /// when the cache is empty or within the expiry margin.
    pub async fn authenticate(&self, config: &QubeConfig) -> Result<String, QubeError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.is_valid(self.expiry_margin_secs)
        {
            counter!("qube_token_cache_hit_total").increment(1);
            return Ok(token.header_value());
        }

        // A cold cache may still have a usable token persisted from a
        // previous process.
        if cached.is_none()
            && let Some(token) = self.load_persisted_token(config).await
            && token.is_valid(self.expiry_margin_secs)
        {
            debug!("Adopted persisted Qube token");
            let header = token.header_value();
            *cached = Some(token);
            return Ok(header);
        }

        let token = self.fetch_token(config).await?;
        let header = token.header_value();
        self.persist_token(config, &token).await;
        *cached = Some(token);

        Ok(header)
    }

    /// Drops the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            counter!("qube_token_invalidated_total").increment(1);
            info!("Invalidated cached Qube token");
        }
    }

    async fn fetch_token(&self, config: &QubeConfig) -> Result<OAuthToken, QubeError> {
        let url = format!("{}/oauth/token", config.base_url.trim_end_matches('/'));
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];

        debug!(environment = %config.environment, "Requesting Qube access token");
        counter!("qube_token_fetch_total").increment(1);

        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            counter!("qube_token_fetch_failure_total").increment(1);
            return Err(QubeError::authentication(
                status.as_u16(),
                format!("token request rejected: {}", body),
            ));
        }

        let token_response: TokenResponse = response.json().await?;

        Ok(OAuthToken {
            access_token: token_response.access_token,
            token_type: token_response.token_type,
            expires_in: token_response.expires_in,
            obtained_at: Utc::now(),
        })
    }

    /// Loads a previously persisted token for the building, if any.
    async fn load_persisted_token(&self, config: &QubeConfig) -> Option<OAuthToken> {
        let building_id = config.building_id.as_ref()?;

        let row = credential::Entity::find()
            .filter(credential::Column::BuildingId.eq(building_id.as_str()))
            .one(self.db.as_ref())
            .await
            .ok()
            .flatten()?;

        Some(OAuthToken {
            access_token: row.access_token?,
            token_type: row.token_type.unwrap_or_else(default_token_type),
            expires_in: row.token_expires_in?,
            obtained_at: row.token_obtained_at?.with_timezone(&Utc),
        })
    }

    /// Best-effort write-back of the fresh token to the credential row.
    /// Persistence failures are logged and ignored.
    async fn persist_token(&self, config: &QubeConfig, token: &OAuthToken) {
        let Some(building_id) = config.building_id.as_ref() else {
            return;
        };

        let row = match credential::Entity::find()
            .filter(credential::Column::BuildingId.eq(building_id.as_str()))
            .one(self.db.as_ref())
            .await
        {
            Ok(Some(row)) => row,
            Ok(None) => return,
            Err(err) => {
                warn!(building_id = %building_id, error = %err, "Failed to load credential row for token persistence");
                return;
            }
        };

        let update = credential::ActiveModel {
            id: Set(row.id),
            access_token: Set(Some(token.access_token.clone())),
            token_type: Set(Some(token.token_type.clone())),
            token_expires_in: Set(Some(token.expires_in)),
            token_obtained_at: Set(Some(token.obtained_at.into())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        if let Err(err) = update.update(self.db.as_ref()).await {
            warn!(building_id = %building_id, error = %err, "Failed to persist Qube token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_lifetime(expires_in: i64, obtained_secs_ago: i64) -> OAuthToken {
        OAuthToken {
            access_token: "abc123".to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
            obtained_at: Utc::now() - Duration::seconds(obtained_secs_ago),
        }
    }

    #[test]
    fn fresh_token_is_valid_inside_margin() {
        let token = token_with_lifetime(3600, 0);
        assert!(token.is_valid(300));
    }

    #[test]
    fn token_expires_margin_early() {
        // 3600s lifetime, obtained 3400s ago: 200s remain, inside the
        // 300s margin.
        let token = token_with_lifetime(3600, 3400);
        assert!(!token.is_valid(300));
        assert!(token.is_valid(100));
    }

    #[test]
    fn short_lived_token_is_never_valid_with_larger_margin() {
        let token = token_with_lifetime(200, 0);
        assert!(!token.is_valid(300));
    }

    #[test]
    fn header_value_joins_type_and_token() {
        let token = token_with_lifetime(3600, 0);
        assert_eq!(token.header_value(), "Bearer abc123");
    }
}
