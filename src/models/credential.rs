//! # Qube Credential Model
//!
//! Building-scoped MRI Qube API credentials, including the best-effort
//! cached OAuth token columns written by the token manager.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credential record for one building's MRI Qube connection
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "qube_credentials")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Host-platform building identifier this credential belongs to
    pub building_id: String,

    /// OAuth2 client id
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// API base URL, e.g. `https://api.mriqube.com`
    pub base_url: String,

    /// Target environment label ("sandbox" or "production")
    pub environment: String,

    /// Cached bearer token (best-effort, may be stale or absent)
    pub access_token: Option<String>,

    /// Cached token type, normally "Bearer"
    pub token_type: Option<String>,

    /// Cached token lifetime in seconds as issued
    pub token_expires_in: Option<i64>,

    /// When the cached token was obtained
    pub token_obtained_at: Option<DateTimeWithTimeZone>,

    /// When the credential record was created
    pub created_at: DateTimeWithTimeZone,

    /// When the credential record was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
