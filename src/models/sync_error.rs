//! # Sync Error Model
//!
//! Append-only log of per-record failures during sync passes.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Values stored in [`Model::error_type`].
pub mod error_type {
    pub const API: &str = "api";
    pub const DATABASE: &str = "database";
    pub const VALIDATION: &str = "validation";
}

/// One logged sync failure
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_errors")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Host-platform building identifier
    pub building_id: String,

    /// Entity type string (see [`super::EntityKind::as_str`])
    pub entity_type: String,

    /// Remote record id the failure relates to, when known
    pub entity_id: Option<String>,

    /// Failure class: "api", "database" or "validation"
    pub error_type: String,

    /// Human-readable failure description
    pub error_message: String,

    /// Set by operator tooling once handled; the sync path never writes true
    pub resolved: bool,

    /// When the failure was logged
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
