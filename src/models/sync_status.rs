//! # Sync Status Model
//!
//! Latest sync outcome per (building, entity type). Upserted after every
//! completed batch pass; dashboards read this table directly.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Values stored in [`Model::status`].
pub mod status {
    pub const SUCCEEDED: &str = "succeeded";
    pub const FAILED: &str = "failed";
}

/// Sync status row for one (building, entity type) pair
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_statuses")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Host-platform building identifier
    pub building_id: String,

    /// Entity type string (see [`super::EntityKind::as_str`])
    pub entity_type: String,

    /// "succeeded" or "failed"
    pub status: String,

    /// When the last batch pass finished
    pub last_synced_at: DateTimeWithTimeZone,

    /// Records examined during the last pass
    pub records_processed: i32,

    /// Records inserted during the last pass
    pub records_created: i32,

    /// Records updated during the last pass
    pub records_updated: i32,

    /// Records skipped (local copy already current)
    pub records_skipped: i32,

    /// Wall-clock duration of the last pass
    pub duration_ms: i64,

    /// Error summary when the pass recorded failures
    pub error_message: Option<String>,

    /// When the next automatic sync is due; NULL for manual frequency
    pub next_sync_at: Option<DateTimeWithTimeZone>,

    /// When the row was first created
    pub created_at: DateTimeWithTimeZone,

    /// When the row was last overwritten
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
