//! # Property Model
//!
//! Local mirror of an MRI Qube property. Rows are keyed by
//! `(building_id, qube_id)`; `mri_last_modified` drives the remote-wins
//! conflict rule during sync.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Mirrored Qube property
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "properties")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Host-platform building identifier that owns this mirror row
    pub building_id: String,

    /// Remote Qube property id
    pub qube_id: String,

    /// Property display name
    pub name: String,

    pub address_line1: Option<String>,

    pub address_line2: Option<String>,

    pub city: Option<String>,

    pub postcode: Option<String>,

    /// Remote classification, e.g. "residential_block"
    pub property_type: Option<String>,

    /// Remote status, e.g. "active"
    pub status: Option<String>,

    /// Number of units the remote reports for this property
    pub units_count: Option<i32>,

    /// Raw remote record as received
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Option<JsonValue>,

    /// Remote lastModified timestamp from the most recent sync
    pub mri_last_modified: Option<DateTimeWithTimeZone>,

    /// When the mirror row was created
    pub created_at: DateTimeWithTimeZone,

    /// When the mirror row was last written by a sync pass
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
