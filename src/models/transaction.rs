//! # Transaction Model
//!
//! Local mirror of an MRI Qube financial transaction, keyed the same way as
//! the property mirror.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Mirrored Qube transaction
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Host-platform building identifier that owns this mirror row
    pub building_id: String,

    /// Remote Qube transaction id
    pub qube_id: String,

    /// Remote property id the transaction belongs to
    pub property_qube_id: Option<String>,

    /// Transaction date as reported by the remote
    pub transaction_date: Option<DateTimeWithTimeZone>,

    /// Amount in the remote's currency units (GBP)
    pub amount: f64,

    /// VAT portion when itemized
    pub vat_amount: Option<f64>,

    pub description: Option<String>,

    /// Remote ledger category, e.g. "service_charge"
    pub category: Option<String>,

    /// Remote status, e.g. "posted"
    pub status: Option<String>,

    /// Remote ledger reference code
    pub reference: Option<String>,

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
