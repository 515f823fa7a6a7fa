//! # Sync Config Model
//!
//! Per-building sync configuration: which Qube property the building maps
//! to, whether sync is enabled, and the per-entity-type frequencies.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{EntityKind, SyncFrequency};

/// Sync configuration for one building
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_configs")]
pub struct Model {
    /// Primary key UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Host-platform building identifier
    pub building_id: String,

    /// Remote Qube property id this building is mapped to
    pub qube_property_id: String,

    /// Master switch; disabled buildings never sync
    pub is_enabled: bool,

    /// JSON map of entity type -> frequency string, e.g. {"properties": "hourly"}
    #[sea_orm(column_type = "JsonBinary")]
    pub frequencies: Option<JsonValue>,

    /// When the configuration was created
    pub created_at: DateTimeWithTimeZone,

    /// When the configuration was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Resolve the configured frequency for an entity type.
    ///
    /// Missing map, missing key, non-string values and unrecognized strings
    /// all resolve to daily so a malformed config never stalls a building.
    pub fn frequency_for(&self, kind: EntityKind) -> SyncFrequency {
        self.frequencies
            .as_ref()
            .and_then(|map| map.get(kind.as_str()))
            .and_then(|value| value.as_str())
            .map(SyncFrequency::parse_or_daily)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn config_with(frequencies: Option<JsonValue>) -> Model {
        Model {
            id: Uuid::new_v4(),
            building_id: "b1".to_string(),
            qube_property_id: "P-100".to_string(),
            is_enabled: true,
            frequencies,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn frequency_for_reads_configured_value() {
        let config = config_with(Some(json!({
            "properties": "hourly",
            "transactions": "weekly",
        })));
        assert_eq!(
            config.frequency_for(EntityKind::Properties),
            SyncFrequency::Hourly
        );
        assert_eq!(
            config.frequency_for(EntityKind::Transactions),
            SyncFrequency::Weekly
        );
    }

    #[test]
    fn frequency_for_defaults_to_daily() {
        let config = config_with(None);
        assert_eq!(
            config.frequency_for(EntityKind::Properties),
            SyncFrequency::Daily
        );

        let config = config_with(Some(json!({"properties": "every-other-tuesday"})));
        assert_eq!(
            config.frequency_for(EntityKind::Properties),
            SyncFrequency::Daily
        );

        let config = config_with(Some(json!({"properties": 42})));
        assert_eq!(
            config.frequency_for(EntityKind::Properties),
            SyncFrequency::Daily
        );
    }
}
