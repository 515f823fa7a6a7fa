//! # Data Models
//!
//! SeaORM entity models for the local store plus the shared sync vocabulary
//! (entity kinds and sync frequencies) used across the client, the sync
//! service and the scheduler.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub mod credential;
pub mod property;
pub mod sync_config;
pub mod sync_error;
pub mod sync_status;
pub mod transaction;

pub use credential::Entity as QubeCredential;
pub use property::Entity as Property;
pub use sync_config::Entity as SyncConfig;
pub use sync_error::Entity as SyncError;
pub use sync_status::Entity as SyncStatus;
pub use transaction::Entity as Transaction;

/// The remote entity types the integration knows about.
///
/// Declaration order is the `sync_building` fan-out order (properties first,
/// then the property-dependent entities), so ordered maps keyed by this enum
/// iterate in sync order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Properties,
    Units,
    Tenancies,
    Contacts,
    Transactions,
    Budgets,
    Invoices,
    WorkOrders,
    Documents,
}

impl EntityKind {
    /// Stable string form used in `entity_type` columns and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Properties => "properties",
            EntityKind::Units => "units",
            EntityKind::Tenancies => "tenancies",
            EntityKind::Contacts => "contacts",
            EntityKind::Transactions => "transactions",
            EntityKind::Budgets => "budgets",
            EntityKind::Invoices => "invoices",
            EntityKind::WorkOrders => "work_orders",
            EntityKind::Documents => "documents",
        }
    }

    /// All kinds in fan-out order.
    pub fn all() -> [EntityKind; 9] {
        [
            EntityKind::Properties,
            EntityKind::Units,
            EntityKind::Tenancies,
            EntityKind::Contacts,
            EntityKind::Transactions,
            EntityKind::Budgets,
            EntityKind::Invoices,
            EntityKind::WorkOrders,
            EntityKind::Documents,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-facing sync frequency for one (building, entity type) pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncFrequency {
    Realtime,
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
    Manual,
}

impl SyncFrequency {
    /// Parse a stored frequency string. Unknown values fall back to daily
    /// rather than failing the sync pass.
    pub fn parse_or_daily(value: &str) -> SyncFrequency {
        match value {
            "realtime" => SyncFrequency::Realtime,
            "hourly" => SyncFrequency::Hourly,
            "daily" => SyncFrequency::Daily,
            "weekly" => SyncFrequency::Weekly,
            "monthly" => SyncFrequency::Monthly,
            "manual" => SyncFrequency::Manual,
            _ => SyncFrequency::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncFrequency::Realtime => "realtime",
            SyncFrequency::Hourly => "hourly",
            SyncFrequency::Daily => "daily",
            SyncFrequency::Weekly => "weekly",
            SyncFrequency::Monthly => "monthly",
            SyncFrequency::Manual => "manual",
        }
    }

    /// Interval until the next automatic sync, or `None` for manual-only.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            SyncFrequency::Realtime => Some(Duration::minutes(15)),
            SyncFrequency::Hourly => Some(Duration::hours(1)),
            SyncFrequency::Daily => Some(Duration::days(1)),
            SyncFrequency::Weekly => Some(Duration::days(7)),
            SyncFrequency::Monthly => Some(Duration::days(30)),
            SyncFrequency::Manual => None,
        }
    }
}

impl fmt::Display for SyncFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_round_trips_through_as_str() {
        for kind in EntityKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn fan_out_order_starts_with_properties() {
        assert_eq!(EntityKind::all()[0], EntityKind::Properties);
        assert!(EntityKind::Properties < EntityKind::Units);
        assert!(EntityKind::Units < EntityKind::Documents);
    }

    #[test]
    fn unknown_frequency_defaults_to_daily() {
        assert_eq!(
            SyncFrequency::parse_or_daily("fortnightly"),
            SyncFrequency::Daily
        );
        assert_eq!(SyncFrequency::parse_or_daily(""), SyncFrequency::Daily);
        assert_eq!(
            SyncFrequency::parse_or_daily("manual"),
            SyncFrequency::Manual
        );
    }

    #[test]
    fn frequency_intervals_match_schedule() {
        assert_eq!(
            SyncFrequency::Realtime.interval(),
            Some(Duration::minutes(15))
        );
        assert_eq!(SyncFrequency::Hourly.interval(), Some(Duration::hours(1)));
        assert_eq!(SyncFrequency::Daily.interval(), Some(Duration::days(1)));
        assert_eq!(SyncFrequency::Weekly.interval(), Some(Duration::days(7)));
        assert_eq!(SyncFrequency::Monthly.interval(), Some(Duration::days(30)));
        assert_eq!(SyncFrequency::Manual.interval(), None);
    }
}
