//! Database migrations for the MRI Qube sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_07_10_090000_create_qube_credentials;
mod m2026_07_10_090100_create_sync_configs;
mod m2026_07_10_090200_create_sync_statuses;
mod m2026_07_10_090300_create_sync_errors;
mod m2026_07_10_090400_create_properties;
mod m2026_07_10_090500_create_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_07_10_090000_create_qube_credentials::Migration),
            Box::new(m2026_07_10_090100_create_sync_configs::Migration),
            Box::new(m2026_07_10_090200_create_sync_statuses::Migration),
            Box::new(m2026_07_10_090300_create_sync_errors::Migration),
            Box::new(m2026_07_10_090400_create_properties::Migration),
            Box::new(m2026_07_10_090500_create_transactions::Migration),
        ]
    }
}
