//! Migration to create the sync_configs table.
//!
//! This migration creates the per-building sync configuration records that
//! gate every sync pass: the mapped Qube property, the enabled flag and the
//! per-entity-type sync frequencies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncConfigs::BuildingId).text().not_null())
                    .col(
                        ColumnDef::new(SyncConfigs::QubePropertyId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::IsEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(SyncConfigs::Frequencies).json_binary().null())
                    .col(
                        ColumnDef::new(SyncConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One sync configuration per building
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_configs_building_id")
                    .table(SyncConfigs::Table)
                    .col(SyncConfigs::BuildingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_configs_building_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncConfigs {
    Table,
    Id,
    BuildingId,
    QubePropertyId,
    IsEnabled,
    Frequencies,
    CreatedAt,
    UpdatedAt,
}
