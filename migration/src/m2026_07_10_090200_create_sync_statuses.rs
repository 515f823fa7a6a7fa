//! Migration to create the sync_statuses table.
//!
//! One row per (building, entity type) summarizing the latest completed sync
//! attempt; upserted after every batch pass, no history retained.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncStatuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncStatuses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncStatuses::BuildingId).text().not_null())
                    .col(ColumnDef::new(SyncStatuses::EntityType).text().not_null())
                    .col(ColumnDef::new(SyncStatuses::Status).text().not_null())
                    .col(
                        ColumnDef::new(SyncStatuses::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::RecordsProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::RecordsCreated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::RecordsUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::RecordsSkipped)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::DurationMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncStatuses::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(SyncStatuses::NextSyncAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncStatuses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert target: one row per (building, entity type)
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_statuses_building_entity")
                    .table(SyncStatuses::Table)
                    .col(SyncStatuses::BuildingId)
                    .col(SyncStatuses::EntityType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Scheduler scans for due rows by next_sync_at
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_statuses_next_sync_at")
                    .table(SyncStatuses::Table)
                    .col(SyncStatuses::NextSyncAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_statuses_building_entity")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sync_statuses_next_sync_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(SyncStatuses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncStatuses {
    Table,
    Id,
    BuildingId,
    EntityType,
    Status,
    LastSyncedAt,
    RecordsProcessed,
    RecordsCreated,
    RecordsUpdated,
    RecordsSkipped,
    DurationMs,
    ErrorMessage,
    NextSyncAt,
    CreatedAt,
    UpdatedAt,
}
