//! Migration to create the sync_errors table.
//!
//! Append-only log of per-record failures during sync passes. The sync path
//! only ever inserts here; `resolved` is flipped by operator tooling.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncErrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncErrors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncErrors::BuildingId).text().not_null())
                    .col(ColumnDef::new(SyncErrors::EntityType).text().not_null())
                    .col(ColumnDef::new(SyncErrors::EntityId).text().null())
                    .col(ColumnDef::new(SyncErrors::ErrorType).text().not_null())
                    .col(ColumnDef::new(SyncErrors::ErrorMessage).text().not_null())
                    .col(
                        ColumnDef::new(SyncErrors::Resolved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SyncErrors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_errors_building_id")
                    .table(SyncErrors::Table)
                    .col(SyncErrors::BuildingId)
                    .to_owned(),
            )
            .await?;

        // Unresolved-errors dashboard query
        manager
            .create_index(
                Index::create()
                    .name("idx_sync_errors_resolved")
                    .table(SyncErrors::Table)
                    .col(SyncErrors::Resolved)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sync_errors_building_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_sync_errors_resolved").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SyncErrors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncErrors {
    Table,
    Id,
    BuildingId,
    EntityType,
    EntityId,
    ErrorType,
    ErrorMessage,
    Resolved,
    CreatedAt,
}
