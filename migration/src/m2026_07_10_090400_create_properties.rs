//! Migration to create the properties table.
//!
//! Local mirror of MRI Qube properties, keyed by the remote id plus the
//! owning building. `mri_last_modified` drives the remote-wins conflict rule;
//! the raw remote record is kept alongside the typed columns.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Properties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Properties::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Properties::BuildingId).text().not_null())
                    .col(ColumnDef::new(Properties::QubeId).text().not_null())
                    .col(ColumnDef::new(Properties::Name).text().not_null())
                    .col(ColumnDef::new(Properties::AddressLine1).text().null())
                    .col(ColumnDef::new(Properties::AddressLine2).text().null())
                    .col(ColumnDef::new(Properties::City).text().null())
                    .col(ColumnDef::new(Properties::Postcode).text().null())
                    .col(ColumnDef::new(Properties::PropertyType).text().null())
                    .col(ColumnDef::new(Properties::Status).text().null())
                    .col(ColumnDef::new(Properties::UnitsCount).integer().null())
                    .col(ColumnDef::new(Properties::Payload).json_binary().null())
                    .col(
                        ColumnDef::new(Properties::MriLastModified)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Properties::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Properties::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Upsert target: one mirrored row per (building, remote id)
        manager
            .create_index(
                Index::create()
                    .name("idx_properties_building_qube")
                    .table(Properties::Table)
                    .col(Properties::BuildingId)
                    .col(Properties::QubeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_properties_building_id")
                    .table(Properties::Table)
                    .col(Properties::BuildingId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_properties_building_qube").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_properties_building_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Properties::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    Id,
    BuildingId,
    QubeId,
    Name,
    AddressLine1,
    AddressLine2,
    City,
    Postcode,
    PropertyType,
    Status,
    UnitsCount,
    Payload,
    MriLastModified,
    CreatedAt,
    UpdatedAt,
}
