//! Migration to create the qube_credentials table.
//!
//! This migration creates the building-scoped MRI Qube credential records,
//! including the best-effort cached OAuth token columns.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QubeCredentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QubeCredentials::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(QubeCredentials::BuildingId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QubeCredentials::ClientId).text().not_null())
                    .col(
                        ColumnDef::new(QubeCredentials::ClientSecret)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QubeCredentials::BaseUrl).text().not_null())
                    .col(
                        ColumnDef::new(QubeCredentials::Environment)
                            .text()
                            .not_null()
                            .default("production"),
                    )
                    .col(ColumnDef::new(QubeCredentials::AccessToken).text().null())
                    .col(ColumnDef::new(QubeCredentials::TokenType).text().null())
                    .col(
                        ColumnDef::new(QubeCredentials::TokenExpiresIn)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QubeCredentials::TokenObtainedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QubeCredentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QubeCredentials::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One credential record per building
        manager
            .create_index(
                Index::create()
                    .name("idx_qube_credentials_building_id")
                    .table(QubeCredentials::Table)
                    .col(QubeCredentials::BuildingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_qube_credentials_building_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(QubeCredentials::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QubeCredentials {
    Table,
    Id,
    BuildingId,
    ClientId,
    ClientSecret,
    BaseUrl,
    Environment,
    AccessToken,
    TokenType,
    TokenExpiresIn,
    TokenObtainedAt,
    CreatedAt,
    UpdatedAt,
}
