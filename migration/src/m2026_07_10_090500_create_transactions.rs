//! Migration to create the transactions table.
//!
//! Local mirror of MRI Qube financial transactions, keyed by the remote id
//! plus the owning building, with the same remote-wins timestamp column as
//! the properties mirror.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::BuildingId).text().not_null())
                    .col(ColumnDef::new(Transactions::QubeId).text().not_null())
                    .col(ColumnDef::new(Transactions::PropertyQubeId).text().null())
                    .col(
                        ColumnDef::new(Transactions::TransactionDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Amount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Transactions::VatAmount).double().null())
                    .col(ColumnDef::new(Transactions::Description).text().null())
                    .col(ColumnDef::new(Transactions::Category).text().null())
                    .col(ColumnDef::new(Transactions::Status).text().null())
                    .col(ColumnDef::new(Transactions::Reference).text().null())
                    .col(ColumnDef::new(Transactions::Payload).json_binary().null())
                    .col(
                        ColumnDef::new(Transactions::MriLastModified)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
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
                    .name("idx_transactions_building_qube")
                    .table(Transactions::Table)
                    .col(Transactions::BuildingId)
                    .col(Transactions::QubeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Finance views list by building and date
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_building_date")
                    .table(Transactions::Table)
                    .col(Transactions::BuildingId)
                    .col(Transactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_transactions_building_qube")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_transactions_building_date")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    BuildingId,
    QubeId,
    PropertyQubeId,
    TransactionDate,
    Amount,
    VatAmount,
    Description,
    Category,
    Status,
    Reference,
    Payload,
    MriLastModified,
    CreatedAt,
    UpdatedAt,
}
