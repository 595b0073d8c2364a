//! Migration: Create donation requests table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DonationRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DonationRequests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DonationRequests::RequesterId).integer().not_null())
                    .col(
                        ColumnDef::new(DonationRequests::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(DonationRequests::DonationId).integer().null())
                    .col(
                        ColumnDef::new(DonationRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donation_requests_requester")
                            .from(DonationRequests::Table, DonationRequests::RequesterId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donation_requests_donation")
                            .from(DonationRequests::Table, DonationRequests::DonationId)
                            .to(Donations::Table, Donations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Matching scans pending requests oldest first
        manager
            .create_index(
                Index::create()
                    .name("idx_donation_requests_status_created")
                    .table(DonationRequests::Table)
                    .col(DonationRequests::Status)
                    .col(DonationRequests::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_donation_requests_status_created")
                    .table(DonationRequests::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(DonationRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DonationRequests {
    Table,
    Id,
    RequesterId,
    Status,
    DonationId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Donations {
    Table,
    Id,
}
