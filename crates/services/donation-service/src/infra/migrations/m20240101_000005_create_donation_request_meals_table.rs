//! Migration: Create the request/meal preference join table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DonationRequestMeals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DonationRequestMeals::RequestId).integer().not_null())
                    .col(ColumnDef::new(DonationRequestMeals::MealId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(DonationRequestMeals::RequestId)
                            .col(DonationRequestMeals::MealId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donation_request_meals_request")
                            .from(DonationRequestMeals::Table, DonationRequestMeals::RequestId)
                            .to(DonationRequests::Table, DonationRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donation_request_meals_meal")
                            .from(DonationRequestMeals::Table, DonationRequestMeals::MealId)
                            .to(Meals::Table, Meals::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DonationRequestMeals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DonationRequestMeals {
    Table,
    RequestId,
    MealId,
}

#[derive(DeriveIden)]
enum DonationRequests {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Meals {
    Table,
    Id,
}
