use sea_orm_migration::prelude::*;

use super::m20250301_000001_identity::Profiles;

#[derive(DeriveIden)]
pub enum Restaurants {
    Table,
    Id,
    SellerId,
    Name,
    Description,
    Address,
    Phone,
    ImageUrl,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Dishes {
    Table,
    Id,
    RestaurantId,
    Name,
    Description,
    Price,
    ImageUrl,
    Category,
    IsAvailable,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Restaurants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Restaurants::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Restaurants::SellerId).uuid().not_null())
                    .col(ColumnDef::new(Restaurants::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Restaurants::Description).text())
                    .col(ColumnDef::new(Restaurants::Address).string_len(512))
                    .col(ColumnDef::new(Restaurants::Phone).string_len(64))
                    .col(ColumnDef::new(Restaurants::ImageUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Restaurants::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Restaurants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Restaurants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_restaurants_seller")
                            .from(Restaurants::Table, Restaurants::SellerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_restaurants_seller")
                    .table(Restaurants::Table)
                    .col(Restaurants::SellerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Dishes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Dishes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Dishes::RestaurantId).uuid().not_null())
                    .col(ColumnDef::new(Dishes::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Dishes::Description).text())
                    .col(
                        ColumnDef::new(Dishes::Price)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Dishes::Price).gte(0)),
                    )
                    .col(ColumnDef::new(Dishes::ImageUrl).string_len(1024))
                    .col(ColumnDef::new(Dishes::Category).string_len(128))
                    .col(
                        ColumnDef::new(Dishes::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Dishes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Dishes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dishes_restaurant")
                            .from(Dishes::Table, Dishes::RestaurantId)
                            .to(Restaurants::Table, Restaurants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_dishes_restaurant")
                    .table(Dishes::Table)
                    .col(Dishes::RestaurantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Dishes::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Restaurants::Table).to_owned()).await?;
        Ok(())
    }
}
