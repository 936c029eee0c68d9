use sea_orm_migration::{prelude::*, schema::*};

use super::m20250310_000001_create_users::User;
use super::m20250310_000002_create_drivers::Driver;
use super::m20250310_000004_create_reservations::Reservation;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rating::Table)
                    .if_not_exists()
                    .col(uuid(Rating::Id).primary_key())
                    // one rating per reservation
                    .col(uuid(Rating::ReservationId).not_null().unique_key())
                    .col(uuid_null(Rating::DriverId))
                    .col(uuid(Rating::UserId).not_null())
                    .col(small_integer(Rating::OverallRating).not_null())
                    .col(small_integer(Rating::PunctualityRating).not_null())
                    .col(small_integer(Rating::VehicleConditionRating).not_null())
                    .col(small_integer(Rating::DriverServiceRating).not_null())
                    .col(text_null(Rating::Comment))
                    .col(boolean(Rating::WouldRecommend).not_null())
                    .col(
                        timestamp_with_time_zone(Rating::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_reservation")
                            .from(Rating::Table, Rating::ReservationId)
                            .to(Reservation::Table, Reservation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_driver")
                            .from(Rating::Table, Rating::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_user")
                            .from(Rating::Table, Rating::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rating::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Rating {
    Table,
    Id,
    ReservationId,
    DriverId,
    UserId,
    OverallRating,
    PunctualityRating,
    VehicleConditionRating,
    DriverServiceRating,
    Comment,
    WouldRecommend,
    CreatedAt,
}
