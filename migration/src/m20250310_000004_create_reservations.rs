use sea_orm_migration::{prelude::*, schema::*};

use super::m20250310_000001_create_users::User;
use super::m20250310_000003_create_trips::Trip;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservation::Table)
                    .if_not_exists()
                    .col(uuid(Reservation::Id).primary_key())
                    .col(
                        string_len(Reservation::ConfirmationCode, 16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(uuid(Reservation::TripId).not_null())
                    .col(uuid(Reservation::UserId).not_null())
                    .col(integer(Reservation::PassengerCount).not_null())
                    // JSON array of names
                    .col(text(Reservation::PassengerNames).not_null())
                    .col(string_len(Reservation::PickupLocation, 255).not_null())
                    .col(string_len(Reservation::DropoffLocation, 255).not_null())
                    .col(string_len(Reservation::ContactPhone, 40).not_null())
                    .col(string_len_null(Reservation::FlightNumber, 20))
                    .col(text_null(Reservation::SpecialRequirements))
                    .col(double(Reservation::TotalPrice).not_null())
                    // pending | confirmed | assign_driver | completed | cancelled
                    .col(
                        string_len(Reservation::Status, 20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        string_len(Reservation::PaymentStatus, 20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        timestamp_with_time_zone(Reservation::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_trip")
                            .from(Reservation::Table, Reservation::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_user")
                            .from(Reservation::Table, Reservation::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_trip")
                    .table(Reservation::Table)
                    .col(Reservation::TripId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservation::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Reservation {
    Table,
    Id,
    ConfirmationCode,
    TripId,
    UserId,
    PassengerCount,
    PassengerNames,
    PickupLocation,
    DropoffLocation,
    ContactPhone,
    FlightNumber,
    SpecialRequirements,
    TotalPrice,
    Status,
    PaymentStatus,
    CreatedAt,
}
