use sea_orm_migration::{prelude::*, schema::*};

use super::m20250310_000002_create_drivers::Driver;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(uuid(Trip::Id).primary_key())
                    .col(string_len(Trip::Origin, 255).not_null())
                    .col(string_len(Trip::Destination, 255).not_null())
                    .col(timestamp_with_time_zone(Trip::DepartureTime).not_null())
                    .col(integer(Trip::EstimatedDurationMinutes).not_null())
                    .col(double(Trip::Price).not_null())
                    .col(integer(Trip::MaxPassengers).not_null())
                    .col(string_len(Trip::VehicleCategory, 20).not_null())
                    // available | booked | completed | cancelled
                    .col(string_len(Trip::Status, 20).not_null().default("available"))
                    .col(uuid_null(Trip::DriverId))
                    .col(
                        timestamp_with_time_zone(Trip::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_driver")
                            .from(Trip::Table, Trip::DriverId)
                            .to(Driver::Table, Driver::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trip_status")
                    .table(Trip::Table)
                    .col(Trip::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Trip {
    Table,
    Id,
    Origin,
    Destination,
    DepartureTime,
    EstimatedDurationMinutes,
    Price,
    MaxPassengers,
    VehicleCategory,
    Status,
    DriverId,
    CreatedAt,
}
