use sea_orm_migration::{prelude::*, schema::*};

use super::m20250310_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Driver::Table)
                    .if_not_exists()
                    .col(uuid(Driver::Id).primary_key())
                    .col(string_len(Driver::Name, 100).not_null())
                    .col(string_len(Driver::Email, 255).not_null())
                    .col(string_len(Driver::Phone, 40).not_null())
                    .col(string_len(Driver::LicenseNumber, 50).not_null())
                    .col(string_len(Driver::LicenseType, 20).not_null())
                    .col(integer(Driver::YearsExperience).not_null().default(0))
                    .col(string_len(Driver::VehicleBrand, 60).not_null())
                    .col(string_len(Driver::VehicleModel, 60).not_null())
                    .col(integer(Driver::VehicleYear).not_null())
                    .col(string_len(Driver::VehiclePlate, 20).not_null())
                    .col(string_len(Driver::VehicleCategory, 20).not_null())
                    .col(integer(Driver::VehicleCapacity).not_null())
                    .col(boolean(Driver::HasAirConditioning).not_null().default(true))
                    .col(boolean(Driver::HasWifi).not_null().default(false))
                    .col(boolean(Driver::HasChildSeat).not_null().default(false))
                    .col(boolean(Driver::IsActive).not_null().default(true))
                    .col(uuid_null(Driver::UserId))
                    .col(
                        timestamp_with_time_zone(Driver::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_user")
                            .from(Driver::Table, Driver::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Driver::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Driver {
    Table,
    Id,
    Name,
    Email,
    Phone,
    LicenseNumber,
    LicenseType,
    YearsExperience,
    VehicleBrand,
    VehicleModel,
    VehicleYear,
    VehiclePlate,
    VehicleCategory,
    VehicleCapacity,
    HasAirConditioning,
    HasWifi,
    HasChildSeat,
    IsActive,
    UserId,
    CreatedAt,
}
