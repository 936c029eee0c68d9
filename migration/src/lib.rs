pub use sea_orm_migration::prelude::*;

mod m20250310_000001_create_users;
mod m20250310_000002_create_drivers;
mod m20250310_000003_create_trips;
mod m20250310_000004_create_reservations;
mod m20250310_000005_create_ratings;
mod m20250310_000006_create_email_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_users::Migration),
            Box::new(m20250310_000002_create_drivers::Migration),
            Box::new(m20250310_000003_create_trips::Migration),
            Box::new(m20250310_000004_create_reservations::Migration),
            Box::new(m20250310_000005_create_ratings::Migration),
            Box::new(m20250310_000006_create_email_logs::Migration),
        ]
    }
}
