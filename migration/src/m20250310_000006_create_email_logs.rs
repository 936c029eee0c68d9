use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign key on reservation_id: the log outlives deleted rows.
        manager
            .create_table(
                Table::create()
                    .table(EmailLog::Table)
                    .if_not_exists()
                    .col(uuid(EmailLog::Id).primary_key())
                    .col(string_len(EmailLog::Recipient, 255).not_null())
                    .col(string_len(EmailLog::TemplateName, 50).not_null())
                    // sent | failed
                    .col(string_len(EmailLog::Status, 20).not_null())
                    .col(string_len_null(EmailLog::MessageId, 255))
                    .col(text_null(EmailLog::Error))
                    .col(integer(EmailLog::Attempts).not_null().default(1))
                    .col(uuid_null(EmailLog::ReservationId))
                    .col(
                        timestamp_with_time_zone(EmailLog::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmailLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum EmailLog {
    Table,
    Id,
    Recipient,
    TemplateName,
    Status,
    MessageId,
    Error,
    Attempts,
    ReservationId,
    CreatedAt,
}
