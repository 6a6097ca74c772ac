use sea_orm_migration::{prelude::*, schema::*};

use super::m20260602_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(uuid(Service::Id).primary_key())
                    .col(string_len(Service::Title, 200).not_null())
                    .col(text(Service::Description).not_null())
                    .col(decimal_len(Service::Price, 12, 2).not_null())
                    .col(string_len(Service::ProviderName, 100).not_null())
                    .col(string_len(Service::ProviderContact, 30).not_null())
                    .col(string_len(Service::ProviderEmail, 100).not_null())
                    .col(double_null(Service::Lng))
                    .col(double_null(Service::Lat))
                    .col(uuid_null(Service::CreatedBy))
                    .col(
                        timestamp_with_time_zone(Service::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_created_by")
                            .from(Service::Table, Service::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Service::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Service {
    Table,
    Id,
    Title,
    Description,
    Price,
    ProviderName,
    ProviderContact,
    ProviderEmail,
    Lng,
    Lat,
    CreatedBy,
    CreatedAt,
}
