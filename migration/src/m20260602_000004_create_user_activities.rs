use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20260602_000001_create_users::User;
use super::m20260602_000002_create_services::Service;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(ActivityType::Enum)
                    .values([
                        ActivityType::View,
                        ActivityType::Book,
                        ActivityType::Search,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserActivity::Table)
                    .if_not_exists()
                    .col(uuid(UserActivity::Id).primary_key())
                    .col(uuid(UserActivity::UserId).not_null())
                    .col(
                        ColumnDef::new(UserActivity::ActivityType)
                            .custom(ActivityType::Enum)
                            .not_null(),
                    )
                    .col(uuid_null(UserActivity::ServiceId))
                    .col(string_len_null(UserActivity::ServiceType, 100))
                    .col(string_len_null(UserActivity::SearchQuery, 200))
                    .col(
                        timestamp_with_time_zone(UserActivity::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_user")
                            .from(UserActivity::Table, UserActivity::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_service")
                            .from(UserActivity::Table, UserActivity::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_user_created")
                    .table(UserActivity::Table)
                    .col(UserActivity::UserId)
                    .col(UserActivity::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserActivity::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ActivityType::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum UserActivity {
    Table,
    Id,
    UserId,
    ActivityType,
    ServiceId,
    ServiceType,
    SearchQuery,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ActivityType {
    #[sea_orm(iden = "activity_type")]
    Enum,
    #[sea_orm(iden = "view")]
    View,
    #[sea_orm(iden = "book")]
    Book,
    #[sea_orm(iden = "search")]
    Search,
}
