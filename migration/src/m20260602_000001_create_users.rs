use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create user role enum
        manager
            .create_type(
                Type::create()
                    .as_enum(UserRole::Enum)
                    .values([UserRole::Consumer, UserRole::Provider])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    // Non-deterministic ciphertext; equality always goes
                    // through the deterministic email hash.
                    .col(text(User::EmailEncrypted).not_null())
                    .col(string_len(User::EmailHash, 64).not_null().unique_key())
                    .col(string_len_null(User::PasswordHash, 255))
                    .col(string_len_null(User::Name, 100))
                    .col(integer_null(User::Age))
                    .col(string_len_null(User::ContactNumber, 30))
                    .col(
                        ColumnDef::new(User::Role)
                            .custom(UserRole::Enum)
                            .not_null(),
                    )
                    .col(json_binary_null(User::Details))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(UserRole::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    EmailEncrypted,
    EmailHash,
    PasswordHash,
    Name,
    Age,
    ContactNumber,
    Role,
    Details,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum UserRole {
    #[sea_orm(iden = "user_role")]
    Enum,
    #[sea_orm(iden = "consumer")]
    Consumer,
    #[sea_orm(iden = "provider")]
    Provider,
}
