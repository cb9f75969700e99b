use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS log_relay;")
            .await?;

        manager
            .create_table(
                Table::create()
                    .table((LogRelay::Schema, Logs::Table))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Logs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Logs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Logs::Level).string().not_null())
                    .col(ColumnDef::new(Logs::Type).string().not_null())
                    .col(ColumnDef::new(Logs::Message).text().not_null())
                    .to_owned(),
            )
            .await?;

        // Snapshots order by timestamp and filter on level and type
        for (name, column) in [
            ("logs_timestamp", Logs::Timestamp),
            ("logs_level", Logs::Level),
            ("logs_type", Logs::Type),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table((LogRelay::Schema, Logs::Table))
                        .col(column)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table((LogRelay::Schema, Logs::Table))
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS log_relay CASCADE;")
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum LogRelay {
    #[sea_orm(iden = "log_relay")]
    Schema,
}

#[derive(DeriveIden)]
enum Logs {
    Table,
    Id,
    Timestamp,
    Level,
    Type,
    Message,
}
