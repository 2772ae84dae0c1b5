use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create alerts table (append-only, no dedup)
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alerts::VaultAddress)
                            .string_len(66)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alerts::Network).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Alerts::BlockNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alerts::DropPct)
                            .decimal_len(9, 8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alerts::TvlBefore)
                            .decimal_len(78, 18)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alerts::TvlAfter)
                            .decimal_len(78, 18)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alerts::Confirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for the newest-first alerts listing
        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_vault_created")
                    .table(Alerts::Table)
                    .col(Alerts::VaultAddress)
                    .col((Alerts::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Alerts {
    Table,
    Id,
    VaultAddress,
    Network,
    BlockNumber,
    DropPct,
    TvlBefore,
    TvlAfter,
    Confirmed,
    CreatedAt,
}
