use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tvl_points table
        manager
            .create_table(
                Table::create()
                    .table(TvlPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TvlPoints::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TvlPoints::VaultAddress)
                            .string_len(66)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TvlPoints::Network)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TvlPoints::BlockNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TvlPoints::Tvl)
                            .decimal_len(78, 18)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TvlPoints::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index makes observation upserts idempotent:
        // at most one row per (vault_address, block_number)
        manager
            .create_index(
                Index::create()
                    .name("uq_tvl_points_vault_block")
                    .table(TvlPoints::Table)
                    .col(TvlPoints::VaultAddress)
                    .col(TvlPoints::BlockNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index for the time-ordered history/latest queries
        manager
            .create_index(
                Index::create()
                    .name("idx_tvl_points_vault_recorded")
                    .table(TvlPoints::Table)
                    .col(TvlPoints::VaultAddress)
                    .col((TvlPoints::RecordedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TvlPoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TvlPoints {
    Table,
    Id,
    VaultAddress,
    Network,
    BlockNumber,
    Tvl,
    RecordedAt,
}
