//! SeaORM Entity for the vault TVL time series

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tvl_points")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Vault address, lowercase-normalized (0x + 40 hex chars)
    pub vault_address: String,
    /// Logical chain identifier (e.g. "base")
    pub network: String,
    /// Block at which the balance was observed
    pub block_number: i64,
    /// TVL in human units of the tracked asset (decimal-adjusted)
    #[sea_orm(column_type = "Decimal(Some((78, 18)))")]
    pub tvl: Decimal,
    /// When the row was persisted (not the on-chain block time)
    pub recorded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
