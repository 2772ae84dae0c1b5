//! SeaORM Entity for TVL drop alerts (append-only)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Vault address, lowercase-normalized
    pub vault_address: String,
    pub network: String,
    /// Block at which the drop was observed (the later of the compared pair)
    pub block_number: i64,
    /// Fractional drop in [0, 1]: (tvl_before - tvl_after) / tvl_before
    #[sea_orm(column_type = "Decimal(Some((9, 8)))")]
    pub drop_pct: Decimal,
    #[sea_orm(column_type = "Decimal(Some((78, 18)))")]
    pub tvl_before: Decimal,
    #[sea_orm(column_type = "Decimal(Some((78, 18)))")]
    pub tvl_after: Decimal,
    /// Reserved for a future confirmation workflow, never set by the watcher
    pub confirmed: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
