//! TVL persistence gateway
//!
//! Storage contract consumed by the vault watcher: idempotent upsert of
//! TVL observations keyed by (vault_address, block_number), append-only
//! insert of drop alerts. The watcher treats both as fire-and-forget for
//! its own state machine; failures are logged by the caller and the next
//! tick proceeds normally.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use tracing::debug;

use crate::entities::{alerts, prelude::TvlPoints, tvl_points};

/// Error types for the TVL store
#[derive(Debug)]
pub enum TvlStoreError {
    DatabaseError(String),
    BlockNumberOverflow(u64),
}

impl std::fmt::Display for TvlStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TvlStoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            TvlStoreError::BlockNumberOverflow(block) => {
                write!(f, "Block number too large for storage: {}", block)
            }
        }
    }
}

impl std::error::Error for TvlStoreError {}

/// Storage operations needed by the watcher core.
///
/// Both calls must be safe under repetition: `upsert_observation` is an
/// idempotent no-op when a row for (vault_address, block_number) already
/// exists (first write wins), `insert_alert` always appends.
#[async_trait]
pub trait TvlStore: Send + Sync {
    async fn upsert_observation(
        &self,
        vault_address: &str,
        network: &str,
        block_number: u64,
        tvl: Decimal,
    ) -> Result<(), TvlStoreError>;

    async fn insert_alert(
        &self,
        vault_address: &str,
        network: &str,
        block_number: u64,
        drop_pct: Decimal,
        tvl_before: Decimal,
        tvl_after: Decimal,
    ) -> Result<(), TvlStoreError>;
}

/// SeaORM-backed store over the tvl_points and alerts tables
#[derive(Clone)]
pub struct PgTvlStore {
    db: DatabaseConnection,
}

impl PgTvlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TvlStore for PgTvlStore {
    async fn upsert_observation(
        &self,
        vault_address: &str,
        network: &str,
        block_number: u64,
        tvl: Decimal,
    ) -> Result<(), TvlStoreError> {
        let block = i64::try_from(block_number)
            .map_err(|_| TvlStoreError::BlockNumberOverflow(block_number))?;

        let point = tvl_points::ActiveModel {
            vault_address: Set(vault_address.to_string()),
            network: Set(network.to_string()),
            block_number: Set(block),
            tvl: Set(tvl),
            recorded_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let result = TvlPoints::insert(point)
            .on_conflict(
                OnConflict::columns([
                    tvl_points::Column::VaultAddress,
                    tvl_points::Column::BlockNumber,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match result {
            Ok(rows) => {
                if rows == 0 {
                    debug!(
                        vault = %vault_address,
                        block_number = block,
                        "Observation already stored, keeping existing row"
                    );
                }
                Ok(())
            }
            // Conflicting row already present: idempotent no-op
            Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(TvlStoreError::DatabaseError(format!(
                "Failed to upsert observation: {}",
                e
            ))),
        }
    }

    async fn insert_alert(
        &self,
        vault_address: &str,
        network: &str,
        block_number: u64,
        drop_pct: Decimal,
        tvl_before: Decimal,
        tvl_after: Decimal,
    ) -> Result<(), TvlStoreError> {
        let block = i64::try_from(block_number)
            .map_err(|_| TvlStoreError::BlockNumberOverflow(block_number))?;

        let alert = alerts::ActiveModel {
            vault_address: Set(vault_address.to_string()),
            network: Set(network.to_string()),
            block_number: Set(block),
            drop_pct: Set(drop_pct),
            tvl_before: Set(tvl_before),
            tvl_after: Set(tvl_after),
            confirmed: Set(false),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        alert.insert(&self.db).await.map_err(|e| {
            TvlStoreError::DatabaseError(format!("Failed to insert alert: {}", e))
        })?;

        Ok(())
    }
}
