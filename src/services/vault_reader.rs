//! Vault balance reader
//!
//! Reads the tracked ERC-20 asset's balance held by the vault address at a
//! given block and converts it to a human-unit TVL using the asset's
//! on-chain decimal precision.

use alloy::{
    eips::BlockId,
    primitives::Address,
    providers::{Provider, ProviderBuilder, RootProvider},
    sol,
    transports::http::{Client, Http},
};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, error, info};

// Minimal ERC-20 surface needed for TVL reads
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// Error types for the vault reader
#[derive(Debug)]
pub enum VaultReaderError {
    ProviderError(String),
    ContractCallError(String),
    InvalidConfig(String),
    InvalidBalance(String),
}

impl std::fmt::Display for VaultReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultReaderError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            VaultReaderError::ContractCallError(msg) => {
                write!(f, "Contract call error: {}", msg)
            }
            VaultReaderError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            VaultReaderError::InvalidBalance(msg) => write!(f, "Invalid balance: {}", msg),
        }
    }
}

impl std::error::Error for VaultReaderError {}

/// Reads vault TVL from the chain via an HTTP provider
pub struct VaultReader {
    provider: RootProvider<Http<Client>>,
    asset_address: Address,
    vault_address: Address,
}

impl VaultReader {
    /// Connect to the RPC endpoint and validate the configured addresses.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - Chain RPC URL
    /// * `asset_address` - Tracked ERC-20 asset contract (e.g. USDC)
    /// * `vault_address` - Vault address whose balance is observed
    pub async fn new(
        rpc_url: &str,
        asset_address: &str,
        vault_address: &str,
    ) -> Result<Self, VaultReaderError> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse().map_err(|e| {
            VaultReaderError::InvalidConfig(format!("Invalid RPC URL: {}", e))
        })?);

        // Verify connection
        let chain_id = provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to connect to RPC endpoint");
            VaultReaderError::ProviderError(format!("Connection failed: {}", e))
        })?;

        let asset_address = Address::from_str(asset_address).map_err(|e| {
            VaultReaderError::InvalidConfig(format!("Invalid asset address: {}", e))
        })?;
        let vault_address = Address::from_str(vault_address).map_err(|e| {
            VaultReaderError::InvalidConfig(format!("Invalid vault address: {}", e))
        })?;

        info!(
            chain_id = chain_id,
            asset = %asset_address,
            vault = %vault_address,
            "VaultReader connected"
        );

        Ok(Self {
            provider,
            asset_address,
            vault_address,
        })
    }

    /// Current head block number as reported by the provider
    pub async fn current_block_number(&self) -> Result<u64, VaultReaderError> {
        self.provider.get_block_number().await.map_err(|e| {
            VaultReaderError::ProviderError(format!("Failed to fetch block number: {}", e))
        })
    }

    /// TVL (human units) held by the vault at the given block
    pub async fn tvl_at_block(&self, block_number: u64) -> Result<Decimal, VaultReaderError> {
        let erc20 = IERC20::new(self.asset_address, &self.provider);

        let raw_balance = erc20
            .balanceOf(self.vault_address)
            .block(BlockId::number(block_number))
            .call()
            .await
            .map_err(|e| {
                VaultReaderError::ContractCallError(format!("balanceOf failed: {}", e))
            })?
            ._0;

        let decimals = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| {
                VaultReaderError::ContractCallError(format!("decimals failed: {}", e))
            })?
            ._0;

        let tvl = scale_balance(&raw_balance.to_string(), decimals)?;

        debug!(
            block_number = block_number,
            raw_balance = %raw_balance,
            decimals = decimals,
            tvl = %tvl,
            "Fetched vault balance"
        );

        Ok(tvl)
    }
}

/// Convert a raw integer balance to human units (divide by 10^decimals)
fn scale_balance(raw: &str, decimals: u8) -> Result<Decimal, VaultReaderError> {
    let balance = Decimal::from_str(raw).map_err(|e| {
        VaultReaderError::InvalidBalance(format!("Balance out of range: {} ({})", raw, e))
    })?;

    let divisor = Decimal::from_str(&format!("1{}", "0".repeat(decimals as usize)))
        .map_err(|e| {
            VaultReaderError::InvalidBalance(format!("Unsupported decimals {}: {}", decimals, e))
        })?;

    Ok(balance / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scale_balance_usdc_decimals() {
        // 100_000 USDC with 6 decimals
        let tvl = scale_balance("100000000000", 6).unwrap();
        assert_eq!(tvl, dec!(100000));
    }

    #[test]
    fn test_scale_balance_zero_decimals() {
        let tvl = scale_balance("12345", 0).unwrap();
        assert_eq!(tvl, dec!(12345));
    }

    #[test]
    fn test_scale_balance_fractional() {
        let tvl = scale_balance("1500000", 6).unwrap();
        assert_eq!(tvl, dec!(1.5));
    }

    #[test]
    fn test_scale_balance_out_of_range() {
        // Larger than Decimal's 96-bit mantissa
        let raw = "9".repeat(40);
        assert!(scale_balance(&raw, 18).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = VaultReaderError::ProviderError("test".to_string());
        assert!(err.to_string().contains("Provider error"));

        let err = VaultReaderError::InvalidConfig("test".to_string());
        assert!(err.to_string().contains("Invalid config"));
    }
}
