//! Vault query API request/response models
//!
//! Models for the read-only projection over stored TVL points and alerts.
//! TVL amounts serialize as decimal strings so no precision is lost on the
//! way out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One TVL observation as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct TvlPointResponse {
    pub vault_address: String,
    pub network: String,
    pub block_number: i64,
    pub tvl: Decimal,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TvlHistoryResponse {
    pub vault_address: String,
    /// Chronological (oldest first)
    pub data: Vec<TvlPointResponse>,
}

/// Query parameters for the TVL history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TvlHistoryQuery {
    /// Lower bound on recorded_at (RFC3339)
    pub from: Option<DateTime<Utc>>,
    /// Upper bound on recorded_at (RFC3339)
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_history_limit")]
    pub limit: u64,
}

fn default_history_limit() -> u64 {
    100
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertResponse {
    pub id: i64,
    pub vault_address: String,
    pub network: String,
    pub block_number: i64,
    pub drop_pct: Decimal,
    pub tvl_before: Decimal,
    pub tvl_after: Decimal,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertsResponse {
    pub vault_address: String,
    /// Newest first
    pub alerts: Vec<AlertResponse>,
}

/// Query parameters for the alerts endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AlertsQuery {
    #[serde(default = "default_alerts_limit")]
    pub limit: u64,
}

fn default_alerts_limit() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfoResponse {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_query_defaults() {
        let query: TvlHistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 100);
        assert!(query.from.is_none());
        assert!(query.to.is_none());
    }

    #[test]
    fn test_alerts_query_defaults() {
        let query: AlertsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_tvl_serializes_without_precision_loss() {
        let point = TvlPointResponse {
            vault_address: "0xabc".to_string(),
            network: "base".to_string(),
            block_number: 1000,
            tvl: Decimal::new(1234567890123456789, 12),
            recorded_at: Utc::now(),
        };

        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("1234567.890123456789"));
    }
}
