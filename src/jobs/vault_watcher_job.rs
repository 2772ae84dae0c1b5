//! Vault Watcher Job
//!
//! Reads watcher configuration from the environment and starts the vault
//! watcher as a background task with an explicit stop handle. Unlike the
//! sync jobs this grew out of, missing configuration here is fatal: the
//! process must refuse to start rather than run half-configured.

use sea_orm::DatabaseConnection;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::services::tvl_store::PgTvlStore;
use crate::services::vault_watcher::{
    BoxError, DEFAULT_POLL_INTERVAL, LiveObservationSource, ObservationSource,
    SimulatedObservationSource, VaultWatcher, WatcherHandle,
};
use crate::services::vault_reader::VaultReader;

/// Environment variable for the chain RPC URL (live mode)
const ENV_RPC_URL: &str = "RPC_URL";

/// Environment variable for the tracked ERC-20 asset contract (live mode)
const ENV_ASSET_ADDRESS: &str = "ASSET_ADDRESS";

/// Environment variable for the watched vault address
const ENV_VAULT_ADDRESS: &str = "VAULT_ADDRESS";

/// Environment variable for the logical network label
const ENV_NETWORK: &str = "NETWORK";

/// Environment variable selecting "live" or "simulated" sourcing
const ENV_WATCH_MODE: &str = "WATCH_MODE";

/// Legacy toggle: MOCK_MODE=true selects simulated sourcing
const ENV_MOCK_MODE: &str = "MOCK_MODE";

/// Environment variable for the live polling interval in seconds
const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";

const DEFAULT_NETWORK: &str = "base";

/// Error types for watcher configuration
#[derive(Debug)]
pub enum ConfigError {
    MissingEnv(&'static str),
    InvalidMode(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingEnv(name) => {
                write!(f, "Missing required environment variable: {}", name)
            }
            ConfigError::InvalidMode(mode) => {
                write!(f, "Invalid {}: {} (expected live|simulated)", ENV_WATCH_MODE, mode)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Live,
    Simulated,
}

impl WatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchMode::Live => "live",
            WatchMode::Simulated => "simulated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "live" => Some(WatchMode::Live),
            "simulated" => Some(WatchMode::Simulated),
            _ => None,
        }
    }
}

/// Watcher configuration resolved from the environment
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub mode: WatchMode,
    pub network: String,
    pub vault_address: String,
    /// Required in live mode, unused in simulated mode
    pub rpc_url: Option<String>,
    /// Required in live mode, unused in simulated mode
    pub asset_address: Option<String>,
    pub poll_interval: Duration,
}

impl WatcherConfig {
    /// Resolve the configuration, erroring on anything the selected mode
    /// requires but the environment does not provide.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env::var(ENV_WATCH_MODE) {
            Ok(raw) => WatchMode::from_str(&raw).ok_or(ConfigError::InvalidMode(raw))?,
            Err(_) => {
                let mock = env::var(ENV_MOCK_MODE)
                    .map(|v| v.to_lowercase() == "true")
                    .unwrap_or(false);
                if mock {
                    WatchMode::Simulated
                } else {
                    WatchMode::Live
                }
            }
        };

        let network =
            env::var(ENV_NETWORK).unwrap_or_else(|_| DEFAULT_NETWORK.to_string());

        let vault_address =
            env::var(ENV_VAULT_ADDRESS).map_err(|_| ConfigError::MissingEnv(ENV_VAULT_ADDRESS))?;

        let poll_interval = env::var(ENV_POLL_INTERVAL)
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let (rpc_url, asset_address) = match mode {
            WatchMode::Live => (
                Some(env::var(ENV_RPC_URL).map_err(|_| ConfigError::MissingEnv(ENV_RPC_URL))?),
                Some(
                    env::var(ENV_ASSET_ADDRESS)
                        .map_err(|_| ConfigError::MissingEnv(ENV_ASSET_ADDRESS))?,
                ),
            ),
            WatchMode::Simulated => (None, None),
        };

        Ok(Self {
            mode,
            network,
            vault_address,
            rpc_url,
            asset_address,
            poll_interval,
        })
    }
}

/// Build the configured observation source and start the watcher.
///
/// Returns the handle used to stop the watcher on shutdown. Live mode
/// verifies the RPC connection and addresses before the loop starts.
pub async fn start_vault_watcher(
    db: DatabaseConnection,
    config: &WatcherConfig,
) -> Result<WatcherHandle, BoxError> {
    info!(
        mode = config.mode.as_str(),
        network = %config.network,
        vault = %config.vault_address,
        "Starting vault watcher"
    );

    let store = Arc::new(PgTvlStore::new(db));
    let watcher = VaultWatcher::new(&config.vault_address, &config.network, store);

    let source: Box<dyn ObservationSource> = match config.mode {
        WatchMode::Live => {
            let rpc_url = config
                .rpc_url
                .as_deref()
                .ok_or(ConfigError::MissingEnv(ENV_RPC_URL))?;
            let asset_address = config
                .asset_address
                .as_deref()
                .ok_or(ConfigError::MissingEnv(ENV_ASSET_ADDRESS))?;

            let reader =
                VaultReader::new(rpc_url, asset_address, watcher.vault_address()).await?;

            Box::new(LiveObservationSource::new(reader, config.poll_interval))
        }
        WatchMode::Simulated => Box::new(SimulatedObservationSource::new()),
    };

    Ok(watcher.start(source))
}
