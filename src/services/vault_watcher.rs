//! Vault TVL watcher
//!
//! Watches the TVL of a single vault and raises an alert when it falls by
//! 20% or more between two consecutive observations. Observations come from
//! an [`ObservationSource`] (live chain polling or a deterministic simulated
//! replay), are persisted through a [`TvlStore`], and are compared against
//! the previous observation held in process-local state.
//!
//! One watcher instance tracks exactly one (vault, network) pair and
//! processes observations strictly sequentially. Running two watchers
//! against the same pair is unsupported.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::services::tvl_store::TvlStore;
use crate::services::vault_reader::VaultReader;

/// Inclusive alert threshold: a drop of exactly 20% raises an alert
pub const DROP_ALERT_THRESHOLD: Decimal = dec!(0.20);

/// First block number of the simulated replay
pub const SIMULATED_START_BLOCK: u64 = 1_000_000;

/// Live polling cadence. Base blocks land every ~2s, but we poll coarsely
/// to avoid hammering the RPC endpoint.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// Simulated replay cadence
const SIMULATED_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One (block_number, tvl) sample for the watched vault
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub block_number: u64,
    /// TVL in human units of the tracked asset
    pub tvl: Decimal,
}

/// Produces the ordered sequence of TVL observations the watcher consumes.
///
/// Implementations must yield strictly increasing block numbers; the watcher
/// performs no reordering or validation of its own. `Ok(None)` means the
/// source is exhausted and the watcher loop should wind down.
#[async_trait]
pub trait ObservationSource: Send {
    async fn next_observation(&mut self) -> Result<Option<Observation>, BoxError>;

    /// Cadence the watcher loop polls this source at
    fn poll_interval(&self) -> Duration;
}

/// Live source: on each tick, read the current head block and the vault's
/// asset balance at that block.
pub struct LiveObservationSource {
    reader: VaultReader,
    poll_interval: Duration,
}

impl LiveObservationSource {
    pub fn new(reader: VaultReader, poll_interval: Duration) -> Self {
        Self {
            reader,
            poll_interval,
        }
    }
}

#[async_trait]
impl ObservationSource for LiveObservationSource {
    async fn next_observation(&mut self) -> Result<Option<Observation>, BoxError> {
        let block_number = self.reader.current_block_number().await?;
        let tvl = self.reader.tvl_at_block(block_number).await?;
        Ok(Some(Observation { block_number, tvl }))
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Simulated source: replays a fixed synthetic TVL sequence at consecutive
/// block numbers, then reports exhaustion. Finite and non-restartable.
pub struct SimulatedObservationSource {
    observations: Vec<Observation>,
    cursor: usize,
}

impl SimulatedObservationSource {
    /// Default drainage scenario: +2%, -1%, then a -25% and a -33.3% step,
    /// so the 4th and 5th transitions deterministically raise alerts.
    pub fn new() -> Self {
        Self::with_sequence(
            SIMULATED_START_BLOCK,
            vec![
                dec!(100000),
                dec!(102000),
                dec!(101000),
                dec!(75000),
                dec!(50000),
                dec!(48000),
            ],
        )
    }

    /// Replay an arbitrary TVL sequence starting at `start_block`
    pub fn with_sequence(start_block: u64, tvls: Vec<Decimal>) -> Self {
        let observations = tvls
            .into_iter()
            .enumerate()
            .map(|(i, tvl)| Observation {
                block_number: start_block + i as u64,
                tvl,
            })
            .collect();

        Self {
            observations,
            cursor: 0,
        }
    }
}

impl Default for SimulatedObservationSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservationSource for SimulatedObservationSource {
    async fn next_observation(&mut self) -> Result<Option<Observation>, BoxError> {
        match self.observations.get(self.cursor) {
            Some(observation) => {
                self.cursor += 1;
                info!(
                    block_number = observation.block_number,
                    tvl = %observation.tvl,
                    "Simulated block"
                );
                Ok(Some(*observation))
            }
            None => Ok(None),
        }
    }

    fn poll_interval(&self) -> Duration {
        SIMULATED_POLL_INTERVAL
    }
}

/// Handle to a running watcher task
pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Signal the watcher loop to stop and wait for it to finish.
    ///
    /// An in-flight tick is allowed to complete; no new tick starts after
    /// this returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Watcher task join failed");
        }
    }
}

/// Drop-detection state machine for one (vault, network) pair
pub struct VaultWatcher {
    vault_address: String,
    network: String,
    store: Arc<dyn TvlStore>,
    /// Most recently processed observation; None before the first one.
    /// Owned by this instance, discarded when the watcher stops.
    last_observation: Option<Observation>,
}

impl VaultWatcher {
    pub fn new(vault_address: &str, network: &str, store: Arc<dyn TvlStore>) -> Self {
        Self {
            // Canonical form: comparisons and storage always use lowercase
            vault_address: vault_address.to_lowercase(),
            network: network.to_string(),
            store,
            last_observation: None,
        }
    }

    pub fn vault_address(&self) -> &str {
        &self.vault_address
    }

    /// Spawn the watcher loop driven by `source` and return its handle
    pub fn start(self, source: Box<dyn ObservationSource>) -> WatcherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(source, shutdown_rx));

        WatcherHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        mut self,
        mut source: Box<dyn ObservationSource>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            vault = %self.vault_address,
            network = %self.network,
            "Vault watcher started"
        );

        let mut ticker = interval(source.poll_interval());

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(vault = %self.vault_address, "Vault watcher stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match source.next_observation().await {
                        Ok(Some(observation)) => self.process_observation(observation).await,
                        Ok(None) => {
                            info!(vault = %self.vault_address, "Simulation complete");
                            break;
                        }
                        Err(e) => {
                            // Transient fetch failure: skip this tick without
                            // touching drop-detection state
                            warn!(
                                vault = %self.vault_address,
                                error = %e,
                                "Failed to fetch observation, skipping tick"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Persist one observation, compare it to its predecessor and raise an
    /// alert on a drop of [`DROP_ALERT_THRESHOLD`] or more.
    ///
    /// Persistence failures are logged and do not stop processing: the
    /// drop-detection state always advances so the detector stays in sync
    /// with the latest value once storage recovers.
    pub async fn process_observation(&mut self, observation: Observation) {
        let Observation { block_number, tvl } = observation;

        if let Err(e) = self
            .store
            .upsert_observation(&self.vault_address, &self.network, block_number, tvl)
            .await
        {
            error!(
                vault = %self.vault_address,
                block_number = block_number,
                error = %e,
                "Failed to store observation"
            );
        }

        if let Some(previous) = self.last_observation {
            // Guarded against a zero predecessor: no division by zero, no
            // infinite-percentage alerts
            if previous.tvl > Decimal::ZERO {
                let drop_pct = (previous.tvl - tvl) / previous.tvl;

                if drop_pct >= DROP_ALERT_THRESHOLD {
                    warn!(
                        vault = %self.vault_address,
                        block_number = block_number,
                        drop_pct = %drop_pct,
                        tvl_before = %previous.tvl,
                        tvl_after = %tvl,
                        "🚨 ALERT: TVL drop detected"
                    );

                    if let Err(e) = self
                        .store
                        .insert_alert(
                            &self.vault_address,
                            &self.network,
                            block_number,
                            drop_pct,
                            previous.tvl,
                            tvl,
                        )
                        .await
                    {
                        error!(
                            vault = %self.vault_address,
                            block_number = block_number,
                            error = %e,
                            "Failed to store alert"
                        );
                    }
                }
            }
        }

        // Advance unconditionally, even when persistence failed above
        self.last_observation = Some(Observation { block_number, tvl });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tvl_store::TvlStoreError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct StoredObservation {
        vault_address: String,
        network: String,
        block_number: u64,
        tvl: Decimal,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct StoredAlert {
        vault_address: String,
        network: String,
        block_number: u64,
        drop_pct: Decimal,
        tvl_before: Decimal,
        tvl_after: Decimal,
    }

    /// In-memory store implementing the gateway contract, with optional
    /// write-failure injection
    #[derive(Default)]
    struct MemoryTvlStore {
        observations: Mutex<Vec<StoredObservation>>,
        alerts: Mutex<Vec<StoredAlert>>,
        alert_attempts: AtomicUsize,
        fail_writes: bool,
    }

    impl MemoryTvlStore {
        fn failing() -> Self {
            Self {
                fail_writes: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TvlStore for MemoryTvlStore {
        async fn upsert_observation(
            &self,
            vault_address: &str,
            network: &str,
            block_number: u64,
            tvl: Decimal,
        ) -> Result<(), TvlStoreError> {
            if self.fail_writes {
                return Err(TvlStoreError::DatabaseError("storage offline".to_string()));
            }

            let mut observations = self.observations.lock();
            let duplicate = observations
                .iter()
                .any(|o| o.vault_address == vault_address && o.block_number == block_number);

            // First write wins
            if !duplicate {
                observations.push(StoredObservation {
                    vault_address: vault_address.to_string(),
                    network: network.to_string(),
                    block_number,
                    tvl,
                });
            }

            Ok(())
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
            self.alert_attempts.fetch_add(1, Ordering::SeqCst);

            if self.fail_writes {
                return Err(TvlStoreError::DatabaseError("storage offline".to_string()));
            }

            self.alerts.lock().push(StoredAlert {
                vault_address: vault_address.to_string(),
                network: network.to_string(),
                block_number,
                drop_pct,
                tvl_before,
                tvl_after,
            });

            Ok(())
        }
    }

    fn watcher(store: Arc<MemoryTvlStore>) -> VaultWatcher {
        VaultWatcher::new("0xVaultAddress", "base", store)
    }

    fn obs(block_number: u64, tvl: Decimal) -> Observation {
        Observation { block_number, tvl }
    }

    #[tokio::test]
    async fn test_first_observation_never_alerts() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(100000))).await;

        assert_eq!(store.observations.lock().len(), 1);
        assert!(store.alerts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_quarter_drop_emits_single_alert() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(100000))).await;
        w.process_observation(obs(1001, dec!(75000))).await;

        let alerts = store.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].block_number, 1001);
        assert_eq!(alerts[0].drop_pct, dec!(0.25));
        assert_eq!(alerts[0].tvl_before, dec!(100000));
        assert_eq!(alerts[0].tvl_after, dec!(75000));
        assert_eq!(alerts[0].vault_address, "0xvaultaddress");
        assert_eq!(alerts[0].network, "base");
    }

    #[tokio::test]
    async fn test_fifteen_percent_drop_no_alert() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(100000))).await;
        w.process_observation(obs(1001, dec!(85000))).await;

        assert!(store.alerts.lock().is_empty());
        assert_eq!(store.observations.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_exact_twenty_percent_drop_alerts() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(100000))).await;
        w.process_observation(obs(1001, dec!(80000))).await;

        let alerts = store.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].drop_pct, dec!(0.20));
    }

    #[tokio::test]
    async fn test_just_under_threshold_no_alert() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        // 19.9999% drop
        w.process_observation(obs(1000, dec!(100000))).await;
        w.process_observation(obs(1001, dec!(80000.1))).await;

        assert!(store.alerts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_zero_tvl_predecessor_never_alerts() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(0))).await;
        w.process_observation(obs(1001, dec!(50))).await;
        assert!(store.alerts.lock().is_empty());

        // The zero guard only spans one transition: a later real drop alerts
        w.process_observation(obs(1002, dec!(10))).await;
        assert_eq!(store.alerts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_tvl_increase_no_alert() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(100000))).await;
        w.process_observation(obs(1001, dec!(140000))).await;

        assert!(store.alerts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_block_keeps_first_write() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());

        w.process_observation(obs(1000, dec!(100000))).await;
        w.process_observation(obs(1000, dec!(999))).await;

        let observations = store.observations.lock();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].tvl, dec!(100000));
    }

    #[tokio::test]
    async fn test_simulated_sequence_emits_two_alerts() {
        let store = Arc::new(MemoryTvlStore::default());
        let mut w = watcher(store.clone());
        let mut source = SimulatedObservationSource::new();

        while let Some(observation) = source.next_observation().await.unwrap() {
            w.process_observation(observation).await;
        }

        assert_eq!(store.observations.lock().len(), 6);

        let alerts = store.alerts.lock();
        assert_eq!(alerts.len(), 2);

        // 4th transition: 101000 -> 75000
        assert_eq!(alerts[0].block_number, SIMULATED_START_BLOCK + 3);
        assert_eq!(alerts[0].drop_pct, dec!(26000) / dec!(101000));
        assert_eq!(alerts[0].tvl_before, dec!(101000));
        assert_eq!(alerts[0].tvl_after, dec!(75000));

        // 5th transition: 75000 -> 50000
        assert_eq!(alerts[1].block_number, SIMULATED_START_BLOCK + 4);
        assert_eq!(alerts[1].drop_pct, dec!(25000) / dec!(75000));
        assert_eq!(alerts[1].tvl_before, dec!(75000));
        assert_eq!(alerts[1].tvl_after, dec!(50000));
    }

    #[tokio::test]
    async fn test_simulated_source_exhausts() {
        let mut source = SimulatedObservationSource::new();

        for i in 0..6 {
            let observation = source.next_observation().await.unwrap().unwrap();
            assert_eq!(observation.block_number, SIMULATED_START_BLOCK + i);
        }

        assert!(source.next_observation().await.unwrap().is_none());
        // Exhausted for good
        assert!(source.next_observation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_advances_when_store_fails() {
        let store = Arc::new(MemoryTvlStore::failing());
        let mut w = watcher(store.clone());

        // Upsert fails but state must still advance
        w.process_observation(obs(1, dec!(100000))).await;
        // 25% drop vs the advanced state: alert attempted (and fails)
        w.process_observation(obs(2, dec!(75000))).await;
        // +6.7% vs 75000: no alert. Were the state stuck at 100000 this
        // would read as a 20% drop and attempt a second alert.
        w.process_observation(obs(3, dec!(80000))).await;

        assert_eq!(store.alert_attempts.load(Ordering::SeqCst), 1);
        assert!(store.observations.lock().is_empty());
        assert!(store.alerts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_watcher_lifecycle_stop() {
        let store = Arc::new(MemoryTvlStore::default());
        let w = watcher(store);

        let handle = w.start(Box::new(SimulatedObservationSource::new()));
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_custom_sequence_blocks() {
        let source = SimulatedObservationSource::with_sequence(42, vec![dec!(1), dec!(2)]);
        assert_eq!(source.observations[0].block_number, 42);
        assert_eq!(source.observations[1].block_number, 43);
    }
}
