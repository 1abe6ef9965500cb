//! OutboxBuilder - outbox の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須の port（storage, remote store）が無ければ build() が BuildError を返す
//! - 設定は build() 時に検証する

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::{ConfigError, OutboxConfig};
use crate::outbox::OutboxStore;
use crate::ports::{
    Clock, ConnectivityMonitor, IdGenerator, KeyValueStorage, RemoteStore, SystemClock,
    UlidGenerator,
};

use super::api::Outbox;
use super::engine::{EngineSettings, SyncEngine};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("a storage backend is required")]
    MissingStorage,

    #[error("a remote store is required")]
    MissingRemoteStore,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct OutboxBuilder {
    config: OutboxConfig,
    storage: Option<Arc<dyn KeyValueStorage>>,
    remote: Option<Arc<dyn RemoteStore>>,
    signals: Option<watch::Receiver<bool>>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    initially_online: bool,
}

impl OutboxBuilder {
    pub fn new() -> Self {
        Self {
            config: OutboxConfig::default(),
            storage: None,
            remote: None,
            signals: None,
            clock: Arc::new(SystemClock),
            ids: None,
            initially_online: true,
        }
    }

    pub fn config(mut self, config: OutboxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn remote_store(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Follow `monitor`. Without one the outbox stays online.
    pub fn connectivity(mut self, monitor: &dyn ConnectivityMonitor) -> Self {
        self.signals = Some(monitor.subscribe());
        self
    }

    /// Startup state before the first connectivity signal (default: online).
    pub fn initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults to a [`UlidGenerator`] over the configured clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Load the persisted queue and start following connectivity.
    ///
    /// Must be called inside a Tokio runtime. Jobs left over from a previous
    /// run are drained on the next trigger.
    pub async fn build(self) -> Result<Outbox, BuildError> {
        self.config.validate()?;
        let storage = self.storage.ok_or(BuildError::MissingStorage)?;
        let remote = self.remote.ok_or(BuildError::MissingRemoteStore)?;

        let settings = EngineSettings {
            retry_policy: self.config.retry_policy(),
            save_retries: self.config.save_retries,
            save_retry_delay: self.config.save_retry_delay(),
            auto_retry: self.config.auto_retry,
        };
        let store = OutboxStore::new(storage, self.config.storage_key.clone());
        let engine =
            Arc::new(SyncEngine::load(store, remote, settings, self.initially_online).await);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let watcher = self
            .signals
            .map(|signals| engine.watch_connectivity(signals, shutdown_rx));

        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&self.clock))),
        };

        Ok(Outbox::new(
            engine,
            ids,
            self.clock,
            self.config.target(),
            shutdown_tx,
            watcher,
        ))
    }
}

impl Default for OutboxBuilder {
    fn default() -> Self {
        Self::new()
    }
}
