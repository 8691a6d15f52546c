use std::sync::Arc;

use crate::acquisition::{Acquirer, YtDlp};
use crate::app::error::Result;
use crate::config::Config;
use crate::discovery::{Discovery, YoutubeDiscovery};
use crate::scheduler::{AcquisitionScheduler, DiscoveryScheduler, Pipeline};
use crate::store::sqlite::SqliteStore;
use crate::subscription::SubscriptionManager;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub discovery: Arc<dyn Discovery + Send + Sync>,
    pub acquirer: Arc<dyn Acquirer + Send + Sync>,
    pub subscriptions: SubscriptionManager<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let discovery: Arc<dyn Discovery + Send + Sync> =
            Arc::new(YoutubeDiscovery::new(&config.discovery)?);
        let acquirer: Arc<dyn Acquirer + Send + Sync> = Arc::new(YtDlp::from_config(
            &config.acquisition,
            config.media_path()?,
        ));
        Ok(Self::with_gateways(config, store, discovery, acquirer))
    }

    pub fn with_gateways(
        config: Config,
        store: Arc<SqliteStore>,
        discovery: Arc<dyn Discovery + Send + Sync>,
        acquirer: Arc<dyn Acquirer + Send + Sync>,
    ) -> Self {
        let subscriptions = SubscriptionManager::new(store.clone(), discovery.clone());
        Self {
            config,
            store,
            discovery,
            acquirer,
            subscriptions,
        }
    }

    /// Checks (and if configured, fetches) the yt-dlp binary, then swaps it
    /// in as the acquirer. Returns the yt-dlp version.
    pub async fn prepare_acquirer(&mut self) -> Result<String> {
        let mut ytdlp = YtDlp::from_config(&self.config.acquisition, self.config.media_path()?);
        let version = ytdlp.prepare().await?;
        self.acquirer = Arc::new(ytdlp);
        Ok(version)
    }

    pub fn discovery_scheduler(&self) -> DiscoveryScheduler<SqliteStore> {
        DiscoveryScheduler::new(
            self.store.clone(),
            self.discovery.clone(),
            &self.config.discovery,
        )
    }

    pub fn acquisition_scheduler(&self) -> AcquisitionScheduler<SqliteStore> {
        AcquisitionScheduler::new(
            self.store.clone(),
            self.acquirer.clone(),
            &self.config.acquisition,
        )
    }

    /// Both loops, minus the ones disabled in the config.
    pub fn pipeline(&self) -> Pipeline<SqliteStore> {
        Pipeline {
            discovery: self
                .config
                .discovery
                .enabled
                .then(|| self.discovery_scheduler()),
            acquisition: self
                .config
                .acquisition
                .enabled
                .then(|| self.acquisition_scheduler()),
        }
    }
}
