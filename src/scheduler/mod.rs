pub mod acquisition;
pub mod discovery;

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::store::Store;

pub use acquisition::{AcquisitionOutcome, AcquisitionScheduler};
pub use discovery::{DiscoveryReport, DiscoveryScheduler};

/// Lower bound for loop intervals; `tokio::time::interval` rejects zero.
pub(crate) const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// The two background loops. Either one may be left out when disabled.
pub struct Pipeline<S: Store + Send + Sync + 'static> {
    pub discovery: Option<DiscoveryScheduler<S>>,
    pub acquisition: Option<AcquisitionScheduler<S>>,
}

impl<S: Store + Send + Sync + 'static> Pipeline<S> {
    /// Spawns the enabled loops. They stop once `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> PipelineHandle {
        let mut tasks = Vec::new();

        match self.discovery {
            Some(scheduler) => tasks.push(tokio::spawn(scheduler.run(cancel.clone()))),
            None => info!("Discovery loop disabled"),
        }
        match self.acquisition {
            Some(scheduler) => tasks.push(tokio::spawn(scheduler.run(cancel.clone()))),
            None => info!("Acquisition loop disabled"),
        }

        PipelineHandle { cancel, tasks }
    }
}

/// Running loops started by [`Pipeline::start`].
pub struct PipelineHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Cancels the loops and waits for in-flight ticks to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.wait().await;
    }

    async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Pipeline task ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::acquisition::AcquisitionConfig;
    use crate::config::Interval;
    use crate::discovery::DiscoveryConfig;
    use crate::domain::{Channel, ContentFilter, ContentState, Subscription};
    use crate::subscription::SubscriptionManager;
    use crate::testing::{item, seeded_store, FakeAcquirer, FakeDiscovery};

    fn acquisition(
        store: Arc<crate::store::SqliteStore>,
        acquirer: Arc<FakeAcquirer>,
    ) -> AcquisitionScheduler<crate::store::SqliteStore> {
        let config = AcquisitionConfig {
            throttle: Interval::from_secs(0),
            ..Default::default()
        };
        AcquisitionScheduler::new(store, acquirer, &config)
    }

    #[tokio::test]
    async fn test_subscribe_then_download() {
        let store = seeded_store();
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 2, false), item("v2", 1, true)]);
        let manager = SubscriptionManager::new(store.clone(), discovery);

        manager.add_subscription("u1", "c1").await.unwrap();

        assert_eq!(manager.get_channel("c1").unwrap().name, "Channel c1");
        assert_eq!(manager.list_subscriptions("u1").unwrap().len(), 1);
        assert_eq!(manager.get_content("v1").unwrap().state, ContentState::Pending);
        assert_eq!(manager.get_content("v2").unwrap().state, ContentState::Failed);

        let acquirer = Arc::new(FakeAcquirer::new());
        let scheduler = acquisition(store.clone(), acquirer.clone());
        let outcome = scheduler.tick().await.unwrap();
        assert!(matches!(
            outcome,
            AcquisitionOutcome::Downloaded { ref content_credit, .. } if content_credit == "v1"
        ));

        let downloaded = manager.get_content("v1").unwrap();
        assert_eq!(downloaded.state, ContentState::Downloaded);
        assert!(downloaded.path.as_deref().is_some_and(|p| !p.is_empty()));
        assert_eq!(manager.get_content("v2").unwrap().state, ContentState::Failed);

        // The restricted item never reaches the acquirer.
        assert!(matches!(scheduler.tick().await.unwrap(), AcquisitionOutcome::Idle));
        assert_eq!(acquirer.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_then_failed_download() {
        let store = seeded_store();
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 2, false)]);
        let manager = SubscriptionManager::new(store.clone(), discovery);
        manager.add_subscription("u1", "c1").await.unwrap();

        let acquirer = Arc::new(FakeAcquirer::new());
        acquirer.fail("v1");
        let scheduler = acquisition(store.clone(), acquirer);

        assert!(matches!(
            scheduler.tick().await.unwrap(),
            AcquisitionOutcome::Failed { .. }
        ));
        let failed = manager.get_content("v1").unwrap();
        assert_eq!(failed.state, ContentState::Failed);
        assert!(failed.path.is_none());
        assert!(matches!(scheduler.tick().await.unwrap(), AcquisitionOutcome::Idle));
    }

    #[tokio::test]
    async fn test_pipeline_discovers_and_downloads() {
        let store = seeded_store();
        store.add_channel(&Channel::new("youtube", "c1")).unwrap();
        store.add_subscription(&Subscription::new("u1", "c1")).unwrap();

        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 3, false), item("v2", 2, true)]);
        let acquirer = Arc::new(FakeAcquirer::new());

        let discovery_config = DiscoveryConfig {
            request_delay: Interval::from_secs(0),
            ..Default::default()
        };
        let acquisition_config = AcquisitionConfig {
            interval: Interval::from_secs(1),
            throttle: Interval::from_secs(0),
            ..Default::default()
        };
        let pipeline = Pipeline {
            discovery: Some(DiscoveryScheduler::new(
                store.clone(),
                discovery,
                &discovery_config,
            )),
            acquisition: Some(AcquisitionScheduler::new(
                store.clone(),
                acquirer.clone(),
                &acquisition_config,
            )),
        };

        let handle = pipeline.start(CancellationToken::new());
        assert_eq!(handle.running(), 2);

        let downloaded = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let done = store
                    .find_contents(&ContentFilter::by_state(ContentState::Downloaded))
                    .unwrap();
                if !done.is_empty() {
                    return done;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("nothing downloaded");

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("pipeline did not stop");

        assert_eq!(downloaded.len(), 1);
        assert_eq!(downloaded[0].content_credit, "v1");
        let restricted = store.find_contents(&ContentFilter::by_credit("v2")).unwrap();
        assert_eq!(restricted[0].state, ContentState::Failed);
        let attempted: Vec<_> = acquirer
            .requests()
            .into_iter()
            .map(|r| r.content_credit)
            .collect();
        assert_eq!(attempted, vec!["v1"]);
    }

    #[tokio::test]
    async fn test_disabled_loops_not_spawned() {
        let pipeline: Pipeline<crate::store::SqliteStore> = Pipeline {
            discovery: None,
            acquisition: None,
        };
        let handle = pipeline.start(CancellationToken::new());
        assert_eq!(handle.running(), 0);
        handle.shutdown().await;
    }
}
