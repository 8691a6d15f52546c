use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::discovery::{Discovery, DiscoveryConfig, ItemInfo};
use crate::domain::{ChannelFilter, ChannelUpdate, Content, ContentFilter};
use crate::store::Store;

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub channels: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Builds the content row for a newly seen item.
pub(crate) fn content_from_item(platform: &str, channel_credit: &str, item: &ItemInfo) -> Content {
    let mut content =
        Content::discovered(platform, channel_credit, &item.credit, item.access_restricted);
    content.title = item.title.clone();
    content.thumbnail = item.thumbnail.clone();
    content.published_at = item.published_at;
    content.duration = item.duration;
    content
}

/// Inserts every item whose content credit is not stored yet.
///
/// Returns `(inserted, skipped)`. The existence check and the insert are
/// separate statements, so only one discovery writer may run at a time.
pub(crate) fn ingest_items<S: Store + ?Sized>(
    store: &S,
    platform: &str,
    channel_credit: &str,
    items: &[ItemInfo],
) -> Result<(usize, usize)> {
    let mut inserted = 0;
    let mut skipped = 0;

    for item in items {
        if !store
            .find_contents(&ContentFilter::by_credit(&item.credit))?
            .is_empty()
        {
            debug!(content = %item.credit, "content already exists");
            skipped += 1;
            continue;
        }

        store.add_content(&content_from_item(platform, channel_credit, item))?;
        inserted += 1;
    }

    Ok((inserted, skipped))
}

/// Periodically refreshes the content backlog of every subscribed channel.
pub struct DiscoveryScheduler<S: Store + Send + Sync + 'static> {
    store: Arc<S>,
    discovery: Arc<dyn Discovery + Send + Sync>,
    interval: Duration,
    tick_on_start: bool,
    request_delay: Duration,
}

impl<S: Store + Send + Sync + 'static> DiscoveryScheduler<S> {
    pub fn new(
        store: Arc<S>,
        discovery: Arc<dyn Discovery + Send + Sync>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self {
            store,
            discovery,
            interval: config.interval.as_duration(),
            tick_on_start: config.tick_on_start,
            request_delay: config.request_delay.as_duration(),
        }
    }

    /// One pass over all subscribed channels.
    ///
    /// Gateway failures are counted and skipped; a storage failure ends the
    /// pass with an error.
    pub async fn tick(&self, cancel: &CancellationToken) -> Result<DiscoveryReport> {
        let mut report = DiscoveryReport::default();
        let credits = self.store.subscribed_channel_credits()?;

        for (i, credit) in credits.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.request_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                break;
            }

            report.channels += 1;
            let discovered = match self.discovery.fetch(credit).await {
                Ok(discovered) => discovered,
                Err(e) => {
                    warn!(channel = %credit, "discovery failed: {}", e);
                    report.errors += 1;
                    continue;
                }
            };

            let (inserted, skipped) = ingest_items(
                self.store.as_ref(),
                &discovered.channel.platform,
                credit,
                &discovered.items,
            )?;
            report.inserted += inserted;
            report.skipped += skipped;
            if inserted > 0 {
                info!(channel = %credit, "{} new items", inserted);
            }

            match self.store.find_channels(&ChannelFilter::by_credit(credit))?.first() {
                Some(channel) => {
                    let update = ChannelUpdate::refreshed(
                        &discovered.channel.title,
                        &discovered.channel.description,
                    );
                    self.store.update_channel(channel.id, &update)?
                }
                None => warn!(channel = %credit, "subscribed channel has no channel record"),
            }
        }

        Ok(report)
    }

    async fn tick_and_log(&self, cancel: &CancellationToken) {
        let start = Utc::now();
        match self.tick(cancel).await {
            Ok(report) => {
                let elapsed = Utc::now().signed_duration_since(start);
                info!(
                    channels = report.channels,
                    inserted = report.inserted,
                    errors = report.errors,
                    "Discovery complete ({:.1}s)",
                    elapsed.num_milliseconds() as f64 / 1000.0
                );
            }
            Err(e) => error!("Discovery pass aborted: {}", e),
        }
    }

    /// Runs passes on a fixed interval until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Discovery loop started (interval: {})",
            crate::config::format_interval(self.interval.as_secs())
        );

        let mut timer = interval(self.interval.max(super::MIN_INTERVAL));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.tick_on_start {
            // The first tick of an interval completes immediately.
            timer.tick().await;
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }
            self.tick_and_log(&cancel).await;
        }

        info!("Discovery loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Channel, ContentState, Subscription};
    use crate::store::SqliteStore;
    use crate::testing::{item, seeded_store, FakeDiscovery};

    fn scheduler(
        store: Arc<SqliteStore>,
        discovery: Arc<FakeDiscovery>,
    ) -> DiscoveryScheduler<SqliteStore> {
        let config = DiscoveryConfig {
            request_delay: crate::config::Interval::from_secs(0),
            ..Default::default()
        };
        DiscoveryScheduler::new(store, discovery, &config)
    }

    fn subscribe(store: &SqliteStore, user: &str, channel: &str) {
        store.add_channel(&Channel::new("youtube", channel)).unwrap();
        store.add_subscription(&Subscription::new(user, channel)).unwrap();
    }

    #[tokio::test]
    async fn test_tick_inserts_new_items() {
        let store = seeded_store();
        subscribe(&store, "u1", "c1");
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 2, false), item("v2", 1, true)]);

        let report = scheduler(store.clone(), discovery)
            .tick(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.channels, 1);
        assert_eq!(report.inserted, 2);

        let v1 = store.find_contents(&ContentFilter::by_credit("v1")).unwrap();
        assert_eq!(v1[0].state, ContentState::Pending);
        assert_eq!(v1[0].channel_credit, "c1");
        let v2 = store.find_contents(&ContentFilter::by_credit("v2")).unwrap();
        assert_eq!(v2[0].state, ContentState::Failed);
    }

    #[tokio::test]
    async fn test_second_tick_does_not_duplicate() {
        let store = seeded_store();
        subscribe(&store, "u1", "c1");
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 2, false), item("v2", 1, false)]);
        let scheduler = scheduler(store.clone(), discovery);
        let cancel = CancellationToken::new();

        scheduler.tick(&cancel).await.unwrap();
        let before = store.find_contents(&ContentFilter::default()).unwrap().len();
        let report = scheduler.tick(&cancel).await.unwrap();
        let after = store.find_contents(&ContentFilter::default()).unwrap().len();

        assert_eq!(before, 2);
        assert_eq!(after, before);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_channel_shared_by_users_fetched_once() {
        let store = seeded_store();
        subscribe(&store, "u1", "c1");
        store.add_subscription(&Subscription::new("u2", "c1")).unwrap();
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 2, false)]);

        let report = scheduler(store, discovery.clone())
            .tick(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.channels, 1);
        assert_eq!(discovery.calls(), 1);
    }

    #[tokio::test]
    async fn test_gateway_failure_skips_channel() {
        let store = seeded_store();
        subscribe(&store, "u1", "broken");
        subscribe(&store, "u1", "c1");
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.fail("broken");
        discovery.set_items("c1", vec![item("v1", 2, false)]);

        let report = scheduler(store.clone(), discovery)
            .tick(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.channels, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn test_tick_touches_channel() {
        let store = seeded_store();
        let mut channel = Channel::new("youtube", "c1");
        channel.updated_at = Utc::now() - chrono::Duration::days(1);
        store.add_channel(&channel).unwrap();
        store.add_subscription(&Subscription::new("u1", "c1")).unwrap();
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![]);

        scheduler(store.clone(), discovery)
            .tick(&CancellationToken::new())
            .await
            .unwrap();

        let refreshed = store.find_channels(&ChannelFilter::by_credit("c1")).unwrap();
        assert!(refreshed[0].updated_at > Utc::now() - chrono::Duration::minutes(1));
        assert_eq!(refreshed[0].name, "Channel c1");
        assert_eq!(refreshed[0].description, "fake channel");
    }

    #[tokio::test]
    async fn test_new_items_appended_on_later_tick() {
        let store = seeded_store();
        subscribe(&store, "u1", "c1");
        let discovery = Arc::new(FakeDiscovery::new());
        discovery.set_items("c1", vec![item("v1", 2, false)]);
        let scheduler = scheduler(store.clone(), discovery.clone());
        let cancel = CancellationToken::new();

        scheduler.tick(&cancel).await.unwrap();
        discovery.set_items("c1", vec![item("v0", 0, false), item("v1", 2, false)]);
        let report = scheduler.tick(&cancel).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(store.find_contents(&ContentFilter::by_channel("c1")).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let store = seeded_store();
        let discovery = Arc::new(FakeDiscovery::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler(store, discovery).run(cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("loop did not stop")
            .unwrap();
    }
}
