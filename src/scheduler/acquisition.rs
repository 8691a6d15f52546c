use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::acquisition::{Acquirer, AcquisitionConfig, DownloadRequest};
use crate::app::Result;
use crate::domain::content::{INFO_DOWNLOADING, INFO_FINISHED, INFO_STALE_RESET};
use crate::domain::{ContentState, ContentUpdate};
use crate::store::Store;

/// What a single acquisition tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// No pending item was waiting.
    Idle,
    Downloaded { content_credit: String, path: String },
    Failed { content_credit: String, reason: String },
}

impl AcquisitionOutcome {
    pub fn attempted(&self) -> bool {
        !matches!(self, AcquisitionOutcome::Idle)
    }
}

/// Drains the pending backlog one item per tick.
pub struct AcquisitionScheduler<S: Store + Send + Sync + 'static> {
    store: Arc<S>,
    acquirer: Arc<dyn Acquirer + Send + Sync>,
    format: String,
    interval: Duration,
    tick_on_start: bool,
    throttle: Duration,
    recover_stale_after: Option<Duration>,
}

impl<S: Store + Send + Sync + 'static> AcquisitionScheduler<S> {
    pub fn new(
        store: Arc<S>,
        acquirer: Arc<dyn Acquirer + Send + Sync>,
        config: &AcquisitionConfig,
    ) -> Self {
        Self {
            store,
            acquirer,
            format: config.format.clone(),
            interval: config.interval.as_duration(),
            tick_on_start: config.tick_on_start,
            throttle: config.throttle.as_duration(),
            recover_stale_after: config.recover_stale_after.map(|i| i.as_duration()),
        }
    }

    /// Claims the oldest pending item, downloads it and records the result.
    ///
    /// The claim is persisted before the download starts. A failed download
    /// is an `Ok(Failed)` outcome; only storage failures are errors.
    pub async fn tick(&self) -> Result<AcquisitionOutcome> {
        let Some(content) = self.store.next_pending_content()? else {
            return Ok(AcquisitionOutcome::Idle);
        };

        let claim = content.transition(ContentState::Downloading, INFO_DOWNLOADING, None)?;
        self.store.update_content(content.id, &claim)?;
        info!(content = %content.content_credit, "Downloading {}", content.display_title());

        let mut claimed = content;
        claimed.state = ContentState::Downloading;

        let request = DownloadRequest {
            content_credit: claimed.content_credit.clone(),
            format: self.format.clone(),
            force: false,
        };

        let failure = match self.acquirer.download(&request).await {
            Ok(download) if download.finished => {
                let path = download.local_path.to_string_lossy().into_owned();
                let update = claimed.transition(
                    ContentState::Downloaded,
                    INFO_FINISHED,
                    Some(path.clone()),
                )?;
                self.store.update_content(claimed.id, &update)?;
                info!(content = %claimed.content_credit, "Downloaded to {}", path);
                return Ok(AcquisitionOutcome::Downloaded {
                    content_credit: claimed.content_credit,
                    path,
                });
            }
            Ok(_) => "download did not finish".to_string(),
            Err(e) => e.to_string(),
        };

        let update = claimed.transition(ContentState::Failed, failure.clone(), None)?;
        self.store.update_content(claimed.id, &update)?;
        warn!(content = %claimed.content_credit, "Download failed: {}", failure);

        Ok(AcquisitionOutcome::Failed {
            content_credit: claimed.content_credit,
            reason: failure,
        })
    }

    /// Puts items that have sat in `downloading` longer than `older_than`
    /// back into the pending backlog. Returns how many were reset.
    pub fn recover_stale(&self, older_than: Duration) -> Result<usize> {
        let age = chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());
        let stale = self.store.stale_downloading(Utc::now() - age)?;

        for content in &stale {
            let update = ContentUpdate {
                state: Some(ContentState::Pending),
                info: Some(INFO_STALE_RESET.to_string()),
                path: None,
                updated_at: Some(Utc::now()),
            };
            self.store.update_content(content.id, &update)?;
            warn!(content = %content.content_credit, "Reset stale download");
        }

        Ok(stale.len())
    }

    /// Runs ticks on a fixed interval until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Acquisition loop started (interval: {}, throttle: {})",
            crate::config::format_interval(self.interval.as_secs()),
            crate::config::format_interval(self.throttle.as_secs())
        );

        if let Some(threshold) = self.recover_stale_after {
            match self.recover_stale(threshold) {
                Ok(0) => {}
                Ok(n) => info!("Reset {} stale downloads", n),
                Err(e) => error!("Stale download recovery failed: {}", e),
            }
        }

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

            match self.tick().await {
                Ok(outcome) if outcome.attempted() && !self.throttle.is_zero() => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = sleep(self.throttle) => {}
                    }
                }
                Ok(_) => {}
                Err(e) => error!("Acquisition tick aborted: {}", e),
            }
        }

        info!("Acquisition loop stopped");
    }
}
