//! In-memory fakes for the gateway traits, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::acquisition::{Acquirer, Download, DownloadRequest};
use crate::app::{ListenError, Result};
use crate::discovery::{ChannelInfo, Discovered, Discovery, ItemInfo};
use crate::domain::{ContentFilter, ContentState, User, PLATFORM_YOUTUBE};
use crate::store::{SqliteStore, Store};

/// In-memory store with users `u1` and `u2`.
pub fn seeded_store() -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().unwrap();
    for credit in ["u1", "u2"] {
        let now = Utc::now();
        store
            .add_user(&User {
                id: 0,
                credit: credit.to_string(),
                name: format!("user {}", credit),
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }
    Arc::new(store)
}

/// An item published `hours_ago` hours before now.
pub fn item(credit: &str, hours_ago: i64, access_restricted: bool) -> ItemInfo {
    ItemInfo {
        credit: credit.to_string(),
        title: format!("Video {}", credit),
        thumbnail: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", credit),
        published_at: Utc::now() - chrono::Duration::hours(hours_ago),
        duration: Duration::from_secs(300),
        access_restricted,
    }
}

#[derive(Default)]
pub struct FakeDiscovery {
    items: Mutex<HashMap<String, Vec<ItemInfo>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_items(&self, channel_credit: &str, items: Vec<ItemInfo>) {
        self.items
            .lock()
            .unwrap()
            .insert(channel_credit.to_string(), items);
    }

    pub fn fail(&self, channel_credit: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(channel_credit.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    async fn fetch(&self, channel_credit: &str) -> Result<Discovered> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(channel_credit) {
            return Err(ListenError::Discovery(format!(
                "{}: connection reset",
                channel_credit
            )));
        }

        let items = self
            .items
            .lock()
            .unwrap()
            .get(channel_credit)
            .cloned()
            .ok_or_else(|| ListenError::Discovery(format!("{}: no such channel", channel_credit)))?;

        Ok(Discovered {
            channel: ChannelInfo {
                platform: PLATFORM_YOUTUBE.to_string(),
                title: format!("Channel {}", channel_credit),
                description: "fake channel".to_string(),
                owner_urls: vec![format!("https://www.youtube.com/@{}", channel_credit)],
                thumbnails: vec![],
                channel_credit: channel_credit.to_string(),
            },
            items,
        })
    }
}

/// Records requests and pretends to write `/media/<credit>/audio.<format>`.
#[derive(Default)]
pub struct FakeAcquirer {
    failing: Mutex<HashSet<String>>,
    unfinished: Mutex<HashSet<String>>,
    requests: Mutex<Vec<DownloadRequest>>,
    observe: Option<Arc<SqliteStore>>,
    observed: Mutex<Vec<ContentState>>,
}

impl FakeAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also records the stored state of each item at the time it is requested.
    pub fn observing(store: Arc<SqliteStore>) -> Self {
        Self {
            observe: Some(store),
            ..Self::default()
        }
    }

    pub fn fail(&self, content_credit: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(content_credit.to_string());
    }

    pub fn unfinished(&self, content_credit: &str) {
        self.unfinished
            .lock()
            .unwrap()
            .insert(content_credit.to_string());
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn observed_states(&self) -> Vec<ContentState> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Acquirer for FakeAcquirer {
    async fn download(&self, request: &DownloadRequest) -> Result<Download> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(store) = &self.observe {
            let stored = store.find_contents(&ContentFilter::by_credit(&request.content_credit))?;
            if let Some(content) = stored.first() {
                self.observed.lock().unwrap().push(content.state);
            }
        }

        if self.failing.lock().unwrap().contains(&request.content_credit) {
            return Err(ListenError::Acquisition(format!(
                "yt-dlp exited with exit status: 1: ERROR: [youtube] {}: Video unavailable",
                request.content_credit
            )));
        }

        Ok(Download {
            finished: !self.unfinished.lock().unwrap().contains(&request.content_credit),
            local_path: PathBuf::from("/media")
                .join(&request.content_credit)
                .join(format!("audio.{}", request.format)),
        })
    }
}
