pub mod config;
pub mod timefmt;
pub mod youtube;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app::Result;

pub use config::DiscoveryConfig;
pub use youtube::YoutubeDiscovery;

/// Channel metadata as reported by the platform.
#[derive(Debug, Clone, Default)]
pub struct ChannelInfo {
    pub platform: String,
    pub title: String,
    pub description: String,
    pub owner_urls: Vec<String>,
    pub thumbnails: Vec<String>,
    /// The reference the channel was fetched with.
    pub channel_credit: String,
}

/// One published item of a channel.
#[derive(Debug, Clone)]
pub struct ItemInfo {
    pub credit: String,
    pub title: String,
    pub thumbnail: String,
    pub published_at: DateTime<Utc>,
    pub duration: Duration,
    /// Members-only and similar items that cannot be downloaded.
    pub access_restricted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Discovered {
    pub channel: ChannelInfo,
    pub items: Vec<ItemInfo>,
}

#[async_trait]
pub trait Discovery {
    /// Resolves a channel reference to its metadata and currently listed items.
    async fn fetch(&self, channel_credit: &str) -> Result<Discovered>;
}
