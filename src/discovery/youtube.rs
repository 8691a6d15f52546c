use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Proxy};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::app::{ListenError, Result};
use crate::discovery::timefmt::{age_or_default, length_or_zero};
use crate::discovery::{ChannelInfo, Discovered, Discovery, DiscoveryConfig, ItemInfo};
use crate::domain::PLATFORM_YOUTUBE;

const BASE_URL: &str = "https://www.youtube.com";
const INITIAL_DATA_KEY: &str = "var ytInitialData = ";
const MEMBERS_ONLY_LABEL: &str = "Members only";

/// Scrapes channel metadata and the videos tab from YouTube channel pages.
pub struct YoutubeDiscovery {
    client: Client,
}

impl YoutubeDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout.as_duration())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str());

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Maps `@handle`, a bare channel id, or a full URL onto a channel page URL.
    pub fn channel_url(channel_credit: &str) -> Result<Url> {
        let credit = channel_credit.trim();
        if credit.is_empty() {
            return Err(ListenError::InvalidInput("empty channel reference".into()));
        }

        let raw = if credit.starts_with("https://") || credit.starts_with("http://") {
            credit.to_string()
        } else if credit.starts_with('@') {
            format!("{}/{}", BASE_URL, credit)
        } else {
            format!("{}/channel/{}", BASE_URL, credit)
        };

        Ok(Url::parse(&raw)?)
    }

    async fn get_page(&self, url: &Url) -> Result<String> {
        debug!("GET {}", url);
        let response = self.client.get(url.as_str()).send().await?;
        response.error_for_status_ref()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Discovery for YoutubeDiscovery {
    async fn fetch(&self, channel_credit: &str) -> Result<Discovered> {
        let page = self.get_page(&Self::channel_url(channel_credit)?).await?;
        let channel_id = parse_external_id(&extract_initial_data(&page)?)?;

        let videos_url = Url::parse(&format!(
            "{}/channel/{}/videos?view=0&flow=grid",
            BASE_URL, channel_id
        ))?;
        let data = extract_initial_data(&self.get_page(&videos_url).await?)?;

        Ok(Discovered {
            channel: parse_channel_info(&data, channel_credit),
            items: parse_videos(&data, channel_credit, Utc::now()),
        })
    }
}

/// Pulls the `ytInitialData` JSON object out of a channel page.
pub fn extract_initial_data(html: &str) -> Result<Value> {
    let start = html
        .find(INITIAL_DATA_KEY)
        .ok_or_else(|| ListenError::Discovery("ytInitialData not found in page".into()))?
        + INITIAL_DATA_KEY.len();
    let len = html[start..]
        .find("};")
        .ok_or_else(|| ListenError::Discovery("unterminated ytInitialData".into()))?;

    Ok(serde_json::from_str(&html[start..=start + len])?)
}

pub fn parse_external_id(data: &Value) -> Result<String> {
    data.pointer("/metadata/channelMetadataRenderer/externalId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or_else(|| ListenError::Discovery("channel id missing from page".into()))
}

pub fn parse_channel_info(data: &Value, channel_credit: &str) -> ChannelInfo {
    let metadata = data
        .pointer("/metadata/channelMetadataRenderer")
        .cloned()
        .unwrap_or(Value::Null);

    let text = |key: &str| {
        metadata
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let owner_urls = metadata
        .get("ownerUrls")
        .and_then(Value::as_array)
        .map(|urls| {
            urls.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let thumbnails = metadata
        .pointer("/avatar/thumbnails")
        .and_then(Value::as_array)
        .map(|thumbs| {
            thumbs
                .iter()
                .filter_map(|t| t.get("url").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    ChannelInfo {
        platform: PLATFORM_YOUTUBE.to_string(),
        title: text("title"),
        description: text("description"),
        owner_urls,
        thumbnails,
        channel_credit: channel_credit.to_string(),
    }
}

/// Reads the items listed on the "Videos" tab.
pub fn parse_videos(data: &Value, channel_credit: &str, now: DateTime<Utc>) -> Vec<ItemInfo> {
    let tabs = data
        .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
        .and_then(Value::as_array);

    let entries = tabs
        .and_then(|tabs| {
            tabs.iter().find(|tab| {
                tab.pointer("/tabRenderer/title").and_then(Value::as_str) == Some("Videos")
            })
        })
        .and_then(|tab| tab.pointer("/tabRenderer/content/richGridRenderer/contents"))
        .and_then(Value::as_array);

    let Some(entries) = entries else {
        warn!("No videos tab found for channel {}", channel_credit);
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.get("continuationItemRenderer").is_none())
        .filter_map(|entry| {
            let video = entry.pointer("/richItemRenderer/content/videoRenderer")?;
            let credit = video.get("videoId").and_then(Value::as_str).unwrap_or("");
            let title = video
                .pointer("/title/runs/0/text")
                .and_then(Value::as_str)
                .unwrap_or("");
            if credit.is_empty() || title.is_empty() {
                warn!("videoId or title is empty, skip. channel: {}", channel_credit);
                return None;
            }

            let published_text = video
                .pointer("/publishedTimeText/simpleText")
                .and_then(Value::as_str)
                .unwrap_or("");
            let length_text = video
                .pointer("/lengthText/simpleText")
                .and_then(Value::as_str)
                .unwrap_or("");
            let published_at = chrono::Duration::from_std(age_or_default(published_text))
                .ok()
                .and_then(|age| now.checked_sub_signed(age))
                .unwrap_or_else(|| {
                    warn!("Published time '{}' out of range, using now", published_text);
                    now
                });

            Some(ItemInfo {
                credit: credit.to_string(),
                title: title.to_string(),
                thumbnail: best_thumbnail(video),
                published_at,
                duration: length_or_zero(length_text),
                access_restricted: is_members_only(video),
            })
        })
        .collect()
}

fn best_thumbnail(video: &Value) -> String {
    let url = video
        .pointer("/thumbnail/thumbnails")
        .and_then(Value::as_array)
        .and_then(|thumbs| thumbs.last())
        .and_then(|t| t.get("url"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let url = url.split('?').next().unwrap_or("");
    normalize_custom_thumbnail(url)
}

/// `hqdefault_custom_3.jpg` -> `hqdefault.jpg`
fn normalize_custom_thumbnail(url: &str) -> String {
    const MARKER: &str = "hqdefault_custom_";

    if let Some(pos) = url.find(MARKER) {
        let rest = &url[pos + MARKER.len()..];
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 && rest[digits..].starts_with(".jpg") {
            return format!("{}hqdefault.jpg{}", &url[..pos], &rest[digits + 4..]);
        }
    }
    url.to_string()
}

fn is_members_only(video: &Value) -> bool {
    video
        .get("badges")
        .and_then(Value::as_array)
        .map(|badges| {
            badges.iter().any(|badge| {
                badge
                    .pointer("/metadataBadgeRenderer/label")
                    .and_then(Value::as_str)
                    == Some(MEMBERS_ONLY_LABEL)
            })
        })
        .unwrap_or(false)
}
