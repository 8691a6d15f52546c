use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub platform: String,
    pub name: String,
    pub description: String,
    pub owner_urls: Vec<String>,
    pub thumbnails: Vec<String>,
    pub channel_credit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(platform: &str, channel_credit: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            platform: platform.to_string(),
            name: String::new(),
            description: String::new(),
            owner_urls: Vec::new(),
            thumbnails: Vec::new(),
            channel_credit: channel_credit.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.channel_credit
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChannelUpdate {
    /// Marks the channel as refreshed now, with its latest title and
    /// description. Empty values leave the stored ones untouched.
    pub fn refreshed(name: &str, description: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            name: non_empty(name),
            description: non_empty(description),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    pub channel_credit: Option<String>,
}

impl ChannelFilter {
    pub fn by_credit(credit: &str) -> Self {
        Self {
            channel_credit: Some(credit.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_credit() {
        let channel = Channel::new("youtube", "@rustlang");
        assert_eq!(channel.display_name(), "@rustlang");
    }

    #[test]
    fn test_display_name_prefers_name() {
        let mut channel = Channel::new("youtube", "@rustlang");
        channel.name = "Rust".into();
        assert_eq!(channel.display_name(), "Rust");
    }

    #[test]
    fn test_refreshed_without_metadata_only_sets_timestamp() {
        let update = ChannelUpdate::refreshed("", "");
        assert!(update.updated_at.is_some());
        assert!(update.name.is_none());
        assert!(update.description.is_none());
    }

    #[test]
    fn test_refreshed_skips_empty_fields() {
        let update = ChannelUpdate::refreshed("Rust", "");
        assert_eq!(update.name.as_deref(), Some("Rust"));
        assert!(update.description.is_none());
        assert!(update.updated_at.is_some());
    }
}
