use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{ListenError, Result};

pub const INFO_PREPARED: &str = "prepared";
pub const INFO_MEMBERS_ONLY: &str = "skip for members only";
pub const INFO_DOWNLOADING: &str = "downloading";
pub const INFO_FINISHED: &str = "finished";
pub const INFO_STALE_RESET: &str = "reset after stale download";

/// Lifecycle of a content item.
///
/// ```text
/// (discovered) -> Pending -> Downloading -> Downloaded
///       |            |            |
///       +-> Failed   +-> Failed   +-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    Pending,
    Downloading,
    Downloaded,
    Failed,
}

impl ContentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentState::Pending => "pending",
            ContentState::Downloading => "downloading",
            ContentState::Downloaded => "downloaded",
            ContentState::Failed => "failed",
        }
    }

    /// Forward-only transitions of the acquisition pipeline.
    pub fn can_transition_to(&self, next: ContentState) -> bool {
        matches!(
            (self, next),
            (ContentState::Pending, ContentState::Downloading)
                | (ContentState::Pending, ContentState::Failed)
                | (ContentState::Downloading, ContentState::Downloaded)
                | (ContentState::Downloading, ContentState::Failed)
        )
    }
}

impl fmt::Display for ContentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentState {
    type Err = ListenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ContentState::Pending),
            "downloading" => Ok(ContentState::Downloading),
            "downloaded" => Ok(ContentState::Downloaded),
            "failed" => Ok(ContentState::Failed),
            other => Err(ListenError::InvalidInput(format!(
                "unknown content state: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub platform: String,
    pub channel_credit: String,
    pub title: String,
    pub thumbnail: String,
    pub content_credit: String,
    pub state: ContentState,
    pub info: String,
    pub published_at: DateTime<Utc>,
    pub duration: Duration,
    pub path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    /// A freshly discovered item. Access-restricted items never become
    /// eligible for download, so they start out failed.
    pub fn discovered(
        platform: &str,
        channel_credit: &str,
        content_credit: &str,
        access_restricted: bool,
    ) -> Self {
        let now = Utc::now();
        let (state, info) = if access_restricted {
            (ContentState::Failed, INFO_MEMBERS_ONLY)
        } else {
            (ContentState::Pending, INFO_PREPARED)
        };
        Self {
            id: 0,
            platform: platform.to_string(),
            channel_credit: channel_credit.to_string(),
            title: String::new(),
            thumbnail: String::new(),
            content_credit: content_credit.to_string(),
            state,
            info: info.to_string(),
            published_at: now,
            duration: Duration::ZERO,
            path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }

    /// Builds the patch moving this item to `next`, rejecting any backward
    /// or skipping move.
    pub fn transition(
        &self,
        next: ContentState,
        info: impl Into<String>,
        path: Option<String>,
    ) -> Result<ContentUpdate> {
        if !self.state.can_transition_to(next) {
            return Err(ListenError::InvalidInput(format!(
                "content {} cannot move from {} to {}",
                self.content_credit, self.state, next
            )));
        }
        Ok(ContentUpdate {
            state: Some(next),
            info: Some(info.into()),
            path,
            updated_at: Some(Utc::now()),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentUpdate {
    pub state: Option<ContentState>,
    pub info: Option<String>,
    pub path: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub content_credit: Option<String>,
    pub channel_credit: Option<String>,
    pub state: Option<ContentState>,
}

impl ContentFilter {
    pub fn by_credit(credit: &str) -> Self {
        Self {
            content_credit: Some(credit.to_string()),
            ..Default::default()
        }
    }

    pub fn by_channel(channel_credit: &str) -> Self {
        Self {
            channel_credit: Some(channel_credit.to_string()),
            ..Default::default()
        }
    }

    pub fn by_state(state: ContentState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }
}
