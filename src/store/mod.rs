pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{
    Channel, ChannelFilter, ChannelUpdate, Content, ContentFilter, ContentUpdate, Subscription,
    SubscriptionFilter, User, UserFilter,
};

pub use sqlite::SqliteStore;

/// Persistence seam shared by the subscription manager and both schedulers.
///
/// `update_*` and `delete_*` return `ListenError::NotFound` when no row
/// matched the key.
pub trait Store {
    // User operations
    fn add_user(&self, user: &User) -> Result<i64>;
    fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>>;

    // Channel operations
    fn add_channel(&self, channel: &Channel) -> Result<i64>;
    fn find_channels(&self, filter: &ChannelFilter) -> Result<Vec<Channel>>;
    fn update_channel(&self, id: i64, update: &ChannelUpdate) -> Result<()>;

    // Subscription operations
    fn add_subscription(&self, subscription: &Subscription) -> Result<i64>;
    fn find_subscriptions(&self, filter: &SubscriptionFilter) -> Result<Vec<Subscription>>;
    fn delete_subscription(&self, id: i64) -> Result<()>;
    fn subscribed_channel_credits(&self) -> Result<Vec<String>>;

    // Content operations
    fn add_content(&self, content: &Content) -> Result<i64>;
    fn find_contents(&self, filter: &ContentFilter) -> Result<Vec<Content>>;
    fn update_content(&self, id: i64, update: &ContentUpdate) -> Result<()>;
    fn next_pending_content(&self) -> Result<Option<Content>>;
    fn contents_for_channels(
        &self,
        channel_credits: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Content>>;
    fn stale_downloading(&self, before: DateTime<Utc>) -> Result<Vec<Content>>;
}
