use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{ListenError, Result};
use crate::discovery::Discovery;
use crate::domain::{
    Channel, ChannelFilter, Content, ContentFilter, Subscription, SubscriptionFilter, User,
    UserFilter,
};
use crate::scheduler::discovery::ingest_items;
use crate::store::Store;

/// One page of a user's content listing.
#[derive(Debug, Clone)]
pub struct ContentPage {
    pub page_index: usize,
    pub page_size: usize,
    pub contents: Vec<Content>,
}

/// User-facing subscription operations.
///
/// Creating the first subscription to a channel also creates the channel
/// and seeds its content backlog from the discovery gateway.
pub struct SubscriptionManager<S: Store + Send + Sync + 'static> {
    store: Arc<S>,
    discovery: Arc<dyn Discovery + Send + Sync>,
}

impl<S: Store + Send + Sync + 'static> SubscriptionManager<S> {
    pub fn new(store: Arc<S>, discovery: Arc<dyn Discovery + Send + Sync>) -> Self {
        Self { store, discovery }
    }

    fn require_user(&self, user_credit: &str) -> Result<User> {
        let mut users = self.store.find_users(&UserFilter::by_credit(user_credit))?;
        if users.len() != 1 {
            return Err(ListenError::NotFound(format!("user {}", user_credit)));
        }
        Ok(users.remove(0))
    }

    pub async fn add_subscription(
        &self,
        user_credit: &str,
        channel_credit: &str,
    ) -> Result<Subscription> {
        let channel_credit = channel_credit.trim();
        if user_credit.trim().is_empty() || channel_credit.is_empty() {
            return Err(ListenError::InvalidInput(
                "user and channel credits are required".to_string(),
            ));
        }

        self.require_user(user_credit)?;

        let filter = SubscriptionFilter::by_pair(user_credit, channel_credit);
        if !self.store.find_subscriptions(&filter)?.is_empty() {
            return Err(ListenError::AlreadyExists(format!(
                "subscription of {} to {}",
                user_credit, channel_credit
            )));
        }

        if self
            .store
            .find_channels(&ChannelFilter::by_credit(channel_credit))?
            .is_empty()
        {
            self.bootstrap_channel(channel_credit).await?;
        }

        let mut subscription = Subscription::new(user_credit, channel_credit);
        subscription.id = self.store.add_subscription(&subscription)?;
        info!(user = %user_credit, channel = %channel_credit, "Subscribed");
        Ok(subscription)
    }

    /// Creates the channel record and its initial content rows.
    async fn bootstrap_channel(&self, channel_credit: &str) -> Result<()> {
        let discovered = self.discovery.fetch(channel_credit).await.map_err(|e| {
            warn!(channel = %channel_credit, "channel lookup failed: {}", e);
            ListenError::NotFound(format!("channel {}", channel_credit))
        })?;
        if discovered.items.is_empty() {
            return Err(ListenError::NotFound(format!("channel {}", channel_credit)));
        }

        let info = discovered.channel;
        let mut channel = Channel::new(&info.platform, channel_credit);
        channel.name = info.title;
        channel.description = info.description;
        channel.owner_urls = info.owner_urls;
        channel.thumbnails = info.thumbnails;
        self.store.add_channel(&channel)?;

        let (inserted, skipped) = ingest_items(
            self.store.as_ref(),
            &channel.platform,
            channel_credit,
            &discovered.items,
        )?;
        info!(
            channel = %channel_credit,
            "Created channel {} with {} items ({} already known)",
            channel.display_name(),
            inserted,
            skipped
        );
        Ok(())
    }

    pub fn delete_subscription(&self, user_credit: &str, channel_credit: &str) -> Result<()> {
        if user_credit.trim().is_empty() || channel_credit.trim().is_empty() {
            return Err(ListenError::InvalidInput(
                "user and channel credits are required".to_string(),
            ));
        }

        self.require_user(user_credit)?;

        let filter = SubscriptionFilter::by_pair(user_credit, channel_credit.trim());
        let subscriptions = self.store.find_subscriptions(&filter)?;
        let [subscription] = subscriptions.as_slice() else {
            return Err(ListenError::NotFound(format!(
                "subscription of {} to {}",
                user_credit, channel_credit
            )));
        };

        self.store.delete_subscription(subscription.id)?;
        info!(user = %user_credit, channel = %channel_credit, "Unsubscribed");
        Ok(())
    }

    pub fn list_subscriptions(&self, user_credit: &str) -> Result<Vec<Subscription>> {
        self.require_user(user_credit)?;
        self.store
            .find_subscriptions(&SubscriptionFilter::by_user(user_credit))
    }

    /// Content of every subscribed channel, newest first. `page_index` is 1-based.
    pub fn list_content(
        &self,
        user_credit: &str,
        page_index: usize,
        page_size: usize,
    ) -> Result<ContentPage> {
        if page_index < 1 || page_size < 1 {
            return Err(ListenError::InvalidInput(format!(
                "page index and size must be at least 1 (got {} and {})",
                page_index, page_size
            )));
        }

        self.require_user(user_credit)?;

        let channels: Vec<String> = self
            .list_subscriptions(user_credit)?
            .into_iter()
            .map(|s| s.channel_credit)
            .collect();

        let contents = if channels.is_empty() {
            Vec::new()
        } else {
            self.store.contents_for_channels(
                &channels,
                page_size,
                (page_index - 1).saturating_mul(page_size),
            )?
        };

        Ok(ContentPage {
            page_index,
            page_size,
            contents,
        })
    }

    pub fn get_content(&self, content_credit: &str) -> Result<Content> {
        self.store
            .find_contents(&ContentFilter::by_credit(content_credit))?
            .into_iter()
            .next()
            .ok_or_else(|| ListenError::NotFound(format!("content {}", content_credit)))
    }

    pub fn get_channel(&self, channel_credit: &str) -> Result<Channel> {
        self.store
            .find_channels(&ChannelFilter::by_credit(channel_credit))?
            .into_iter()
            .next()
            .ok_or_else(|| ListenError::NotFound(format!("channel {}", channel_credit)))
    }
}
