pub mod channel;
pub mod content;
pub mod subscription;
pub mod user;

pub use channel::{Channel, ChannelFilter, ChannelUpdate};
pub use content::{Content, ContentFilter, ContentState, ContentUpdate};
pub use subscription::{Subscription, SubscriptionFilter};
pub use user::{User, UserFilter};

/// Platform tag carried on channels and contents.
pub const PLATFORM_YOUTUBE: &str = "youtube";
