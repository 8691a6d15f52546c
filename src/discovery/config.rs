use serde::{Deserialize, Serialize};

use crate::config::Interval;

/// Discovery loop and channel page fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Run the discovery loop (default: true)
    pub enabled: bool,

    /// Time between discovery passes (default: 1h)
    pub interval: Interval,

    /// Run a pass as soon as the loop starts (default: true)
    pub tick_on_start: bool,

    /// Pause between two channel fetches within one pass (default: 2s)
    pub request_delay: Interval,

    /// HTTP request timeout (default: 15s)
    pub timeout: Interval,

    /// Optional HTTP(S) proxy for channel page requests
    #[serde(deserialize_with = "crate::config::empty_as_none")]
    pub proxy: Option<String>,

    /// User agent string to use
    pub user_agent: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Interval::from_secs(3600),
            tick_on_start: true,
            request_delay: Interval::from_secs(2),
            timeout: Interval::from_secs(15),
            proxy: None,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}
