use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Interval;

/// Acquisition loop and the yt-dlp wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Run the acquisition loop (default: true)
    pub enabled: bool,

    /// Time between acquisition ticks (default: 5m)
    pub interval: Interval,

    /// Run a tick as soon as the loop starts (default: true)
    pub tick_on_start: bool,

    /// Pause after every attempted download (default: 30s)
    pub throttle: Interval,

    /// Audio format handed to yt-dlp (default: mp3)
    pub format: String,

    /// Media directory; `None` means `<data_dir>/listen-tube/media`
    #[serde(deserialize_with = "crate::config::empty_as_none")]
    pub base_path: Option<PathBuf>,

    /// yt-dlp executable, either a path or a name on PATH
    pub binary: PathBuf,

    /// Where to fetch yt-dlp from when `binary` does not run
    #[serde(deserialize_with = "crate::config::empty_as_none")]
    pub binary_url: Option<String>,

    /// Reset items stuck in `downloading` for longer than this at startup
    #[serde(deserialize_with = "crate::config::empty_as_none")]
    pub recover_stale_after: Option<Interval>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Interval::from_secs(300),
            tick_on_start: true,
            throttle: Interval::from_secs(30),
            format: "mp3".to_string(),
            base_path: None,
            binary: PathBuf::from("yt-dlp"),
            binary_url: None,
            recover_stale_after: None,
        }
    }
}
