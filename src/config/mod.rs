//! Configuration management for listen-tube.
//!
//! Configuration is read from `~/.config/listen-tube/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod interval;

pub use interval::{format_interval, parse_interval, Interval};

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::acquisition::AcquisitionConfig;
use crate::discovery::DiscoveryConfig;

const APP_DIR: &str = "listen-tube";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub discovery: DiscoveryConfig,
    pub acquisition: AcquisitionConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; `None` means `<data_dir>/listen-tube/listen-tube.db`
    #[serde(deserialize_with = "empty_as_none")]
    pub path: Option<PathBuf>,
}

/// Reads an optional setting where an empty string means "not set".
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&PathBuf> {
    path.as_ref().filter(|p| !p.as_os_str().is_empty())
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create(&config_path)
    }

    /// Like [`Config::load`], for an explicit path.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Reads an existing config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/listen-tube/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    fn data_dir() -> Result<PathBuf, ConfigError> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join(APP_DIR))
    }

    /// Database file, falling back to `<data_dir>/listen-tube/listen-tube.db`.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        match non_empty(&self.store.path) {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("listen-tube.db")),
        }
    }

    /// Media directory, falling back to `<data_dir>/listen-tube/media`.
    pub fn media_path(&self) -> Result<PathBuf, ConfigError> {
        match non_empty(&self.acquisition.base_path) {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("media")),
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# listen-tube configuration
#
# Intervals are written as "30s", "10m", "6h", "1d" or plain seconds.

[store]
# SQLite database file (default: <data_dir>/listen-tube/listen-tube.db)
# path = "/var/lib/listen-tube/listen-tube.db"

[discovery]
# Look for new items on every subscribed channel
enabled = true
interval = "1h"

# Run a pass right after startup instead of waiting one interval
tick_on_start = true

# Pause between two channel page fetches
request_delay = "2s"

# HTTP request timeout
timeout = "15s"

# HTTP(S) proxy for channel page requests
# proxy = "http://127.0.0.1:8080"

[acquisition]
# Download pending items one at a time
enabled = true
interval = "5m"
tick_on_start = true

# Pause after every attempted download
throttle = "30s"

# Audio format passed to yt-dlp
format = "mp3"

# Media directory (default: <data_dir>/listen-tube/media)
# base_path = "/srv/listen-tube/media"

# yt-dlp executable, a path or a name on PATH
binary = "yt-dlp"

# Fetch yt-dlp from here when the binary above does not run
# binary_url = "https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp"

# Put items stuck in "downloading" for longer than this back into the
# pending backlog when the loop starts
# recover_stale_after = "6h"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl From<ConfigError> for crate::app::ListenError {
    fn from(e: ConfigError) -> Self {
        crate::app::ListenError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert!(config.discovery.enabled);
        assert_eq!(config.discovery.interval.as_duration(), Duration::from_secs(3600));
        assert_eq!(config.acquisition.throttle.as_duration(), Duration::from_secs(30));
        assert_eq!(config.acquisition.format, "mp3");
        assert!(config.store.path.is_none());
        assert!(config.acquisition.recover_stale_after.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[acquisition]
interval = "1d"
base_path = "/srv/media"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom values
        assert_eq!(config.acquisition.interval.as_duration(), Duration::from_secs(86400));
        assert_eq!(config.media_path().unwrap(), PathBuf::from("/srv/media"));
        // Default values
        assert_eq!(config.acquisition.binary, PathBuf::from("yt-dlp"));
        assert_eq!(config.discovery.request_delay.as_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(config.acquisition.enabled);
        assert!(config.discovery.proxy.is_none());
    }

    #[test]
    fn test_empty_values_mean_default() {
        let content = r##"
[store]
path = ""

[discovery]
proxy = ""

[acquisition]
base_path = ""
binary_url = "  "
recover_stale_after = ""
"##;
        let config: Config = toml::from_str(content).expect("Empty values should be accepted");

        assert!(config.store.path.is_none());
        assert!(config.discovery.proxy.is_none());
        assert!(config.acquisition.base_path.is_none());
        assert!(config.acquisition.binary_url.is_none());
        assert!(config.acquisition.recover_stale_after.is_none());
        assert!(config.db_path().unwrap().ends_with("listen-tube/listen-tube.db"));
        assert!(config.media_path().unwrap().ends_with("listen-tube/media"));
    }

    #[test]
    fn test_empty_path_set_in_code_falls_back() {
        let mut config = Config::default();
        config.store.path = Some(PathBuf::new());
        config.acquisition.base_path = Some(PathBuf::new());

        assert!(config.db_path().unwrap().ends_with("listen-tube.db"));
        assert!(config.media_path().unwrap().ends_with("media"));
    }

    #[test]
    fn test_optional_values_parse_when_set() {
        let content = r##"
[store]
path = "/var/lib/lt.db"

[acquisition]
recover_stale_after = "6h"
"##;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/var/lib/lt.db"));
        assert_eq!(
            config.acquisition.recover_stale_after,
            Some(Interval::from_secs(6 * 3600))
        );
        assert!(toml::from_str::<Config>("[acquisition]\nrecover_stale_after = \"soon\"").is_err());
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let result: Result<Config, _> = toml::from_str("[discovery]\ninterval = \"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert!(config.discovery.enabled);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.acquisition.format, "mp3");
    }

    #[test]
    fn test_load_from_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[discovery\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
