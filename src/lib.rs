//! # listen-tube
//!
//! Subscribe to YouTube channels and keep their audio downloaded.
//!
//! ## Architecture
//!
//! Two background loops share one SQLite store:
//!
//! ```text
//! Subscription → Channel + seed Content
//! Discovery loop  → new Content (pending | failed)
//! Acquisition loop → pending → downloading → downloaded | failed
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a user and note the printed credit
//! listen-tube user add alice
//!
//! # Subscribe to a channel
//! listen-tube subscribe <credit> @somechannel
//!
//! # Keep discovering and downloading until Ctrl-C
//! listen-tube run
//!
//! # Browse what was found
//! listen-tube contents <credit>
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// both gateways and the subscription manager.
pub mod app;

/// Configuration file handling.
///
/// Loads from `~/.config/listen-tube/config.toml`, with intervals written
/// as `"30s"`, `"10m"`, `"6h"` or `"1d"`.
pub mod config;

/// Command-line interface using clap.
pub mod cli;

/// Core domain models.
///
/// - [`User`](domain::User), [`Channel`](domain::Channel),
///   [`Subscription`](domain::Subscription)
/// - [`Content`](domain::Content) and its [`ContentState`](domain::ContentState) lifecycle
pub mod domain;

/// Channel discovery.
///
/// - [`Discovery`](discovery::Discovery): Async trait resolving a channel to its items
/// - [`YoutubeDiscovery`](discovery::YoutubeDiscovery): Scrapes YouTube channel pages
pub mod discovery;

/// Audio acquisition.
///
/// - [`Acquirer`](acquisition::Acquirer): Async trait producing a local audio file
/// - [`YtDlp`](acquisition::YtDlp): Runs the external yt-dlp program
pub mod acquisition;

/// Background discovery and acquisition loops.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Subscribe, unsubscribe and list content for users.
pub mod subscription;

#[cfg(test)]
pub(crate) mod testing;
