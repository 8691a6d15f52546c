pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "listen-tube")]
#[command(about = "Subscribe to YouTube channels and keep their audio downloaded", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/listen-tube/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Subscribe a user to a channel
    Subscribe {
        /// User credit
        user: String,
        /// Channel id, @handle or channel URL
        channel: String,
    },
    /// Remove a user's subscription
    Unsubscribe {
        /// User credit
        user: String,
        /// Channel credit as given when subscribing
        channel: String,
    },
    /// List a user's subscriptions
    Subscriptions {
        /// User credit
        user: String,
    },
    /// List content of a user's subscribed channels, newest first
    Contents {
        /// User credit
        user: String,
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Items per page
        #[arg(short, long, default_value_t = 20)]
        size: usize,
    },
    /// Show one content item
    Content {
        /// Content credit (video id)
        credit: String,
    },
    /// Show one channel
    Channel {
        /// Channel credit
        credit: String,
    },
    /// Run the discovery and download loops until interrupted
    Run,
    /// Run a single discovery pass
    Discover,
    /// Download the next pending item
    Download,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user and print its credit
    Add {
        /// Display name
        name: String,
    },
    /// List registered users
    List,
}
