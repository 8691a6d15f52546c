pub mod config;
pub mod ytdlp;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::app::Result;

pub use config::AcquisitionConfig;
pub use ytdlp::YtDlp;

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub content_credit: String,
    /// Target audio format, e.g. `mp3`
    pub format: String,
    /// Replace an existing local file instead of reusing it
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct Download {
    pub finished: bool,
    pub local_path: PathBuf,
}

#[async_trait]
pub trait Acquirer {
    /// Produces a local audio file for one content item.
    async fn download(&self, request: &DownloadRequest) -> Result<Download>;
}
