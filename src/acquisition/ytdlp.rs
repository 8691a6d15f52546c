use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::acquisition::{Acquirer, AcquisitionConfig, Download, DownloadRequest};
use crate::app::{ListenError, Result};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const STDERR_TAIL_LINES: usize = 5;

/// Downloads audio tracks by running the external `yt-dlp` program.
///
/// Files land in `<base_path>/<content credit>/audio.<format>`.
pub struct YtDlp {
    binary: PathBuf,
    base_path: PathBuf,
    binary_url: Option<String>,
}

impl YtDlp {
    pub fn new(binary: PathBuf, base_path: PathBuf) -> Self {
        Self {
            binary,
            base_path,
            binary_url: None,
        }
    }

    pub fn from_config(config: &AcquisitionConfig, base_path: PathBuf) -> Self {
        Self {
            binary: config.binary.clone(),
            base_path,
            binary_url: config
                .binary_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    /// Checks that yt-dlp runs, fetching it from `binary_url` if it does not,
    /// and creates the media directory. Returns the reported version.
    pub async fn prepare(&mut self) -> Result<String> {
        let version = match Self::version(&self.binary).await {
            Ok(version) => version,
            Err(e) => {
                let Some(url) = self.binary_url.clone() else {
                    return Err(e);
                };
                info!("yt-dlp binary not usable ({}), downloading from {}", e, url);
                self.binary = self.fetch_binary(&url).await?;
                Self::version(&self.binary).await?
            }
        };

        tokio::fs::create_dir_all(&self.base_path).await?;
        info!(
            "yt-dlp version: {}, path: {}",
            version,
            self.binary.display()
        );
        Ok(version)
    }

    async fn version(binary: &Path) -> Result<String> {
        let output = Command::new(binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                ListenError::Acquisition(format!("failed to run {}: {}", binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(ListenError::Acquisition(format!(
                "{} --version exited with {}",
                binary.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn fetch_binary(&self, url: &str) -> Result<PathBuf> {
        let target = self.base_path.join(".bin").join("yt-dlp");
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = reqwest::get(url).await?;
        response.error_for_status_ref()?;
        let body = response.bytes().await?;
        tokio::fs::write(&target, &body).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755)).await?;
        }

        Ok(target)
    }

    pub fn item_dir(&self, content_credit: &str) -> PathBuf {
        self.base_path.join(content_credit)
    }

    pub fn output_path(&self, content_credit: &str, format: &str) -> PathBuf {
        self.item_dir(content_credit).join(format!("audio.{}", format))
    }

    fn args(&self, request: &DownloadRequest) -> Vec<String> {
        let template = self.item_dir(&request.content_credit).join("audio.%(ext)s");
        vec![
            "--newline".to_string(),
            "-f".to_string(),
            "worstaudio".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            request.format.clone(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            format!("{}{}", WATCH_URL, request.content_credit),
        ]
    }
}

#[async_trait]
impl Acquirer for YtDlp {
    async fn download(&self, request: &DownloadRequest) -> Result<Download> {
        let credit = request.content_credit.trim();
        if credit.is_empty() || credit.contains('/') || credit.contains("..") {
            return Err(ListenError::InvalidInput(format!(
                "invalid content credit: {:?}",
                request.content_credit
            )));
        }

        let dir = self.item_dir(credit);
        let output = self.output_path(credit, &request.format);

        if request.force {
            if dir.exists() {
                tokio::fs::remove_dir_all(&dir).await?;
            }
        } else if output.exists() {
            debug!(content = %credit, "already downloaded, reusing {}", output.display());
            return Ok(Download {
                finished: true,
                local_path: output,
            });
        }
        tokio::fs::create_dir_all(&dir).await?;

        let mut child = Command::new(&self.binary)
            .args(self.args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ListenError::Acquisition(format!("failed to run {}: {}", self.binary.display(), e))
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let follow_stdout = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(progress) = parse_progress(&line) {
                    debug!(content = %credit, progress, "downloading");
                } else if !line.trim().is_empty() {
                    debug!(content = %credit, "{}", line.trim());
                }
            }
        };

        let collect_stderr = async {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let Some(stderr) = stderr else { return tail };
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.trim().to_string());
            }
            tail
        };

        let ((), tail, status) = tokio::join!(follow_stdout, collect_stderr, child.wait());
        let status = status?;

        if !status.success() {
            let detail = tail.into_iter().collect::<Vec<_>>().join(" | ");
            warn!(content = %credit, "yt-dlp exited with {}", status);
            return Err(ListenError::Acquisition(format!(
                "yt-dlp exited with {}: {}",
                status, detail
            )));
        }

        if !output.exists() {
            return Err(ListenError::Acquisition(format!(
                "yt-dlp finished but {} is missing",
                output.display()
            )));
        }

        debug!(content = %credit, "downloaded to {}", output.display());
        Ok(Download {
            finished: true,
            local_path: output,
        })
    }
}

/// Extracts the percentage from lines like `[download]  42.5% of 3.10MiB at ...`.
pub fn parse_progress(line: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix("[download]")?;
    let (number, _) = rest.trim_start().split_once('%')?;
    number.trim().parse().ok()
}
