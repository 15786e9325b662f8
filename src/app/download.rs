//! Download manager for generated map assets
//!
//! For every complete request the current status is fetched again so that
//! asset URLs are fresh, then the map file and its three images are written
//! into a version-stamped directory next to a JSON record of their URLs.
//! Any asset that cannot be fetched after retries aborts the whole batch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use crate::app::client::{MapsApi, StatusData};
use crate::app::models::{MapRequest, Status};
use crate::constants::{files, limits};
use crate::errors::{DownloadError, DownloadResult};

/// Retry policy of single-file downloads
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Attempts made after the first one fails
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: limits::DOWNLOAD_MAX_RETRIES,
            base_delay: limits::DOWNLOAD_BASE_DELAY,
        }
    }
}

impl DownloadConfig {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// URLs of the four assets of one map, written next to the downloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLinks {
    pub map_url: String,
    pub image_url: String,
    pub image_icon_url: String,
    pub thumbnail_url: String,
}

impl From<&StatusData> for DownloadLinks {
    fn from(data: &StatusData) -> Self {
        Self {
            map_url: data.download_url.clone(),
            image_url: data.image_url.clone(),
            image_icon_url: data.image_icon_url.clone(),
            thumbnail_url: data.thumbnail_url.clone(),
        }
    }
}

/// A map whose assets were written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMap {
    pub prefix: String,
    pub files: Vec<PathBuf>,
}

/// A complete map the service would not hand out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMap {
    pub request: String,
    /// Command that opens the map in a browser instead
    pub hint: String,
}

/// Result of a download batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Directory receiving this batch
    pub directory: PathBuf,
    pub downloaded: Vec<DownloadedMap>,
    pub skipped: Vec<SkippedMap>,
}

/// Why a single attempt failed
enum AttemptError {
    /// The target file could not be created; retrying will not help
    Fatal(DownloadError),
    Retryable(DownloadError),
}

/// Downloads map assets into a downloads directory
#[derive(Debug, Clone)]
pub struct DownloadManager {
    http: Client,
    config: DownloadConfig,
    downloads_dir: PathBuf,
}

impl DownloadManager {
    pub fn new(http: Client, config: DownloadConfig, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            config,
            downloads_dir: downloads_dir.into(),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Download the assets of every complete request into `<downloads>/<version>`
    ///
    /// # Errors
    ///
    /// Returns `NoRequests` for an empty batch. Otherwise stops at the first
    /// status lookup, file operation or download that fails.
    pub async fn download_all(
        &self,
        api: &dyn MapsApi,
        requests: &[MapRequest],
        version: &str,
    ) -> DownloadResult<DownloadReport> {
        if requests.is_empty() {
            warn!("No maps loaded");
            return Err(DownloadError::NoRequests);
        }

        let directory = self.downloads_dir.join(version);
        let mut report = DownloadReport {
            directory: directory.clone(),
            ..Default::default()
        };

        for request in requests.iter().filter(|r| r.status == Status::Complete) {
            let status = api.fetch_status(request).await.map_err(|e| {
                error!(seed = %request.seed, "Error downloading map: {}", e);
                e
            })?;

            let data = match status.data {
                Some(data) if data.can_download => data,
                _ => {
                    warn!(seed = %request.seed, size = request.size, "Cannot download map");
                    report.skipped.push(SkippedMap {
                        request: request.to_string(),
                        hint: open_hint(request),
                    });
                    continue;
                }
            };

            tokio::fs::create_dir_all(&directory)
                .await
                .map_err(|source| DownloadError::Io {
                    path: directory.clone(),
                    source,
                })?;

            report
                .downloaded
                .push(self.download_map(request, &data, &directory).await?);
        }

        Ok(report)
    }

    async fn download_map(
        &self,
        request: &MapRequest,
        data: &StatusData,
        directory: &Path,
    ) -> DownloadResult<DownloadedMap> {
        let prefix = request.download_prefix();
        let links = DownloadLinks::from(data);
        info!(seed = %request.seed, map_id = %request.map_id, "Downloading assets");

        let links_target = directory.join(format!("{}_download_links.json", prefix));
        let content = serde_json::to_string_pretty(&links)?;
        tokio::fs::write(&links_target, content)
            .await
            .map_err(|source| DownloadError::Io {
                path: links_target.clone(),
                source,
            })?;

        let assets = [
            (&links.map_url, format!("{}.map", prefix)),
            (&links.image_url, format!("{}.png", prefix)),
            (&links.image_icon_url, format!("{}_icons.png", prefix)),
            (&links.thumbnail_url, format!("{}_thumbnail.png", prefix)),
        ];

        let mut written = vec![links_target];
        for (url, name) in assets {
            let target = directory.join(name);
            self.download_file(url, &target).await?;
            written.push(target);
        }

        Ok(DownloadedMap {
            prefix,
            files: written,
        })
    }

    /// Download `url` to `target` with retries
    ///
    /// The body is written to a temporary sibling that is renamed into place
    /// once complete. Network failures, non-200 responses and write failures
    /// are retried; failing to create the file is returned at once.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created or renamed, or
    /// `MaxRetriesExceeded` once every attempt has failed
    pub async fn download_file(&self, url: &str, target: &Path) -> DownloadResult<()> {
        let temp_path = temp_path_for(target);
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.delay_for(attempt);
                info!(
                    "Retrying download of {} (attempt {}/{}) in {}ms",
                    url,
                    attempt,
                    self.config.max_retries,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.download_attempt(url, &temp_path).await {
                Ok(()) => {
                    tokio::fs::rename(&temp_path, target)
                        .await
                        .map_err(|source| DownloadError::Io {
                            path: target.to_path_buf(),
                            source,
                        })?;
                    info!(
                        "File downloaded successfully: {} ({} attempts)",
                        target.display(),
                        attempt + 1
                    );
                    return Ok(());
                }
                Err(AttemptError::Fatal(e)) => {
                    error!("Error creating file {}: {}", temp_path.display(), e);
                    return Err(e);
                }
                Err(AttemptError::Retryable(e)) => {
                    error!("Error downloading file {} (attempt {}): {}", url, attempt, e);
                    last_error = e.to_string();
                }
            }
        }

        if temp_path.exists() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }

        Err(DownloadError::MaxRetriesExceeded {
            url: url.to_string(),
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }

    async fn download_attempt(&self, url: &str, temp_path: &Path) -> Result<(), AttemptError> {
        let retryable = |e: DownloadError| AttemptError::Retryable(e);
        let write_error = |source: std::io::Error| {
            AttemptError::Retryable(DownloadError::Io {
                path: temp_path.to_path_buf(),
                source,
            })
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| retryable(e.into()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(retryable(DownloadError::ServerError {
                status: response.status().as_u16(),
            }));
        }

        let mut file = File::create(temp_path).await.map_err(|source| {
            AttemptError::Fatal(DownloadError::Io {
                path: temp_path.to_path_buf(),
                source,
            })
        })?;

        while let Some(chunk) = response.chunk().await.map_err(|e| retryable(e.into()))? {
            file.write_all(&chunk).await.map_err(write_error)?;
        }
        file.flush().await.map_err(write_error)?;

        Ok(())
    }
}

/// Sibling of `target` used while its content is being written
fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    target.with_file_name(name)
}

/// The `open` invocation that shows a map which cannot be downloaded
pub fn open_hint(request: &MapRequest) -> String {
    let staging = if request.staging { " -b" } else { "" };
    format!(
        "rustmaps open -s '{}' -z {} -S '{}'{}",
        request.seed, request.size, request.saved_config, staging
    )
}

/// Name of a download batch directory: the local time, to the second
pub fn version_stamp() -> String {
    chrono::Local::now().format(files::VERSION_FORMAT).to_string()
}
