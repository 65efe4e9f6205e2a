//! Blocking download client with retry and an idempotent cache directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::AcquisitionError;

/// Configuration for the download client.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry).
    pub initial_retry_delay: Duration,
    /// Maximum retry delay.
    pub max_retry_delay: Duration,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// Directory holding completed downloads.
    pub cache_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(120),
            request_timeout: Duration::from_secs(600),
            cache_dir: PathBuf::from("input"),
        }
    }
}

/// Downloads provider files into the cache directory.
///
/// A file already present in the cache is never re-fetched; acquisitions are
/// long-running and the cache path doubles as the idempotency key.
pub struct DownloadClient {
    client: Client,
    config: DownloadConfig,
}

impl DownloadClient {
    /// Create a new client with the given configuration.
    pub fn new(config: DownloadConfig) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AcquisitionError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The cache path a download with this filename resolves to.
    pub fn cache_path(&self, filename: &str) -> PathBuf {
        self.config.cache_dir.join(filename)
    }

    /// Fetch `url` into the cache under `filename`, skipping existing files.
    ///
    /// Returns the path to the completed file. The body is written to a
    /// `.partial` sibling and renamed on completion, so a cached file is
    /// always whole.
    pub fn download(&self, url: &str, filename: &str) -> Result<PathBuf, AcquisitionError> {
        std::fs::create_dir_all(&self.config.cache_dir)?;

        let final_path = self.cache_path(filename);
        if final_path.exists() {
            info!(path = %final_path.display(), "download file already exists, skipping");
            return Ok(final_path);
        }

        let temp_path = self.config.cache_dir.join(format!("{}.partial", filename));

        let mut retry_count = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            match self.fetch_to_file(url, &temp_path) {
                Ok(()) => {
                    std::fs::rename(&temp_path, &final_path)?;
                    info!(url = %url, path = %final_path.display(), "download completed");
                    return Ok(final_path);
                }
                // auth and missing-resource conditions are terminal
                Err(err @ (AcquisitionError::Auth(_) | AcquisitionError::MissingFile(_))) => {
                    let _ = std::fs::remove_file(&temp_path);
                    return Err(err);
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        let _ = std::fs::remove_file(&temp_path);
                        return Err(AcquisitionError::Network(format!(
                            "download failed after {} retries: {}",
                            retry_count, e
                        )));
                    }

                    warn!(
                        error = %e,
                        retry = retry_count,
                        delay_secs = delay.as_secs(),
                        "download failed, retrying"
                    );
                    std::thread::sleep(delay);
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
            }
        }
    }

    fn fetch_to_file(&self, url: &str, path: &Path) -> Result<(), AcquisitionError> {
        debug!(url = %url, "fetching");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AcquisitionError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AcquisitionError::Auth(format!(
                    "{} returned {}",
                    url,
                    response.status()
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(AcquisitionError::MissingFile(PathBuf::from(url)));
            }
            status => {
                return Err(AcquisitionError::Network(format!(
                    "{} returned {}",
                    url, status
                )));
            }
        }

        let mut file = std::fs::File::create(path)?;
        response
            .copy_to(&mut file)
            .map_err(|e| AcquisitionError::Network(e.to_string()))?;
        Ok(())
    }
}
