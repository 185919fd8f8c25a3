//! Fetch-with-retry for a single image.
//!
//! The fetcher streams into a temporary sibling of the destination
//! (`<dest>.part`) and renames atomically on success, so a reader never
//! observes a partial file at the final path. The temporary is removed
//! on every failure and cancellation path.
//!
//! Cancellation is cooperative: the token is checked before each
//! attempt, raced against the backoff sleep, and checked at every chunk
//! boundary, where the pause gate is awaited too.
//!
//! Duplicate image ids in the catalog would make two workers share one
//! temporary path; the source data does not produce them and the engine
//! does not guard against it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use cardpics_core::{DownloadError, FetchPolicy, ImageFetcherPort, RunSignals};

use crate::client::USER_AGENT;
use crate::throttle::RateLimiter;
use crate::validate::is_valid_jpeg;

/// Suffix of the temporary sibling written during streaming.
const PART_SUFFIX: &str = ".part";

/// [`ImageFetcherPort`] implementation over HTTP.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// One download attempt: request, stream, validate, rename.
    async fn attempt(
        &self,
        url: &str,
        dest: &Path,
        temp: &Path,
        policy: &FetchPolicy,
        signals: &RunSignals,
    ) -> Result<(), DownloadError> {
        let request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "image/jpeg");

        let response = tokio::time::timeout(policy.timeout, request.send())
            .await
            .map_err(|_| DownloadError::timeout(policy.timeout.as_secs()))?
            .map_err(|err| map_request_error(&err, policy.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network_with_status(
                format!("HTTP {status}"),
                status.as_u16(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        if !content_type.starts_with("image/jpeg") {
            return Err(DownloadError::unsupported_content_type(content_type));
        }

        let mut file = fs::File::create(temp)?;
        let mut limiter = RateLimiter::new(policy.rate_limit_kbps);
        let mut stream = response.bytes_stream();

        loop {
            if signals.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            signals.pause_point().await?;

            // Each read is individually bounded by the per-task timeout.
            let chunk = match tokio::time::timeout(policy.timeout, stream.next()).await {
                Ok(Some(chunk)) => chunk.map_err(|err| map_request_error(&err, policy.timeout))?,
                Ok(None) => break,
                Err(_) => return Err(DownloadError::timeout(policy.timeout.as_secs())),
            };

            file.write_all(&chunk)?;
            limiter.throttle(chunk.len()).await;
        }
        file.flush()?;
        drop(file);

        if !is_valid_jpeg(temp) {
            return Err(DownloadError::corrupt(temp.display().to_string()));
        }

        fs::rename(temp, dest)?;
        Ok(())
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcherPort for HttpImageFetcher {
    async fn fetch_image(
        &self,
        url: &str,
        dest: &Path,
        policy: &FetchPolicy,
        signals: &RunSignals,
    ) -> Result<(), DownloadError> {
        let temp = part_path(dest);

        for attempt in 1..=policy.max_retries {
            if signals.is_cancelled() {
                remove_temp(&temp);
                return Err(DownloadError::Cancelled);
            }

            match self.attempt(url, dest, &temp, policy, signals).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_cancelled() => {
                    remove_temp(&temp);
                    return Err(DownloadError::Cancelled);
                }
                Err(err) if attempt == policy.max_retries => {
                    remove_temp(&temp);
                    return Err(DownloadError::retries_exhausted(policy.max_retries, &err));
                }
                Err(err) => {
                    debug!(url, attempt, %err, "download attempt failed, backing off");
                    remove_temp(&temp);
                    tokio::select! {
                        () = tokio::time::sleep(backoff_delay(attempt)) => {}
                        () = signals.cancel().cancelled() => return Err(DownloadError::Cancelled),
                    }
                }
            }
        }

        // Unreachable while config validation keeps max_retries >= 1
        Err(DownloadError::retries_exhausted(
            policy.max_retries,
            &DownloadError::other("no attempts made"),
        ))
    }
}

/// Temporary sibling path for `dest`.
fn part_path(dest: &Path) -> PathBuf {
    let mut path = dest.as_os_str().to_owned();
    path.push(PART_SUFFIX);
    PathBuf::from(path)
}

/// Exponential backoff before the next attempt: 1s, 2s, 4s, ...
const fn backoff_delay(failed_attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(failed_attempt - 1))
}

fn map_request_error(err: &reqwest::Error, timeout: Duration) -> DownloadError {
    if err.is_timeout() {
        DownloadError::timeout(timeout.as_secs())
    } else if let Some(status) = err.status() {
        DownloadError::network_with_status(err.to_string(), status.as_u16())
    } else {
        DownloadError::network(err.to_string())
    }
}

/// Best-effort removal of the temporary file.
fn remove_temp(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), %err, "failed to remove temp file");
        }
    }
}
