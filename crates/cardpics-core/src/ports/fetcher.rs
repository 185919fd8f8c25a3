//! Image fetcher port.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DownloadError;
use crate::state::RunState;

/// Retry/timeout/throttle policy for a single image download.
#[derive(Clone, Debug)]
pub struct FetchPolicy {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempts before giving up (numbered 1..=max_retries).
    pub max_retries: u32,
    /// Throughput cap in KB/s per download; 0 = unlimited.
    pub rate_limit_kbps: u32,
}

/// Cooperative signals a fetch must honor at its checkpoints.
///
/// Cloned once per worker; the token and state are shared handles, so
/// every clone observes the same cancel/pause flags.
#[derive(Clone)]
pub struct RunSignals {
    cancel: CancellationToken,
    state: Arc<RunState>,
}

impl RunSignals {
    /// Capture the signals of the given state's current run.
    #[must_use]
    pub fn for_run(state: &Arc<RunState>) -> Self {
        Self {
            cancel: state.cancel_token(),
            state: Arc::clone(state),
        }
    }

    /// The run's cancellation token, for `select!`-style racing.
    #[must_use]
    pub const fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait out a pause, failing fast with `Cancelled` if cancellation
    /// arrives in the meantime.
    pub async fn pause_point(&self) -> Result<(), DownloadError> {
        self.state.wait_while_paused(&self.cancel).await
    }
}

/// Port for downloading a single image to disk.
///
/// Implementations write to a temporary sibling of the destination and
/// rename atomically on success, so a reader never observes a partial
/// file at the final path, and never leave the temporary behind on any
/// exit path.
#[async_trait]
pub trait ImageFetcherPort: Send + Sync {
    /// Download `url` into `dest`, honoring `policy` and `signals`.
    async fn fetch_image(
        &self,
        url: &str,
        dest: &Path,
        policy: &FetchPolicy,
        signals: &RunSignals,
    ) -> Result<(), DownloadError>;
}
