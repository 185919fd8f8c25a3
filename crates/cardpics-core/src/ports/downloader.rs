//! Control-plane port for the download engine.
//!
//! This is the narrow interface external control-planes (web UI, CLI)
//! drive. Implementations handle queuing, progress tracking, and
//! cancellation internally; nothing infrastructure-specific leaks
//! through the signatures.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RunOptions;
use crate::error::DownloadError;
use crate::state::StatusSnapshot;

/// Dry-run counts for a set of options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    /// Catalog entries after the type/set filters.
    pub total_cards: u64,
    /// Tasks derived from those entries.
    pub total_tasks: u64,
    /// Tasks remaining after the existing-file filter.
    pub to_download: u64,
}

/// Narrow interface the external control-plane drives.
///
/// `start` takes `self: Arc<Self>` so implementations can clone the Arc
/// into a background task; this is object-safe and works with
/// `Arc<dyn PicsDownloaderPort>`.
#[async_trait]
pub trait PicsDownloaderPort: Send + Sync {
    /// Begin a run with the given options.
    ///
    /// Returns immediately once the run is launched; progress is
    /// observed through [`Self::status`]. Fails with `AlreadyRunning`
    /// (and no state change) while a run is active.
    async fn start(self: Arc<Self>, options: RunOptions) -> Result<(), DownloadError>;

    /// Count the work a run with these options would perform, without
    /// downloading anything.
    async fn preview(&self, options: RunOptions) -> Result<PreviewSummary, DownloadError>;

    /// Suspend chunk reads until [`Self::resume`]. Does not cancel
    /// in-flight retries, only delays the next read.
    fn pause(&self);

    /// Clear the pause flag and wake blocked workers.
    fn resume(&self);

    /// Request cooperative cancellation; the run drains to finished.
    fn cancel(&self);

    /// Point-in-time state for polling.
    fn status(&self) -> StatusSnapshot;
}
