//! Catalog source port.

use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::Card;
use crate::error::DownloadError;

/// Port for fetching the remote card catalog.
///
/// One implementation speaks HTTP; coordinator tests substitute a mock.
/// There is no retry at this layer - a failed catalog fetch is fatal to
/// the run, and retry policy belongs to whoever drives the engine.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Fetch and decode the full catalog from `url`.
    ///
    /// Fails with [`DownloadError::CatalogFetch`] on network failure,
    /// non-2xx status, or a malformed/empty payload.
    async fn fetch_catalog(&self, url: &str, timeout: Duration)
    -> Result<Vec<Card>, DownloadError>;
}
