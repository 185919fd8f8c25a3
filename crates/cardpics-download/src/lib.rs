//! Concurrent card-image download engine.
//!
//! Implements the ports defined in `cardpics-core`:
//!
//! - `client` - HTTP catalog client
//! - `fetcher` - single-image fetch with retry, backoff, and throttling
//! - `coordinator` - bounded worker pool over the derived task list
//! - `existing` - existing-file filtering
//! - `validate` - structural JPEG integrity checks
//! - `throttle` - per-download throughput limiting
//! - `report` - run report persistence

pub mod client;
pub mod coordinator;
pub mod existing;
pub mod fetcher;
pub mod report;
pub mod throttle;
pub mod validate;

pub use client::HttpCatalogClient;
pub use coordinator::{Downloader, DownloaderDeps};
pub use existing::filter_existing;
pub use fetcher::HttpImageFetcher;
pub use report::write_report;
pub use throttle::RateLimiter;
pub use validate::{MIN_IMAGE_BYTES, is_valid_jpeg};

// Re-export core types for convenience
pub use cardpics_core::{
    DownloadError, DownloadTask, PicsDownloaderPort, PreviewSummary, RunConfig, RunOptions,
    StatusSnapshot, Subfolder,
};
