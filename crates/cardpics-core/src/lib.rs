//! Core domain types and port definitions for cardpics.
//!
//! This crate is the pure center of the workspace: catalog and task
//! types, the validated run configuration, the shared run state, the
//! error taxonomy, and the port traits the engine and adapters plug
//! into. No network I/O happens here - the HTTP engine lives in
//! `cardpics-download`, adapters in `cardpics-cli`.

pub mod catalog;
pub mod config;
pub mod error;
pub mod paths;
pub mod ports;
pub mod report;
pub mod state;
pub mod task;
pub mod util;

// Re-export commonly used types for convenience
pub use catalog::{Card, CardImage, CardSet, CatalogResponse};
pub use config::{DEFAULT_API_URL, DEFAULT_REPORTS_DIR, RunConfig, RunOptions};
pub use error::{DownloadError, DownloadResult};
pub use paths::{PicsDirResolution, PicsDirSource, resolve_pics_dir};
pub use ports::{
    CatalogPort, FetchPolicy, ImageFetcherPort, PicsDownloaderPort, PreviewSummary, RunSignals,
};
pub use report::{ReportPaths, RunReport, RunTotals};
pub use state::{ErrorDetail, LogEntry, LogLevel, RunState, StatusSnapshot};
pub use task::{DownloadTask, Subfolder, build_tasks, filter_cards};
pub use util::format_elapsed;
