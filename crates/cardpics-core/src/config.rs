//! Run configuration.
//!
//! Control-planes submit loosely-typed [`RunOptions`]; the engine
//! validates them exactly once at its boundary into a typed
//! [`RunConfig`] with all limits applied. Nothing downstream ever
//! re-checks ranges.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default catalog endpoint.
pub const DEFAULT_API_URL: &str = "https://db.ygoprodeck.com/api/v7/cardinfo.php";

/// Default directory for run report artifacts.
pub const DEFAULT_REPORTS_DIR: &str = "./reports";

/// Parallel download bounds. The ceiling is a courtesy limit toward the
/// image host; high parallelism risks throttling or bans.
pub const CONCURRENCY_RANGE: (i64, i64) = (1, 50);
/// Per-request timeout bounds, in seconds.
pub const TIMEOUT_RANGE: (i64, i64) = (10, 120);
/// Retry attempt bounds per task.
pub const RETRY_RANGE: (i64, i64) = (1, 10);

const DEFAULT_CONCURRENCY: i64 = 12;
const DEFAULT_TIMEOUT_SECS: i64 = 30;
const DEFAULT_RETRIES: i64 = 3;

/// Unvalidated options for one run, as submitted by a control-plane.
///
/// Numeric fields are optional signed integers so absent, out-of-range,
/// and negative inputs can all be normalized in one place.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Output directory; must resolve to a `pics` folder (or a folder
    /// containing one).
    pub pics_dir: PathBuf,
    /// Re-download files that already exist.
    pub force: bool,
    /// Pre-drop tasks whose output already exists.
    pub only_missing: bool,
    /// Integrity-check existing files before trusting them.
    pub validate_existing: bool,
    /// Parallel downloads.
    pub concurrency: Option<i64>,
    /// Per-request timeout, seconds.
    pub timeout: Option<i64>,
    /// Retry attempts per task.
    pub retry: Option<i64>,
    /// Per-download throughput cap in KB/s; 0 = unlimited.
    pub max_kbps: Option<i64>,
    /// Substring filter on the card type line.
    pub type_filter: String,
    /// Substring filter on set names/codes.
    pub set_filter: String,
    /// Catalog endpoint override.
    pub api_url: Option<String>,
    /// Report artifact directory override.
    pub reports_dir: Option<PathBuf>,
}

/// Validated configuration for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub pics_dir: PathBuf,
    pub force: bool,
    pub only_missing: bool,
    pub validate_existing: bool,
    pub concurrency: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub rate_limit_kbps: u32,
    pub type_filter: String,
    pub set_filter: String,
    pub api_url: String,
    pub reports_dir: PathBuf,
}

impl RunConfig {
    /// Normalize options into a validated config.
    ///
    /// Clamps concurrency to 1..=50 (default 12), timeout to 10..=120 s
    /// (default 30), retries to 1..=10 (default 3); negative rate limits
    /// become 0 (unlimited). `force` switches `only_missing` off: a
    /// forced run re-downloads everything.
    #[must_use]
    pub fn from_options(options: RunOptions) -> Self {
        let concurrency = clamp_or(options.concurrency, DEFAULT_CONCURRENCY, CONCURRENCY_RANGE);
        let timeout = clamp_or(options.timeout, DEFAULT_TIMEOUT_SECS, TIMEOUT_RANGE);
        let retries = clamp_or(options.retry, DEFAULT_RETRIES, RETRY_RANGE);
        let rate_limit = options
            .max_kbps
            .unwrap_or(0)
            .clamp(0, i64::from(u32::MAX));

        Self {
            pics_dir: options.pics_dir,
            force: options.force,
            only_missing: options.only_missing && !options.force,
            validate_existing: options.validate_existing,
            concurrency: to_u32(concurrency),
            timeout_secs: to_u64(timeout),
            max_retries: to_u32(retries),
            rate_limit_kbps: to_u32(rate_limit),
            type_filter: options.type_filter,
            set_filter: options.set_filter,
            api_url: options
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            reports_dir: options
                .reports_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
        }
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl From<RunOptions> for RunConfig {
    fn from(options: RunOptions) -> Self {
        Self::from_options(options)
    }
}

fn clamp_or(value: Option<i64>, default: i64, (min, max): (i64, i64)) -> i64 {
    value.unwrap_or(default).clamp(min, max)
}

/// Lossless after clamping; falls back to 0 only if a clamp bound were
/// ever widened past `u32`.
fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
