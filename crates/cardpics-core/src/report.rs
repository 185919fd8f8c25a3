//! Run report types.
//!
//! UI-safe DTOs: Clone + Serialize with no infrastructure dependencies.
//! The engine crate persists these as a JSON artifact plus a Markdown
//! twin; neither is mutated after the run writes them.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::state::ErrorDetail;

/// Final counters written into a run report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub total: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub errors: u64,
    /// Human-readable elapsed time (e.g. "4m 12s").
    pub elapsed: String,
}

/// Summary persisted once after a run completes or is cancelled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Compact local timestamp, also used in the artifact filenames.
    pub timestamp: String,
    pub totals: RunTotals,
    pub errors: Vec<ErrorDetail>,
}

impl RunReport {
    /// Build a report stamped with the current local time.
    #[must_use]
    pub fn new(totals: RunTotals, errors: Vec<ErrorDetail>) -> Self {
        Self {
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            totals,
            errors,
        }
    }

    /// Render the Markdown twin of the JSON artifact.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Card Pics Download Report\n\n");
        let _ = writeln!(out, "- Timestamp: {}", self.timestamp);
        let _ = writeln!(out, "- Total: {}", self.totals.total);
        let _ = writeln!(out, "- Downloaded: {}", self.totals.downloaded);
        let _ = writeln!(out, "- Skipped: {}", self.totals.skipped);
        let _ = writeln!(out, "- Errors: {}", self.totals.errors);
        let _ = writeln!(out, "- Elapsed: {}", self.totals.elapsed);

        if !self.errors.is_empty() {
            out.push_str("\n## Errors\n\n");
            for detail in &self.errors {
                let _ = writeln!(
                    out,
                    "- ID: {} | {} | {}",
                    detail.image_id, detail.name, detail.error
                );
            }
        }
        out
    }
}

/// Locations of the two written report artifacts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}
