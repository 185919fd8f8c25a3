//! Run report persistence.

use std::fs;
use std::path::Path;

use cardpics_core::{DownloadError, ReportPaths, RunReport};

/// Write the JSON artifact and its Markdown twin into `reports_dir`,
/// creating the directory on demand. Filenames carry the report's
/// timestamp, so successive runs never clobber each other.
pub fn write_report(reports_dir: &Path, report: &RunReport) -> Result<ReportPaths, DownloadError> {
    fs::create_dir_all(reports_dir)?;

    let json_path = reports_dir.join(format!("card_pics_report_{}.json", report.timestamp));
    let markdown_path = reports_dir.join(format!("card_pics_report_{}.md", report.timestamp));

    let json = serde_json::to_string_pretty(report)
        .map_err(|err| DownloadError::other(format!("report serialization failed: {err}")))?;
    fs::write(&json_path, json)?;
    fs::write(&markdown_path, report.to_markdown())?;

    Ok(ReportPaths {
        json: json_path,
        markdown: markdown_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardpics_core::{ErrorDetail, RunTotals};

    fn sample_report() -> RunReport {
        RunReport {
            timestamp: "20260807_093000".to_string(),
            totals: RunTotals {
                total: 2,
                downloaded: 1,
                skipped: 0,
                errors: 1,
                elapsed: "12s".to_string(),
            },
            errors: vec![ErrorDetail {
                image_id: 9,
                name: "Nine".to_string(),
                url: "https://img.example/9.jpg".to_string(),
                error: "Network error: reset".to_string(),
            }],
        }
    }

    #[test]
    fn writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let reports_dir = dir.path().join("reports");

        let paths = write_report(&reports_dir, &sample_report()).unwrap();
        assert!(paths.json.exists());
        assert!(paths.markdown.exists());
        assert!(
            paths
                .json
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .contains("20260807_093000")
        );
    }

    #[test]
    fn json_artifact_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();

        let paths = write_report(dir.path(), &report).unwrap();
        let raw = fs::read_to_string(paths.json).unwrap();
        let parsed: RunReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn markdown_artifact_lists_failures() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_report(dir.path(), &sample_report()).unwrap();
        let markdown = fs::read_to_string(paths.markdown).unwrap();
        assert!(markdown.contains("ID: 9 | Nine | Network error: reset"));
    }
}
