//! Live progress rendering.
//!
//! The engine's contract with control-planes is status polling, so the
//! CLI polls too: an indicatif bar tracks the counters, and the trailing
//! log lines (summary block included) are printed once the run finishes.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use cardpics_core::{PicsDownloaderPort, StatusSnapshot};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll `downloader` until the run finishes. Returns the final snapshot.
pub async fn watch(downloader: &dyn PicsDownloaderPort) -> StatusSnapshot {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap()
            .progress_chars("=>-"),
    );

    loop {
        let snapshot = downloader.status();
        let done = snapshot.processed + snapshot.skipped + snapshot.errors;

        bar.set_length(snapshot.total);
        bar.set_position(done);
        bar.set_message(if snapshot.paused {
            "paused".to_string()
        } else {
            format!(
                "ok {} skip {} err {}",
                snapshot.processed, snapshot.skipped, snapshot.errors
            )
        });

        if snapshot.finished {
            bar.finish_and_clear();
            for entry in &snapshot.logs {
                println!("{}", entry.message);
            }
            return snapshot;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
