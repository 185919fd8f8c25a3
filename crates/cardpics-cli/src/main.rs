//! CLI entry point - the composition root.
//!
//! Wires the HTTP adapters into the download engine and drives it from
//! the command line over the same port a web control-plane would use.
//! The first Ctrl+C requests cooperative cancellation; the run then
//! drains to finished.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use cardpics_core::{PicsDownloaderPort, RunOptions};
use cardpics_download::{Downloader, DownloaderDeps, HttpCatalogClient, HttpImageFetcher};

mod progress;

/// Bulk card-image downloader for EDOPro-style pics folders.
#[derive(Debug, Parser)]
#[command(name = "cardpics", version, about)]
struct Cli {
    /// The pics directory (or a directory containing one)
    #[arg(long)]
    pics_dir: PathBuf,

    /// Re-download files that already exist
    #[arg(long)]
    force: bool,

    /// Pre-drop tasks whose output already exists
    #[arg(long)]
    only_missing: bool,

    /// Integrity-check existing files before trusting them
    #[arg(long)]
    validate_existing: bool,

    /// Parallel downloads (clamped to 1-50)
    #[arg(long)]
    concurrency: Option<i64>,

    /// Per-request timeout in seconds (clamped to 10-120)
    #[arg(long)]
    timeout: Option<i64>,

    /// Retry attempts per image (clamped to 1-10)
    #[arg(long)]
    retry: Option<i64>,

    /// Throughput cap per download in KB/s (0 = unlimited)
    #[arg(long)]
    max_kbps: Option<i64>,

    /// Substring filter on the card type line (e.g. "Spell")
    #[arg(long, default_value = "")]
    type_filter: String,

    /// Substring filter on set names/codes (e.g. "LOB")
    #[arg(long, default_value = "")]
    set_filter: String,

    /// Catalog endpoint override
    #[arg(long)]
    api_url: Option<String>,

    /// Directory for run report artifacts
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Count the work without downloading anything
    #[arg(long)]
    preview: bool,
}

impl Cli {
    fn into_options(self) -> RunOptions {
        RunOptions {
            pics_dir: self.pics_dir,
            force: self.force,
            only_missing: self.only_missing,
            validate_existing: self.validate_existing,
            concurrency: self.concurrency,
            timeout: self.timeout,
            retry: self.retry,
            max_kbps: self.max_kbps,
            type_filter: self.type_filter,
            set_filter: self.set_filter,
            api_url: self.api_url,
            reports_dir: self.reports_dir,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let preview = cli.preview;
    let options = cli.into_options();

    // Composition root: HTTP adapters into the engine
    let downloader = Arc::new(Downloader::new(DownloaderDeps {
        catalog: Arc::new(HttpCatalogClient::new()),
        fetcher: Arc::new(HttpImageFetcher::new()),
    }));

    if preview {
        let summary = downloader
            .preview(options)
            .await
            .context("preview failed")?;
        println!("Cards:       {}", summary.total_cards);
        println!("Tasks:       {}", summary.total_tasks);
        println!("To download: {}", summary.to_download);
        return Ok(());
    }

    Arc::clone(&downloader)
        .start(options)
        .await
        .context("failed to start download run")?;

    {
        let downloader = Arc::clone(&downloader);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!();
                eprintln!("Cancelling; in-flight downloads will drain...");
                downloader.cancel();
            }
        });
    }

    let summary = progress::watch(downloader.as_ref()).await;

    if let Some(api_error) = summary.api_error {
        anyhow::bail!("API error: {api_error}");
    }
    if summary.total > 0 && summary.errors == summary.total {
        anyhow::bail!("every download failed; see the run report");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["cardpics", "--pics-dir", "/tmp/pics"]).unwrap();
        assert_eq!(cli.pics_dir, PathBuf::from("/tmp/pics"));
        assert!(!cli.force);
        assert_eq!(cli.concurrency, None);
    }

    #[test]
    fn parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "cardpics",
            "--pics-dir",
            "/tmp/pics",
            "--force",
            "--validate-existing",
            "--concurrency",
            "8",
            "--max-kbps",
            "512",
            "--type-filter",
            "Spell",
            "--set-filter",
            "LOB",
        ])
        .unwrap();

        let options = cli.into_options();
        assert!(options.force);
        assert!(options.validate_existing);
        assert_eq!(options.concurrency, Some(8));
        assert_eq!(options.max_kbps, Some(512));
        assert_eq!(options.type_filter, "Spell");
        assert_eq!(options.set_filter, "LOB");
    }

    #[test]
    fn pics_dir_is_required() {
        assert!(Cli::try_parse_from(["cardpics"]).is_err());
    }
}
