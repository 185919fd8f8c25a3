//! Download coordinator.
//!
//! Owns the shared run state and drives a bounded worker pool over the
//! derived task list. One run at a time; the control-plane observes
//! progress through status snapshots and drives pause/resume/cancel
//! through [`PicsDownloaderPort`].
//!
//! Per-task failures are recorded and counted at the worker boundary -
//! a single bad task never aborts the run. Only an invalid pics
//! directory and a failed catalog fetch are run-fatal, and both happen
//! before any image I/O.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::stream::{self, StreamExt};
use tracing::{error, info, warn};

use cardpics_core::{
    CatalogPort, DownloadError, DownloadTask, ErrorDetail, FetchPolicy, ImageFetcherPort,
    LogLevel, PicsDirSource, PicsDownloaderPort, PreviewSummary, RunConfig, RunOptions, RunReport,
    RunSignals, RunState, RunTotals, StatusSnapshot, Subfolder, build_tasks, filter_cards,
    format_elapsed, resolve_pics_dir,
};

use crate::existing::filter_existing;
use crate::report::write_report;
use crate::validate::is_valid_jpeg;

/// Ports the downloader drives.
///
/// Cloned `Arc` handles, so adapters wire the HTTP implementations and
/// tests inject mocks.
#[derive(Clone)]
pub struct DownloaderDeps {
    pub catalog: Arc<dyn CatalogPort>,
    pub fetcher: Arc<dyn ImageFetcherPort>,
}

/// The download engine behind [`PicsDownloaderPort`].
pub struct Downloader {
    deps: DownloaderDeps,
    state: Arc<RunState>,
}

/// Catalog resolution for one run or preview.
struct PreparedRun {
    /// Entries received from the API, before any filter.
    fetched: usize,
    /// Entries left after the type/set filters.
    matched: usize,
    /// Tasks derived from the matched entries.
    derived: usize,
    /// Tasks left after the existing-file filter.
    tasks: Vec<DownloadTask>,
}

/// Everything a worker needs besides its task. Plain shared references;
/// worker futures run inside the coordinator's `for_each_concurrent`, so
/// nothing here needs `'static`.
#[derive(Clone, Copy)]
struct WorkerCtx<'a> {
    pics_dir: &'a Path,
    force: bool,
    validate_existing: bool,
    fetcher: &'a dyn ImageFetcherPort,
    policy: &'a FetchPolicy,
    signals: &'a RunSignals,
    state: &'a RunState,
}

impl Downloader {
    #[must_use]
    pub fn new(deps: DownloaderDeps) -> Self {
        Self {
            deps,
            state: Arc::new(RunState::new()),
        }
    }

    /// Shared state handle, for adapters that need more than
    /// [`PicsDownloaderPort::status`].
    #[must_use]
    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    /// Resolve the catalog into the final task list for `config`.
    async fn prepare_tasks(
        &self,
        config: &RunConfig,
        pics_dir: &Path,
    ) -> Result<PreparedRun, DownloadError> {
        let cards = self
            .deps
            .catalog
            .fetch_catalog(&config.api_url, config.timeout())
            .await?;
        let fetched = cards.len();
        let cards = filter_cards(cards, &config.type_filter, &config.set_filter);
        let tasks = build_tasks(&cards);
        let derived = tasks.len();
        let tasks = filter_existing(tasks, pics_dir, config.only_missing, config.validate_existing);
        Ok(PreparedRun {
            fetched,
            matched: cards.len(),
            derived,
            tasks,
        })
    }

    /// Full run, executed on a background task. All failures end in
    /// [`RunState::finish`]; nothing propagates out.
    async fn run(self: Arc<Self>, config: RunConfig) {
        let started = Instant::now();
        let state = Arc::clone(&self.state);
        state.add_log(LogLevel::Info, "Starting downloader");

        let pics_dir = match resolve_pics_dir(&config.pics_dir) {
            Ok(resolution) => {
                if let PicsDirSource::Redirected { ref from } = resolution.source {
                    state.add_log(
                        LogLevel::Info,
                        format!(
                            "Selected folder contains 'pics'. Using: {} (given: {})",
                            resolution.path.display(),
                            from.display()
                        ),
                    );
                }
                resolution.path
            }
            Err(err) => {
                error!(%err, "invalid pics directory");
                state.add_log(LogLevel::Error, err.to_string());
                state.finish();
                return;
            }
        };

        state.add_log(
            LogLevel::Info,
            format!("Output directory: {}", pics_dir.display()),
        );
        if !Subfolder::Field.dir_under(&pics_dir).is_dir() {
            state.add_log(
                LogLevel::Warning,
                "Field folder not found (pics/field); field-spell crops need it to exist",
            );
        }

        state.add_log(LogLevel::Info, "Connecting to catalog API");
        let prepared = match self.prepare_tasks(&config, &pics_dir).await {
            Ok(prepared) => prepared,
            Err(err) => {
                error!(%err, "catalog fetch failed");
                state.set_api_error(err.to_string());
                state.add_log(LogLevel::Error, format!("API connection error: {err}"));
                state.finish();
                return;
            }
        };
        state.add_log(
            LogLevel::Success,
            format!("Received {} cards from API", prepared.fetched),
        );

        let tasks = prepared.tasks;
        let filtered_out = prepared.derived - tasks.len();
        if filtered_out > 0 {
            state.add_log(
                LogLevel::Info,
                format!("Filtered {filtered_out} existing images"),
            );
        }

        state.set_total(tasks.len() as u64);
        if tasks.is_empty() {
            state.add_log(LogLevel::Success, "All images already downloaded");
            state.finish();
            return;
        }

        state.add_log(
            LogLevel::Success,
            format!("Prepared {} images for download", tasks.len()),
        );
        state.add_log(
            LogLevel::Info,
            format!(
                "Configuration: {} parallel downloads, {} retries, {}s timeout",
                config.concurrency, config.max_retries, config.timeout_secs
            ),
        );
        state.add_log(
            LogLevel::Info,
            if config.force {
                "Mode: force replace"
            } else {
                "Mode: skip existing"
            },
        );
        if config.rate_limit_kbps > 0 {
            state.add_log(
                LogLevel::Info,
                format!("Rate limit: {} KB/s per download", config.rate_limit_kbps),
            );
        }
        if config.validate_existing {
            state.add_log(LogLevel::Info, "Validate existing: enabled");
        }
        state.add_log(LogLevel::Info, "Starting downloads");
        info!(
            tasks = tasks.len(),
            concurrency = config.concurrency,
            "dispatching download tasks"
        );

        let signals = RunSignals::for_run(&state);
        let policy = FetchPolicy {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            rate_limit_kbps: config.rate_limit_kbps,
        };
        let ctx = WorkerCtx {
            pics_dir: &pics_dir,
            force: config.force,
            validate_existing: config.validate_existing,
            fetcher: self.deps.fetcher.as_ref(),
            policy: &policy,
            signals: &signals,
            state: &state,
        };

        stream::iter(tasks)
            .for_each_concurrent(config.concurrency as usize, |task| async move {
                let outcome = AssertUnwindSafe(process_task(&task, ctx))
                    .catch_unwind()
                    .await;
                if outcome.is_err() {
                    ctx.state
                        .record_error(task_detail(&task, "worker panicked".to_string()));
                }
            })
            .await;

        self.finish_run(&config, &pics_dir, started);
    }

    /// Final summary block, report artifacts, and the finished flag.
    fn finish_run(&self, config: &RunConfig, pics_dir: &Path, started: Instant) {
        let state = &self.state;
        let snapshot = state.snapshot();
        let cancelled = state.is_cancel_requested();
        let elapsed = started.elapsed();

        state.add_log(LogLevel::Info, "=".repeat(60));
        if cancelled {
            state.add_log(LogLevel::Warning, "DOWNLOAD CANCELLED");
        } else {
            state.add_log(LogLevel::Success, "DOWNLOAD COMPLETED");
        }
        state.add_log(LogLevel::Info, format!("Total images: {}", snapshot.total));
        state.add_log(
            LogLevel::Success,
            format!("Downloaded: {}", snapshot.processed),
        );
        state.add_log(LogLevel::Info, format!("Skipped: {}", snapshot.skipped));
        state.add_log(
            if snapshot.errors > 0 {
                LogLevel::Error
            } else {
                LogLevel::Info
            },
            format!("Errors: {}", snapshot.errors),
        );
        state.add_log(
            LogLevel::Info,
            format!("Total time: {}", format_elapsed(elapsed)),
        );
        #[allow(clippy::cast_precision_loss)]
        if snapshot.processed > 0 && elapsed.as_secs_f64() > 0.0 {
            let rate = snapshot.processed as f64 / elapsed.as_secs_f64();
            state.add_log(LogLevel::Info, format!("Average speed: {rate:.1} imgs/sec"));
        }
        state.add_log(
            LogLevel::Info,
            format!("Images saved to: {}", pics_dir.display()),
        );

        let totals = RunTotals {
            total: snapshot.total,
            downloaded: snapshot.processed,
            skipped: snapshot.skipped,
            errors: snapshot.errors,
            elapsed: format_elapsed(elapsed),
        };
        let report = RunReport::new(totals, state.error_details());
        match write_report(&config.reports_dir, &report) {
            Ok(paths) => {
                state.add_log(
                    LogLevel::Info,
                    format!("Report (JSON): {}", paths.json.display()),
                );
                state.add_log(
                    LogLevel::Info,
                    format!("Report (MD): {}", paths.markdown.display()),
                );
                state.set_report(paths);
            }
            Err(err) => {
                warn!(%err, "failed to write run report");
                state.add_log(LogLevel::Error, format!("Report error: {err}"));
            }
        }

        info!(
            processed = snapshot.processed,
            skipped = snapshot.skipped,
            errors = snapshot.errors,
            cancelled,
            "run finished"
        );
        state.finish();
    }
}

/// One worker: skip-check, then fetch. Cancelled tasks leave no trace in
/// the counters.
async fn process_task(task: &DownloadTask, ctx: WorkerCtx<'_>) {
    if ctx.signals.is_cancelled() {
        return;
    }

    let target_dir = task.subfolder.dir_under(ctx.pics_dir);
    if !target_dir.is_dir() {
        ctx.state.record_error(task_detail(
            task,
            format!("Target directory not found: {}", target_dir.display()),
        ));
        return;
    }

    let dest = task.output_path(ctx.pics_dir);
    if dest.exists() && !ctx.force {
        if !ctx.validate_existing || is_valid_jpeg(&dest) {
            ctx.state.record_skip();
            return;
        }
    }

    match ctx
        .fetcher
        .fetch_image(&task.url, &dest, ctx.policy, ctx.signals)
        .await
    {
        Ok(()) => ctx.state.record_success(),
        Err(err) if err.is_cancelled() => {}
        Err(err) => ctx.state.record_error(task_detail(task, err.to_string())),
    }
}

fn task_detail(task: &DownloadTask, error: String) -> ErrorDetail {
    ErrorDetail {
        image_id: task.image_id,
        name: task.name.clone(),
        url: task.url.clone(),
        error,
    }
}

#[async_trait]
impl PicsDownloaderPort for Downloader {
    async fn start(self: Arc<Self>, options: RunOptions) -> Result<(), DownloadError> {
        if !self.state.try_begin() {
            return Err(DownloadError::AlreadyRunning);
        }
        self.state.reset();

        let config = RunConfig::from_options(options);
        tokio::spawn(self.run(config));
        Ok(())
    }

    async fn preview(&self, options: RunOptions) -> Result<PreviewSummary, DownloadError> {
        let config = RunConfig::from_options(options);
        let pics_dir = resolve_pics_dir(&config.pics_dir)?.path;
        let prepared = self.prepare_tasks(&config, &pics_dir).await?;

        Ok(PreviewSummary {
            total_cards: prepared.matched as u64,
            total_tasks: prepared.derived as u64,
            to_download: prepared.tasks.len() as u64,
        })
    }

    fn pause(&self) {
        self.state.set_paused();
        self.state.add_log(LogLevel::Warning, "Download paused");
    }

    fn resume(&self) {
        self.state.clear_paused();
        self.state.add_log(LogLevel::Info, "Download resumed");
    }

    fn cancel(&self) {
        self.state.request_cancel();
        self.state.add_log(
            LogLevel::Warning,
            "Cancellation requested, stopping new downloads",
        );
    }

    fn status(&self) -> StatusSnapshot {
        self.state.snapshot()
    }
}
