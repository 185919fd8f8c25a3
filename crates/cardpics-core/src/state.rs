//! Shared run state.
//!
//! One instance is shared between the coordinator, its workers, and any
//! number of status pollers. Counters, logs, and error details live
//! behind a single mutex that is only held for the brief increment/append
//! step, never across I/O. Cancel and pause are lock-free signals so
//! workers can check them at every chunk boundary without contention.
//!
//! Lifecycle: [`RunState::reset`] zeroes everything at run start (and
//! replaces the cancellation token, so a stale cancel cannot leak into
//! the new run); workers mutate counters while the run is active;
//! [`RunState::finish`] clears the running flag, after which nothing
//! mutates the state until the next reset.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::DownloadError;
use crate::report::ReportPaths;

/// Maximum log entries retained in the ring buffer.
pub const LOG_CAPACITY: usize = 100;

/// Trailing log entries exposed in a status snapshot.
pub const SNAPSHOT_LOG_LINES: usize = 20;

/// Re-poll granularity of the pause wait. A cancel arriving while paused
/// is observed within this interval even if the resume notify is missed.
const PAUSE_POLL: Duration = Duration::from_millis(500);

/// Severity tag attached to each log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line in the run log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-item failure record, kept for the run report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub image_id: u64,
    pub name: String,
    pub url: String,
    pub error: String,
}

/// Point-in-time copy of the run state, safe to hand to pollers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub finished: bool,
    pub paused: bool,
    pub cancel_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportPaths>,
    /// The newest log lines, oldest first.
    pub logs: Vec<LogEntry>,
}

/// Counters and buffers guarded by the state mutex.
#[derive(Debug, Default)]
struct Inner {
    total: u64,
    processed: u64,
    skipped: u64,
    errors: u64,
    logs: VecDeque<LogEntry>,
    error_details: Vec<ErrorDetail>,
    api_error: Option<String>,
    report: Option<ReportPaths>,
    cancel: CancellationToken,
}

impl Inner {
    fn push_log(&mut self, level: LogLevel, message: String) {
        self.logs.push_back(LogEntry {
            level,
            message,
            timestamp: Utc::now(),
        });
        while self.logs.len() > LOG_CAPACITY {
            self.logs.pop_front();
        }
    }
}

/// Thread-safe run state shared by the coordinator, workers, and pollers.
#[derive(Debug, Default)]
pub struct RunState {
    inner: Mutex<Inner>,
    running: AtomicBool,
    paused: AtomicBool,
    resume_notify: Notify,
}

impl RunState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A worker panicking mid-increment leaves the counters merely
        // stale, not torn, so the poisoned guard is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the running flag. Returns false if a run is already active.
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Zero all counters, logs, and signals for a fresh run.
    ///
    /// The previous run's cancellation token is replaced wholesale.
    /// Leaves the running flag untouched; pair with [`Self::try_begin`].
    pub fn reset(&self) {
        self.paused.store(false, Ordering::SeqCst);
        *self.lock() = Inner::default();
    }

    /// Mark the run finished. From the pollers' view the state is frozen
    /// until the next reset. This transition is the single authoritative
    /// "done" signal.
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clone of the current run's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.lock().cancel.clone()
    }

    /// Request cooperative cancellation of the active run. Idempotent;
    /// stays set until the next run's reset.
    pub fn request_cancel(&self) {
        self.lock().cancel.cancel();
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.lock().cancel.is_cancelled()
    }

    /// Set the pause flag; workers block at their next chunk boundary.
    pub fn set_paused(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Clear the pause flag and wake blocked workers immediately.
    pub fn clear_paused(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume_notify.notify_waiters();
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Block while the pause flag is set, without consuming CPU.
    ///
    /// Wakes promptly on [`Self::clear_paused`] and re-polls at most
    /// every 500 ms; returns `Err(Cancelled)` as soon as cancellation is
    /// observed while paused.
    pub async fn wait_while_paused(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        while self.is_paused() {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            tokio::select! {
                () = self.resume_notify.notified() => {}
                () = tokio::time::sleep(PAUSE_POLL) => {}
                () = cancel.cancelled() => return Err(DownloadError::Cancelled),
            }
        }
        Ok(())
    }

    pub fn set_total(&self, total: u64) {
        self.lock().total = total;
    }

    pub fn set_api_error(&self, message: impl Into<String>) {
        self.lock().api_error = Some(message.into());
    }

    pub fn set_report(&self, report: ReportPaths) {
        self.lock().report = Some(report);
    }

    /// Append a log line to the bounded ring buffer (oldest entries are
    /// evicted past [`LOG_CAPACITY`]).
    pub fn add_log(&self, level: LogLevel, message: impl Into<String>) {
        self.lock().push_log(level, message.into());
    }

    /// Count one completed download. Logs a milestone line for each of
    /// the first ten and every 50th after that.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.processed += 1;
        let (processed, total) = (inner.processed, inner.total);
        if processed <= 10 || processed % 50 == 0 {
            inner.push_log(LogLevel::Success, format!("Downloaded {processed}/{total}"));
        }
    }

    /// Count one skipped task. Logs a milestone line every 100th skip.
    pub fn record_skip(&self) {
        let mut inner = self.lock();
        inner.skipped += 1;
        if inner.skipped % 100 == 0 {
            let skipped = inner.skipped;
            inner.push_log(LogLevel::Info, format!("Skipped {skipped} existing images"));
        }
    }

    /// Count one failed task and keep its detail for the run report.
    pub fn record_error(&self, detail: ErrorDetail) {
        let mut inner = self.lock();
        inner.errors += 1;
        inner.push_log(
            LogLevel::Error,
            format!(
                "Error in {} (ID: {}): {}",
                detail.name, detail.image_id, detail.error
            ),
        );
        inner.error_details.push(detail);
    }

    /// Copy of the accumulated per-item failures.
    #[must_use]
    pub fn error_details(&self) -> Vec<ErrorDetail> {
        self.lock().error_details.clone()
    }

    /// Point-in-time copy for control-plane polling. Only the last
    /// [`SNAPSHOT_LOG_LINES`] log entries are included, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock();
        let skip = inner.logs.len().saturating_sub(SNAPSHOT_LOG_LINES);
        StatusSnapshot {
            total: inner.total,
            processed: inner.processed,
            skipped: inner.skipped,
            errors: inner.errors,
            finished: !self.is_running(),
            paused: self.is_paused(),
            cancel_requested: inner.cancel.is_cancelled(),
            api_error: inner.api_error.clone(),
            report: inner.report.clone(),
            logs: inner.logs.iter().skip(skip).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_exclusive_until_finish() {
        let state = RunState::new();
        assert!(state.try_begin());
        assert!(!state.try_begin());

        state.finish();
        assert!(state.try_begin());
    }

    #[test]
    fn counters_accumulate_and_snapshot() {
        let state = RunState::new();
        state.set_total(3);
        state.record_success();
        state.record_skip();
        state.record_error(ErrorDetail {
            image_id: 7,
            name: "Broken".to_string(),
            url: "https://img.example/7.jpg".to_string(),
            error: "Network error: reset".to_string(),
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.processed + snapshot.skipped + snapshot.errors, 3);
        assert_eq!(state.error_details().len(), 1);
    }

    #[test]
    fn log_buffer_caps_at_capacity() {
        let state = RunState::new();
        for i in 0..150 {
            state.add_log(LogLevel::Info, format!("line {i}"));
        }

        // Snapshot shows only the newest lines, oldest first.
        let snapshot = state.snapshot();
        assert_eq!(snapshot.logs.len(), SNAPSHOT_LOG_LINES);
        assert_eq!(snapshot.logs.last().unwrap().message, "line 149");
        assert_eq!(
            snapshot.logs.first().unwrap().message,
            format!("line {}", 150 - SNAPSHOT_LOG_LINES)
        );
    }

    #[test]
    fn reset_replaces_cancel_token() {
        let state = RunState::new();
        state.request_cancel();
        assert!(state.is_cancel_requested());

        state.reset();
        assert!(!state.is_cancel_requested());
        assert!(!state.cancel_token().is_cancelled());
    }

    #[test]
    fn reset_clears_pause() {
        let state = RunState::new();
        state.set_paused();
        state.reset();
        assert!(!state.is_paused());
    }

    #[tokio::test]
    async fn wait_while_paused_returns_immediately_when_not_paused() {
        let state = RunState::new();
        let cancel = state.cancel_token();
        state.wait_while_paused(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn wait_while_paused_wakes_on_resume() {
        let state = std::sync::Arc::new(RunState::new());
        state.set_paused();
        let cancel = state.cancel_token();

        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move {
                let cancel = state.cancel_token();
                state.wait_while_paused(&cancel).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        state.clear_paused();
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after resume")
            .unwrap();
        assert!(result.is_ok());
        drop(cancel);
    }

    #[tokio::test]
    async fn cancel_during_pause_is_observed() {
        let state = std::sync::Arc::new(RunState::new());
        state.set_paused();

        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move {
                let cancel = state.cancel_token();
                state.wait_while_paused(&cancel).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        state.request_cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should observe cancel while paused")
            .unwrap();
        assert_eq!(result, Err(DownloadError::Cancelled));
    }
}
