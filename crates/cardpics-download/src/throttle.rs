//! Download throughput throttling.
//!
//! Tracks bytes written in a rolling ~1 second window and sleeps whenever
//! the observed rate would exceed the configured cap; the window resets
//! every second of wall time.

use std::time::Duration;

use tokio::time::Instant;

/// Window length before the byte counter resets.
const WINDOW: Duration = Duration::from_secs(1);

/// Rate limiter for a single download stream.
///
/// Not shared: each in-flight download gets its own limiter, so the cap
/// applies per download, not across the pool.
pub struct RateLimiter {
    limit_bytes_per_sec: u64,
    window_start: Instant,
    window_bytes: u64,
}

impl RateLimiter {
    /// Create a limiter for the given cap in KB/s; 0 disables throttling.
    #[must_use]
    pub fn new(limit_kbps: u32) -> Self {
        Self {
            limit_bytes_per_sec: u64::from(limit_kbps) * 1024,
            window_start: Instant::now(),
            window_bytes: 0,
        }
    }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.limit_bytes_per_sec == 0
    }

    /// Record `len` written bytes and sleep long enough to keep the
    /// observed rate under the cap.
    pub async fn throttle(&mut self, len: usize) {
        if self.is_unlimited() {
            return;
        }

        self.window_bytes += len as u64;
        let elapsed = self.window_start.elapsed();
        #[allow(clippy::cast_precision_loss)]
        let expected = Duration::from_secs_f64(
            self.window_bytes as f64 / self.limit_bytes_per_sec as f64,
        );
        if expected > elapsed {
            tokio::time::sleep(expected - elapsed).await;
        }

        if self.window_start.elapsed() >= WINDOW {
            self.window_start = Instant::now();
            self.window_bytes = 0;
        }
    }
}
