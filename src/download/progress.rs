//! Progress reporting for streaming downloads.

use tracing::info;

use super::constants::DEFAULT_PROGRESS_INTERVAL;

/// Receives progress of one download.
///
/// `start` may be called again when a failed attempt is retried.
pub trait ProgressSink: Send {
    /// A response arrived; `total` is its declared length, if any.
    fn start(&mut self, name: &str, total: Option<u64>);

    /// `bytes` more bytes were written.
    fn advance(&mut self, bytes: u64);

    /// The download completed with `bytes` in total.
    fn finish(&mut self, bytes: u64);

    /// The attempt failed; the partial file is gone.
    fn abandon(&mut self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&mut self, _name: &str, _total: Option<u64>) {}
    fn advance(&mut self, _bytes: u64) {}
    fn finish(&mut self, _bytes: u64) {}
}

/// Logs a line every `interval` bytes.
#[derive(Debug)]
pub struct LogProgress {
    interval: u64,
    name: String,
    total: Option<u64>,
    written: u64,
    next_mark: u64,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl LogProgress {
    /// Creates a sink logging every `interval` bytes (at least 1).
    #[must_use]
    pub fn new(interval: u64) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            name: String::new(),
            total: None,
            written: 0,
            next_mark: interval,
        }
    }

    /// Bytes written since the last `start`.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl ProgressSink for LogProgress {
    fn start(&mut self, name: &str, total: Option<u64>) {
        self.name = name.to_string();
        self.total = total;
        self.written = 0;
        self.next_mark = self.interval;
    }

    fn advance(&mut self, bytes: u64) {
        self.written += bytes;
        if self.written < self.next_mark {
            return;
        }
        while self.next_mark <= self.written {
            self.next_mark += self.interval;
        }
        match self.total {
            Some(total) if total > 0 => {
                let percent = self.written.saturating_mul(100) / total;
                info!(file = %self.name, written = self.written, total, percent, "downloading");
            }
            _ => info!(file = %self.name, written = self.written, "downloading"),
        }
    }

    fn finish(&mut self, bytes: u64) {
        self.written = bytes;
    }
}
