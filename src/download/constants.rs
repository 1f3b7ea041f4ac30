//! Constants for the download executor.

/// Default write buffer capacity while streaming (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Default number of bytes between two progress log lines (1 MiB).
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1024 * 1024;
