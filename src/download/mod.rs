//! Streaming download executor.
//!
//! [`Downloader::download`] streams one response body to disk through a
//! fixed-capacity buffered writer, reports progress through a
//! [`ProgressSink`], and renames a `.part` sibling into place only on success.
//! [`local_path`] maps archive file names under the download directory and
//! [`unique_path`] steps around names already taken on disk.

mod client;
mod constants;
mod error;
mod path;
mod progress;

pub use client::{DownloadOutcome, Downloader};
pub use constants::{DEFAULT_CHUNK_SIZE, DEFAULT_PROGRESS_INTERVAL};
pub use error::DownloadError;
pub use path::{local_path, unique_path};
pub use progress::{LogProgress, NoProgress, ProgressSink};
