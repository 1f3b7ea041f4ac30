//! Orchestrator state machine.

use std::fmt;

/// Where the orchestrator currently is.
///
/// `Idle → Searching → ProcessingBook → Downloading → Recording →
/// (next book | Searching) → Done`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Not started.
    #[default]
    Idle,
    /// Fetching a search page.
    Searching {
        /// 1-based page number.
        page: u32,
    },
    /// Resolving an item's files.
    ProcessingBook {
        /// Item identifier.
        identifier: String,
    },
    /// Streaming a file.
    Downloading {
        /// Item identifier.
        identifier: String,
        /// File name.
        file: String,
    },
    /// Writing the download record.
    Recording {
        /// Item identifier.
        identifier: String,
        /// File name.
        file: String,
    },
    /// Search exhausted.
    Done,
}

impl PipelineState {
    /// Returns whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use PipelineState::{Done, Downloading, Idle, ProcessingBook, Recording, Searching};
        matches!(
            (self, next),
            (Idle, Searching { .. } | Done)
                | (Searching { .. }, Searching { .. } | ProcessingBook { .. } | Done)
                | (
                    ProcessingBook { .. },
                    ProcessingBook { .. } | Downloading { .. } | Searching { .. } | Done
                )
                | (
                    Downloading { .. },
                    Recording { .. }
                        | Downloading { .. }
                        | ProcessingBook { .. }
                        | Searching { .. }
                        | Done
                )
                | (
                    Recording { .. },
                    Downloading { .. } | ProcessingBook { .. } | Searching { .. } | Done
                )
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Searching { page } => write!(f, "searching page {page}"),
            Self::ProcessingBook { identifier } => write!(f, "processing {identifier}"),
            Self::Downloading { identifier, file } => write!(f, "downloading {identifier}/{file}"),
            Self::Recording { identifier, file } => write!(f, "recording {identifier}/{file}"),
            Self::Done => f.write_str("done"),
        }
    }
}
