//! Error types for metadata resolution.

use thiserror::Error;

use crate::retry::{FailureType, RetryableError, classify_http_status, is_tls_error};

/// Errors raised while listing an item's files.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Connection-level failure or timeout.
    #[error("network error fetching metadata for {identifier}: {source}")]
    Network {
        /// The item identifier.
        identifier: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The metadata API answered with a non-success status.
    #[error("HTTP {status} fetching metadata for {identifier}")]
    HttpStatus {
        /// The item identifier.
        identifier: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The archive answered `{}`: no such item.
    #[error("unknown identifier {identifier}")]
    UnknownIdentifier {
        /// The item identifier.
        identifier: String,
    },

    /// The body is not JSON, or `files` has an unexpected shape.
    #[error("unparseable metadata for {identifier}: {reason}")]
    Unparseable {
        /// The item identifier.
        identifier: String,
        /// Parser message.
        reason: String,
    },
}

impl MetadataError {
    /// Creates a network error.
    pub fn network(identifier: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            identifier: identifier.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(identifier: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            identifier: identifier.into(),
            status,
        }
    }

    /// Creates an unknown-identifier error.
    pub fn unknown(identifier: impl Into<String>) -> Self {
        Self::UnknownIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Creates an unparseable-body error.
    pub fn unparseable(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unparseable {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

impl RetryableError for MetadataError {
    fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } if is_tls_error(source) => FailureType::Permanent,
            Self::Network { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::UnknownIdentifier { .. } | Self::Unparseable { .. } => FailureType::Permanent,
        }
    }
}
