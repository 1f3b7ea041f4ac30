//! Error types for the search client.

use thiserror::Error;

use crate::retry::{FailureType, RetryableError, classify_http_status, is_tls_error};

/// Errors raised while fetching one search page.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("network error querying {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The request or response body timed out.
    #[error("timeout querying {url}")]
    Timeout {
        /// The request URL.
        url: String,
    },

    /// The search API answered with a non-success status.
    #[error("HTTP {status} from search API at {url}")]
    HttpStatus {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body is not the expected `response.docs` / `response.numFound` JSON.
    #[error("malformed search response from {url}: {reason}")]
    Malformed {
        /// The request URL.
        url: String,
        /// Parser message.
        reason: String,
    },
}

impl SearchError {
    /// Classifies a reqwest error into `Timeout` or `Network`.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a malformed-body error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl RetryableError for SearchError {
    fn failure_type(&self) -> FailureType {
        match self {
            Self::Network { source, .. } if is_tls_error(source) => FailureType::Permanent,
            Self::Network { .. } | Self::Timeout { .. } => FailureType::Transient,
            Self::HttpStatus { status, .. } => classify_http_status(*status),
            Self::Malformed { .. } => FailureType::Permanent,
        }
    }
}
