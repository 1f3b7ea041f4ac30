//! Shared HTTP client construction.
//!
//! The search client, file resolver and download executor share one
//! connection pool so keep-alive connections to the archive are reused
//! across the whole run. Proxy settings come from the usual
//! `HTTP(S)_PROXY` environment variables, which reqwest reads itself.

use std::time::Duration;

use reqwest::Client;

use crate::config::HarvestConfig;
use crate::user_agent;

/// Timeout settings for the shared client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Maximum idle time between two reads of a response.
    pub read: Duration,
}

impl HttpTimeouts {
    /// Extracts timeouts from the harvest configuration.
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_timeout_secs),
            read: Duration::from_secs(config.read_timeout_secs),
        }
    }
}

/// Builds the shared reqwest client.
///
/// A read timeout (not a total timeout) is used so large PDFs can stream for
/// as long as data keeps arriving.
///
/// # Errors
///
/// Returns the reqwest builder error when the TLS backend cannot be set up.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}
