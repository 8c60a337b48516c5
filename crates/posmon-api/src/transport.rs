// Shared transport configuration for building reqwest::Client instances.
//
// The agent is loopback-only plain HTTP, so this is mostly timeouts.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("posmon/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout for status and action calls.
    pub timeout: Duration,
    /// Timeout for the export download, which streams a ZIP and can
    /// take noticeably longer than a status call.
    pub export_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            export_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The returned client is cheap to clone and safe to share between
    /// the poller and on-demand commands.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}
