// ── Runtime monitor configuration ──
//
// Describes *how* to reach the agent. Carries the API key and timing,
// but never touches disk. The CLI (via posmon-config) builds one and
// hands it in once at startup.

use std::time::Duration;

use posmon_api::TransportConfig;
use secrecy::SecretString;
use url::Url;

/// Loopback address the agent binds by default.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8765";

/// How often the tray refreshed its icon.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Floor for the poll period; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for talking to a single agent.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Agent base URL (e.g., `http://127.0.0.1:8765`).
    pub url: Url,
    /// Shared secret sent as `X-API-Key` on POST requests. `None` sends
    /// requests unauthenticated.
    pub api_key: Option<SecretString>,
    /// Timeout for status and action requests.
    pub timeout: Duration,
    /// Timeout for diagnostic export downloads.
    pub export_timeout: Duration,
    /// Poller tick period.
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            url: Url::parse(DEFAULT_URL).expect("default agent URL is valid"),
            api_key: None,
            timeout: transport.timeout,
            export_timeout: transport.export_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl MonitorConfig {
    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            export_timeout: self.export_timeout,
        }
    }

    /// The poll period, clamped to [`MIN_POLL_INTERVAL`].
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.url.as_str(), "http://127.0.0.1:8765/");
        assert_eq!(cfg.poll_interval, Duration::from_secs(4));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let cfg = MonitorConfig {
            poll_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert_eq!(cfg.effective_poll_interval(), MIN_POLL_INTERVAL);
    }
}
