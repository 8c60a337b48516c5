// ── Core error types ──
//
// User-facing errors from posmon-core. Consumers never see reqwest
// errors or JSON parse failures directly; the `From<posmon_api::Error>`
// impl folds them into the unreachable / malformed / rejected taxonomy.

use thiserror::Error;

use crate::model::ParseError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Reachability ─────────────────────────────────────────────────
    #[error("Cannot reach the USB agent at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("USB agent did not answer in time")]
    Timeout,

    // ── Response errors ──────────────────────────────────────────────
    #[error("Malformed response from USB agent: {message}")]
    MalformedResponse { message: String },

    #[error("USB agent rejected the request (HTTP {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("USB agent refused the action: {message}")]
    ActionRefused { message: String },

    #[error("Unauthorized -- the API key is missing or was rejected")]
    Unauthorized,

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("No single device matches '{query}'")]
    DeviceNotFound {
        query: String,
        candidates: Vec<String>,
    },

    #[error("Device id '{id}' cannot be addressed by the agent")]
    InvalidDeviceId { id: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Short reason suitable for a one-line notification.
    pub fn short_reason(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "service unreachable",
            Self::Timeout => "request timed out",
            Self::MalformedResponse { .. } => "malformed response",
            Self::RemoteRejected { .. } => "request rejected",
            Self::ActionRefused { .. } => "action refused",
            Self::Unauthorized => "unauthorized",
            Self::DeviceNotFound { .. } => "device not found",
            Self::InvalidDeviceId { .. } => "invalid device id",
            Self::Config { .. } => "configuration error",
        }
    }

    /// Returns `true` if the agent could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<posmon_api::Error> for CoreError {
    fn from(err: posmon_api::Error) -> Self {
        match err {
            posmon_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if let Some(status) = e.status() {
                    CoreError::RemoteRejected {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else if e.is_decode() || e.is_body() {
                    CoreError::MalformedResponse {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Unreachable {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            posmon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            posmon_api::Error::CannotBeABase(url) => CoreError::Config {
                message: format!("URL cannot be used as an API base: {url}"),
            },
            posmon_api::Error::InvalidPathSegment(id) => CoreError::InvalidDeviceId { id },
            posmon_api::Error::InvalidApiKey(reason) => CoreError::Config {
                message: format!("Invalid API key: {reason}"),
            },
            posmon_api::Error::Unauthorized { .. } => CoreError::Unauthorized,
            posmon_api::Error::Rejected { status, message } => {
                CoreError::RemoteRejected { status, message }
            }
            posmon_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}

impl From<ParseError> for CoreError {
    fn from(err: ParseError) -> Self {
        CoreError::MalformedResponse {
            message: err.to_string(),
        }
    }
}
