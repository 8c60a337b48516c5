use thiserror::Error;

/// Top-level error type for the `posmon-api` crate.
///
/// Covers every failure mode of a single request against the agent:
/// transport, HTTP status, and body decoding. `posmon-core` maps these
/// into its user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL has no hierarchical path (e.g. `mailto:`), so
    /// endpoint segments cannot be appended to it.
    #[error("Base URL cannot be used for API paths: {0}")]
    CannotBeABase(String),

    /// A path segment (usually a device id) that cannot be addressed:
    /// empty, `.` or `..`. URL normalization would drop or collapse it.
    #[error("Cannot address path segment '{0}'")]
    InvalidPathSegment(String),

    // ── Authentication ──────────────────────────────────────────────
    /// The configured API key cannot be sent as a header value.
    #[error("Invalid API key header value: {0}")]
    InvalidApiKey(String),

    /// The agent rejected the API key (or none was sent but one is required).
    #[error("Unauthorized (HTTP {status}) -- check the configured API key")]
    Unauthorized { status: u16 },

    // ── Service ─────────────────────────────────────────────────────
    /// Non-2xx response from the agent.
    #[error("Agent rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the agent could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// The HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Unauthorized { status } | Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
