//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use posmon_config::ConfigError;
use posmon_core::{CoreError, OverallLevel};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const NOT_READY: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the SmartPOS USB agent at {url}")]
    #[diagnostic(
        code(posmon::connection_failed),
        help(
            "Check that the SmartPOS USB service is running on this terminal.\n\
             Reason: {reason}\n\
             Override the address with --url or `posmon config set url <URL>`."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("The agent did not answer in time")]
    #[diagnostic(
        code(posmon::timeout),
        help("Increase the timeout with --timeout or check the agent's load.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("The agent rejected the API key")]
    #[diagnostic(
        code(posmon::auth_failed),
        help(
            "Actions need the agent's API key.\n\
             Store it with: posmon config set-key\n\
             Or set the SMARTPOS_USB_APIKEY environment variable."
        )
    )]
    AuthFailed,

    // ── Devices ──────────────────────────────────────────────────────
    #[error("No single device matches '{query}'")]
    #[diagnostic(
        code(posmon::not_found),
        help("Known devices: {candidates}\nUse --force to send the id as given.")
    )]
    NotFound { query: String, candidates: String },

    // ── Agent responses ──────────────────────────────────────────────
    #[error("Agent error (HTTP {status}): {message}")]
    #[diagnostic(code(posmon::rejected))]
    Rejected { status: u16, message: String },

    #[error("Agent refused the action: {message}")]
    #[diagnostic(code(posmon::refused))]
    Refused { message: String },

    #[error("Unexpected response from the agent: {message}")]
    #[diagnostic(
        code(posmon::malformed),
        help("Is --url pointing at the SmartPOS USB agent?")
    )]
    Malformed { message: String },

    // ── Readiness ────────────────────────────────────────────────────
    #[error("Peripherals are not ready (level {level})")]
    #[diagnostic(code(posmon::not_ready))]
    NotReady { level: OverallLevel },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(posmon::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(posmon::config),
        help("Inspect it with: posmon config show")
    )]
    Config { message: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(posmon::keyring),
        help("Set SMARTPOS_USB_APIKEY instead if no keyring is available.")
    )]
    Keyring { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(posmon::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(posmon::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::NotReady { .. } => exit_code::NOT_READY,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unreachable { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Unauthorized => CliError::AuthFailed,
            CoreError::MalformedResponse { message } => CliError::Malformed { message },
            CoreError::RemoteRejected { status, message } => {
                CliError::Rejected { status, message }
            }
            CoreError::ActionRefused { message } => CliError::Refused { message },
            CoreError::DeviceNotFound { query, candidates } => CliError::NotFound {
                query,
                candidates: if candidates.is_empty() {
                    "(none)".into()
                } else {
                    candidates.join(", ")
                },
            },
            CoreError::InvalidDeviceId { id } => CliError::Validation {
                field: "device".into(),
                reason: format!("'{id}' cannot be used as a device id"),
            },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Keyring(message) => CliError::Keyring { message },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
