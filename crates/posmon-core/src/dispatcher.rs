// ── Command dispatcher ──
//
// Operator-initiated one-shot actions. Each call performs exactly one
// request and folds the outcome into an `ActionResult`; nothing here
// retries or panics on agent failure.

use std::fmt;

use bytes::Bytes;
use posmon_api::{ActionAck, AgentClient};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::health::OverallLevel;
use crate::model::StatusSnapshot;

/// Export categories used when the operator does not pick any.
pub const DEFAULT_EXPORT_MASK: &str = "db,logs";

/// Operator-facing action identity, used in logs and notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Preflight,
    Recycle { device_id: String },
    RestartService { device_id: String },
    Rescan,
    ReloadPolicy,
    Export { mask: String },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preflight => f.write_str("Preflight"),
            Self::Recycle { device_id } => write!(f, "Recycle {device_id}"),
            Self::RestartService { device_id } => write!(f, "Restart service {device_id}"),
            Self::Rescan => f.write_str("Rescan"),
            Self::ReloadPolicy => f.write_str("Policy reload"),
            Self::Export { mask } => write!(f, "Export ({mask})"),
        }
    }
}

/// Readiness verdict returned by preflight.
#[derive(Debug, Clone)]
pub struct Readiness {
    pub level: OverallLevel,
    pub snapshot: StatusSnapshot,
}

/// Typed payload of a successful action.
#[derive(Debug, Clone)]
pub enum ActionPayload {
    Readiness(Readiness),
    /// Raw archive bytes, exactly as the agent sent them.
    Archive(Bytes),
}

/// Outcome of one dispatched action. Exactly one of success or error.
#[derive(Debug)]
pub struct ActionResult {
    action: Action,
    payload: Option<ActionPayload>,
    detail: Option<String>,
    error: Option<CoreError>,
}

impl ActionResult {
    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn payload(&self) -> Option<&ActionPayload> {
        self.payload.as_ref()
    }

    /// Free-text detail the agent attached to a successful action.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn error(&self) -> Option<&CoreError> {
        self.error.as_ref()
    }

    pub fn readiness(&self) -> Option<&Readiness> {
        match self.payload {
            Some(ActionPayload::Readiness(ref r)) => Some(r),
            _ => None,
        }
    }

    pub fn archive(&self) -> Option<&Bytes> {
        match self.payload {
            Some(ActionPayload::Archive(ref bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// One-line text for a toast or status bar.
    pub fn notification(&self) -> String {
        match (&self.error, &self.payload, &self.detail) {
            (Some(e), _, _) => format!("{} failed: {}", self.action, e.short_reason()),
            (None, Some(ActionPayload::Readiness(r)), _) => {
                format!("{}: {}", self.action, r.level)
            }
            (None, Some(ActionPayload::Archive(bytes)), _) => {
                format!("{}: {} bytes", self.action, bytes.len())
            }
            (None, None, Some(detail)) => format!("{}: OK ({detail})", self.action),
            (None, None, None) => format!("{}: OK", self.action),
        }
    }

    /// Convert into a plain `Result`, for callers that propagate with `?`.
    pub fn into_result(self) -> Result<Option<ActionPayload>, CoreError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.payload),
        }
    }
}

#[derive(Default)]
struct Outcome {
    payload: Option<ActionPayload>,
    detail: Option<String>,
}

fn conclude(action: Action, outcome: Result<Outcome, CoreError>) -> ActionResult {
    match outcome {
        Ok(Outcome { payload, detail }) => {
            info!(action = %action, detail = detail.as_deref().unwrap_or(""), "action succeeded");
            ActionResult {
                action,
                payload,
                detail,
                error: None,
            }
        }
        Err(error) => {
            warn!(action = %action, error = %error, "action failed");
            ActionResult {
                action,
                payload: None,
                detail: None,
                error: Some(error),
            }
        }
    }
}

/// Treat an explicit `"ok": false` in a 2xx body as a refusal.
fn acknowledged(ack: &ActionAck) -> Result<Outcome, CoreError> {
    if !ack.is_ok() {
        return Err(CoreError::ActionRefused {
            message: ack
                .message()
                .unwrap_or("agent reported failure")
                .to_owned(),
        });
    }
    Ok(Outcome {
        payload: None,
        detail: ack.message().map(str::to_owned),
    })
}

// ── Dispatcher ───────────────────────────────────────────────────────

/// Runs operator actions against the agent.
#[derive(Clone)]
pub struct Dispatcher {
    client: AgentClient,
}

impl Dispatcher {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }

    /// Ask the agent to re-check every device and report readiness.
    pub async fn preflight(&self) -> ActionResult {
        conclude(Action::Preflight, self.run_preflight().await)
    }

    async fn run_preflight(&self) -> Result<Outcome, CoreError> {
        let doc = self.client.preflight().await?;
        let snapshot = StatusSnapshot::parse(&doc)?;
        let level = snapshot.level();
        Ok(Outcome {
            payload: Some(ActionPayload::Readiness(Readiness { level, snapshot })),
            detail: None,
        })
    }

    /// Reset one device. Success is decided by HTTP status alone; the
    /// body is only kept as detail text.
    pub async fn recycle_device(&self, device_id: &str) -> ActionResult {
        let outcome = self
            .client
            .recycle_device(device_id)
            .await
            .map(|ack| Outcome {
                payload: None,
                detail: ack.message().map(str::to_owned),
            })
            .map_err(CoreError::from);

        conclude(
            Action::Recycle {
                device_id: device_id.to_owned(),
            },
            outcome,
        )
    }

    /// Download a diagnostic archive for the given category mask.
    pub async fn export_diagnostics(&self, mask: &str) -> ActionResult {
        let mask = if mask.trim().is_empty() {
            DEFAULT_EXPORT_MASK
        } else {
            mask.trim()
        };

        let outcome = self
            .client
            .export(mask)
            .await
            .map(|bytes| Outcome {
                payload: Some(ActionPayload::Archive(bytes)),
                detail: None,
            })
            .map_err(CoreError::from);

        conclude(
            Action::Export {
                mask: mask.to_owned(),
            },
            outcome,
        )
    }

    pub async fn restart_service(&self, device_id: &str) -> ActionResult {
        let outcome = match self.client.restart_service(device_id).await {
            Ok(ack) => acknowledged(&ack),
            Err(e) => Err(e.into()),
        };
        conclude(
            Action::RestartService {
                device_id: device_id.to_owned(),
            },
            outcome,
        )
    }

    /// Re-enumerate USB devices. Reports the device count when the agent
    /// sends one.
    pub async fn rescan(&self) -> ActionResult {
        let outcome = match self.client.rescan().await {
            Ok(ack) => acknowledged(&ack).map(|mut outcome| {
                if let Some(count) = ack.devices {
                    outcome.detail = Some(format!("{count} devices"));
                }
                outcome
            }),
            Err(e) => Err(e.into()),
        };
        conclude(Action::Rescan, outcome)
    }

    pub async fn reload_policy(&self) -> ActionResult {
        let outcome = match self.client.reload_policy().await {
            Ok(ack) => acknowledged(&ack),
            Err(e) => Err(e.into()),
        };
        conclude(Action::ReloadPolicy, outcome)
    }
}
