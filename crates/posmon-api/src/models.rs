// Wire types for action responses.
//
// Status payloads are deliberately NOT typed here: the core parses them
// entry-by-entry so that one malformed device does not sink the snapshot.

use serde::{Deserialize, Serialize};

/// Acknowledgement body returned by the agent's action endpoints.
///
/// Every field is optional; the agent uses `{"ok": bool, "detail": ...}`
/// for device and service actions, `{"ok": bool, "devices": N}` for a
/// rescan, and `{"ok": false, "error": ...}` for soft failures. An empty
/// or non-JSON body decodes to the default (all `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub devices: Option<u64>,
}

impl ActionAck {
    /// Decode an ack body, falling back to an empty ack for anything that
    /// is not a JSON object.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// `true` unless the agent explicitly reported `"ok": false`.
    pub fn is_ok(&self) -> bool {
        self.ok != Some(false)
    }

    /// Human-readable message from the ack, preferring the error text.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or(self.detail.as_deref())
    }
}
