// Device record and lifecycle state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Lifecycle state the agent reports for a device.
///
/// Any state string the agent sends that is not listed here parses to
/// [`DeviceState::Unknown`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum DeviceState {
    Ok,
    Degraded,
    Recovering,
    Failed,
    Unknown,
}

impl DeviceState {
    /// Parse a raw state string, coercing anything unrecognized to `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Unknown)
    }
}

/// Identity and descriptive metadata of one managed device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Map key in the status document; used verbatim in action URLs.
    pub id: String,
    /// Human-readable name shown to operators.
    pub friendly: String,
    /// Serial port or similar address, when the device has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub com_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    /// Policy role, e.g. `scanner` or `printer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_path: Option<String>,
}

impl DeviceRecord {
    /// Minimal record carrying only the id, used when the entry's own
    /// record could not be read.
    pub fn bare(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            friendly: id.clone(),
            id,
            com_port: None,
            vid: None,
            pid: None,
            role: None,
            critical: None,
            hub_path: None,
        }
    }

    /// `"{friendly} [{id}]"`, as shown in device pickers.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.friendly, self.id)
    }
}

/// Watchdog bookkeeping the agent keeps per device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeCounters {
    /// Consecutive probe timeouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<u64>,
    /// Current recovery backoff in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probe: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<DateTime<Utc>>,
}

/// One device's entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub record: DeviceRecord,
    pub state: DeviceState,
    #[serde(default, skip_serializing_if = "RuntimeCounters::is_empty")]
    pub runtime: RuntimeCounters,
    /// Why the entry was coerced to `Unknown`, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

impl RuntimeCounters {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl DeviceStatus {
    pub fn new(record: DeviceRecord, state: DeviceState) -> Self {
        Self {
            record,
            state,
            runtime: RuntimeCounters::default(),
            issue: None,
        }
    }

    /// An `Unknown` entry with the reason it could not be read.
    pub fn unknown(record: DeviceRecord, issue: impl Into<String>) -> Self {
        Self {
            record,
            state: DeviceState::Unknown,
            runtime: RuntimeCounters::default(),
            issue: Some(issue.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// `"{friendly} — {STATE} (COM={port})"`, dropping the suffix when the
    /// device has no address.
    pub fn summary_line(&self) -> String {
        match self.record.com_port {
            Some(ref port) => format!("{} — {} (COM={port})", self.record.friendly, self.state),
            None => format!("{} — {}", self.record.friendly, self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn state_round_trips_through_wire_names() {
        for state in DeviceState::iter() {
            assert_eq!(DeviceState::from_wire(state.as_ref()), state);
        }
        assert_eq!(DeviceState::Ok.to_string(), "OK");
    }

    #[test]
    fn unrecognized_state_is_unknown() {
        assert_eq!(DeviceState::from_wire("EXPLODED"), DeviceState::Unknown);
        assert_eq!(DeviceState::from_wire(""), DeviceState::Unknown);
        assert_eq!(DeviceState::from_wire("degraded"), DeviceState::Degraded);
    }

    #[test]
    fn ready_is_not_an_alias_for_ok() {
        assert_eq!(DeviceState::from_wire("READY"), DeviceState::Unknown);
        assert_eq!(DeviceState::from_wire("OK"), DeviceState::Ok);
    }

    #[test]
    fn summary_line_with_and_without_port() {
        let mut record = DeviceRecord::bare("printer-1");
        record.friendly = "Epson TM-T20".into();

        let status = DeviceStatus::new(record.clone(), DeviceState::Failed);
        assert_eq!(status.summary_line(), "Epson TM-T20 — FAILED");

        record.com_port = Some("COM5".into());
        let status = DeviceStatus::new(record, DeviceState::Ok);
        assert_eq!(status.summary_line(), "Epson TM-T20 — OK (COM=COM5)");
    }
}
