// Status snapshot parsing
//
// Shape of the agent document:
//
//   { "status": { "<id>": { "state": "OK", "record": { "friendly": ..,
//     "com_port": .. }, "timeouts": 0, "backoff_s": 0, .. } }, "ts": <ms> }
//
// Only `status` being an object is fatal. Everything below it is read
// per entry, and an entry that does not fit becomes `Unknown`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::device::{DeviceRecord, DeviceState, DeviceStatus, RuntimeCounters};
use crate::error::CoreError;

/// The status document as a whole was unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("status document is not a JSON object")]
    NotAnObject,
    #[error("status document has no `status` field")]
    MissingStatus,
    #[error("`status` field is not a JSON object")]
    StatusNotAnObject,
}

/// Point-in-time view of every device the agent manages, keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    devices: BTreeMap<String, DeviceStatus>,
    /// Agent-side timestamp, when the document carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    service_ts: Option<DateTime<Utc>>,
    received_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Parse an agent status document.
    pub fn parse(doc: &Value) -> Result<Self, ParseError> {
        let root = doc.as_object().ok_or(ParseError::NotAnObject)?;
        let status = root
            .get("status")
            .ok_or(ParseError::MissingStatus)?
            .as_object()
            .ok_or(ParseError::StatusNotAnObject)?;

        let devices = status
            .iter()
            .map(|(id, entry)| (id.clone(), parse_entry(id, entry)))
            .collect();

        let service_ts = root
            .get("ts")
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis);

        Ok(Self {
            devices,
            service_ts,
            received_at: Utc::now(),
        })
    }

    /// Build a snapshot from already-typed entries.
    pub fn from_devices(devices: impl IntoIterator<Item = DeviceStatus>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.record.id.clone(), d))
                .collect(),
            service_ts: None,
            received_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&DeviceStatus> {
        self.devices.get(id)
    }

    /// Devices in id order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceStatus> {
        self.devices.values()
    }

    pub fn states(&self) -> impl Iterator<Item = DeviceState> + '_ {
        self.devices.values().map(|d| d.state)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn service_ts(&self) -> Option<DateTime<Utc>> {
        self.service_ts
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// One operator-facing line per device, in id order.
    pub fn summary_lines(&self) -> Vec<String> {
        self.iter().map(DeviceStatus::summary_line).collect()
    }

    /// Devices whose friendly name matches `name`, ignoring case.
    pub fn find_by_friendly<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a DeviceStatus> {
        self.iter()
            .filter(move |d| d.record.friendly.eq_ignore_ascii_case(name))
    }

    /// Resolve an operator-supplied device reference: an exact id first,
    /// then a unique case-insensitive friendly name.
    pub fn resolve(&self, query: &str) -> Result<&DeviceStatus, CoreError> {
        if let Some(device) = self.get(query) {
            return Ok(device);
        }

        let matches: Vec<&DeviceStatus> = self.find_by_friendly(query.trim()).collect();
        match matches.as_slice() {
            [device] => Ok(*device),
            [] => Err(CoreError::DeviceNotFound {
                query: query.to_owned(),
                candidates: self.iter().map(|d| d.record.label()).collect(),
            }),
            ambiguous => Err(CoreError::DeviceNotFound {
                query: query.to_owned(),
                candidates: ambiguous.iter().map(|d| d.record.label()).collect(),
            }),
        }
    }
}

impl<'a> IntoIterator for &'a StatusSnapshot {
    type Item = &'a DeviceStatus;
    type IntoIter = std::collections::btree_map::Values<'a, String, DeviceStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.values()
    }
}

// ── Per-entry parsing ────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireEntry {
    state: String,
    record: WireRecord,
    #[serde(default, deserialize_with = "lenient")]
    timeouts: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    backoff_s: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    last_probe_ts: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    last_action_ts: Option<f64>,
}

#[derive(Deserialize)]
struct WireRecord {
    friendly: String,
    #[serde(default, deserialize_with = "lenient")]
    com_port: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    vid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    role: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    critical: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    hub_path: Option<String>,
}

/// Accept any JSON value, keeping it only if it has the expected type.
/// Auxiliary fields must never make an entry `Unknown`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn parse_entry(id: &str, raw: &Value) -> DeviceStatus {
    let wire = match WireEntry::deserialize(raw) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::debug!(device_id = id, error = %e, "unreadable status entry");
            return DeviceStatus::unknown(salvage_record(id, raw), format!("unreadable entry: {e}"));
        }
    };

    let record = DeviceRecord {
        id: id.to_owned(),
        friendly: wire.record.friendly,
        com_port: wire.record.com_port.filter(|p| !p.trim().is_empty()),
        vid: wire.record.vid,
        pid: wire.record.pid,
        role: wire.record.role,
        critical: wire.record.critical,
        hub_path: wire.record.hub_path,
    };
    let runtime = RuntimeCounters {
        timeouts: wire.timeouts,
        backoff_secs: wire.backoff_s,
        last_probe: wire.last_probe_ts.and_then(epoch_secs),
        last_action: wire.last_action_ts.and_then(epoch_secs),
    };

    let state = DeviceState::from_wire(&wire.state);
    let issue = (state == DeviceState::Unknown && !wire.state.eq_ignore_ascii_case("UNKNOWN"))
        .then(|| format!("unrecognized state {:?}", wire.state));

    DeviceStatus {
        record,
        state,
        runtime,
        issue,
    }
}

/// Keep whatever identity is still readable from a broken entry.
fn salvage_record(id: &str, raw: &Value) -> DeviceRecord {
    let mut record = DeviceRecord::bare(id);
    if let Some(friendly) = raw
        .pointer("/record/friendly")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        record.friendly = friendly.to_owned();
    }
    record.com_port = raw
        .pointer("/record/com_port")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned);
    record
}

/// Agent timestamps are float epoch seconds; `0` means "never".
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0) as i64)
}
