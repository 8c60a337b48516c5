#![allow(dead_code, clippy::unwrap_used)]
// Shared fixtures for posmon-core integration tests.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

use posmon_core::{Monitor, MonitorConfig};

pub fn monitor_for(server: &MockServer) -> Monitor {
    monitor_with(server, |_| {})
}

pub fn monitor_with(server: &MockServer, tweak: impl FnOnce(&mut MonitorConfig)) -> Monitor {
    let mut config = MonitorConfig {
        url: Url::parse(&server.uri()).unwrap(),
        api_key: Some(SecretString::from("test-key".to_string())),
        timeout: Duration::from_secs(2),
        export_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(200),
    };
    tweak(&mut config);
    Monitor::new(config).unwrap()
}

/// A status document with one entry per `(id, friendly, state, port)`.
pub fn status_doc(devices: &[(&str, &str, &str, Option<&str>)]) -> Value {
    let status: serde_json::Map<String, Value> = devices
        .iter()
        .map(|(id, friendly, state, port)| {
            (
                (*id).to_string(),
                json!({
                    "state": state,
                    "record": { "friendly": friendly, "com_port": port },
                    "timeouts": 0,
                    "backoff_s": 0,
                    "last_probe_ts": 0.0,
                    "last_action_ts": 0.0
                }),
            )
        })
        .collect();
    json!({ "status": status, "ts": 1_700_000_000_000_i64 })
}
