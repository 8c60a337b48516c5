// SmartPOS USB agent HTTP client
//
// Wraps `reqwest::Client` with agent URL construction, optional API key
// injection on POSTs, and status-code handling. Every method makes exactly
// one request -- retry policy belongs to the caller.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::ActionAck;
use crate::transport::TransportConfig;

/// Header the agent checks on every POST endpoint.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Raw HTTP client for the agent's local API.
///
/// Cheaply cloneable; clones share the underlying connection pool, so the
/// poller and on-demand commands can each hold one.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: Url,
    /// Sent only on POST requests. Marked sensitive so it never shows up
    /// in `Debug` output of requests or headers.
    api_key: Option<HeaderValue>,
    export_timeout: Option<Duration>,
}

impl AgentClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the agent root, e.g. `http://127.0.0.1:8765`.
    pub fn new(
        base_url: Url,
        api_key: Option<&SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, base_url, api_key)?;
        client.export_timeout = Some(transport.export_timeout);
        Ok(client)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        api_key: Option<&SecretString>,
    ) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(base_url.to_string()));
        }

        let api_key = api_key
            .map(|key| key.expose_secret().trim())
            .filter(|key| !key.is_empty())
            .map(|key| {
                let mut value =
                    HeaderValue::from_str(key).map_err(|e| Error::InvalidApiKey(e.to_string()))?;
                value.set_sensitive(true);
                Ok::<_, Error>(value)
            })
            .transpose()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            export_timeout: None,
        })
    }

    /// The agent base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether POST requests carry an API key.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL, percent-encoding each one.
    ///
    /// A device id like `USB\VID_0C2E&PID_0B61` becomes a single segment,
    /// never a path traversal. Empty, `.` and `..` segments are refused.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        if let Some(bad) = segments
            .iter()
            .find(|s| matches!(**s, "" | "." | ".."))
        {
            return Err(Error::InvalidPathSegment((*bad).to_owned()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json(&self, url: Url) -> Result<Value, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let resp = check_status(resp).await?;
        decode_json(resp).await
    }

    /// Send a POST with an empty JSON object body and the API key, if any.
    async fn post(
        &self,
        url: Url,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, Error> {
        debug!(authenticated = self.api_key.is_some(), "POST {url}");

        let mut builder = self.http.post(url).json(&serde_json::json!({}));
        if let Some(ref key) = self.api_key {
            builder = builder.header(API_KEY_HEADER, key.clone());
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        check_status(resp).await
    }

    async fn post_ack(&self, url: Url) -> Result<ActionAck, Error> {
        let resp = self.post(url, None).await?;
        let body = resp.text().await?;
        trace!(body = %preview(&body), "action response");
        Ok(ActionAck::from_body(&body))
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the current device snapshot.
    ///
    /// `GET /api/status` -- unauthenticated. Returns the decoded JSON
    /// document; shape validation is left to the caller.
    pub async fn get_status(&self) -> Result<Value, Error> {
        let url = self.endpoint(&["api", "status"])?;
        self.get_json(url).await
    }

    /// Ask the agent to re-evaluate every device and return a fresh snapshot.
    ///
    /// `POST /api/preflight`
    pub async fn preflight(&self) -> Result<Value, Error> {
        let url = self.endpoint(&["api", "preflight"])?;
        let resp = self.post(url, None).await?;
        decode_json(resp).await
    }

    /// Reset and reinitialize one device.
    ///
    /// `POST /api/action/device/{id}/recycle`
    pub async fn recycle_device(&self, device_id: &str) -> Result<ActionAck, Error> {
        let url = self.endpoint(&["api", "action", "device", device_id, "recycle"])?;
        debug!(device_id, "recycling device");
        self.post_ack(url).await
    }

    /// Restart the driver/service bound to one device.
    ///
    /// `POST /api/action/service/{id}/restart`
    pub async fn restart_service(&self, device_id: &str) -> Result<ActionAck, Error> {
        let url = self.endpoint(&["api", "action", "service", device_id, "restart"])?;
        debug!(device_id, "restarting device service");
        self.post_ack(url).await
    }

    /// Re-enumerate attached USB devices.
    ///
    /// `POST /api/action/rescan`
    pub async fn rescan(&self) -> Result<ActionAck, Error> {
        let url = self.endpoint(&["api", "action", "rescan"])?;
        self.post_ack(url).await
    }

    /// Reload the agent's policy from its config file.
    ///
    /// `POST /api/policy/reload`
    pub async fn reload_policy(&self) -> Result<ActionAck, Error> {
        let url = self.endpoint(&["api", "policy", "reload"])?;
        self.post_ack(url).await
    }

    /// Download a diagnostic archive.
    ///
    /// `POST /api/export?mask={mask}` -- `mask` is a comma-separated list
    /// of categories (`db`, `logs`, `traces`). The body is returned
    /// untouched.
    pub async fn export(&self, mask: &str) -> Result<Bytes, Error> {
        let mut url = self.endpoint(&["api", "export"])?;
        url.query_pairs_mut().append_pair("mask", mask);

        let resp = self.post(url, self.export_timeout).await?;
        let bytes = resp.bytes().await?;
        debug!(mask, bytes = bytes.len(), "export downloaded");
        Ok(bytes)
    }
}

// ── Response handling ────────────────────────────────────────────────

/// Map non-2xx responses to typed errors, passing successes through.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Unauthorized {
            status: status.as_u16(),
        });
    }

    let body = resp.text().await.unwrap_or_default();
    let ack = ActionAck::from_body(&body);
    let message = ack.message().map_or_else(
        || {
            if body.is_empty() {
                status.to_string()
            } else {
                preview(&body).to_owned()
            }
        },
        str::to_owned,
    );

    Err(Error::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json(resp: reqwest::Response) -> Result<Value, Error> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> AgentClient {
        AgentClient::with_client(reqwest::Client::new(), base.parse().unwrap(), None).unwrap()
    }

    #[test]
    fn endpoint_joins_segments() {
        let c = client("http://127.0.0.1:8765");
        let url = c.endpoint(&["api", "status"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8765/api/status");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let c = client("http://127.0.0.1:8765/agent/");
        let url = c.endpoint(&["api", "status"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8765/agent/api/status");
    }

    #[test]
    fn endpoint_escapes_device_ids() {
        let c = client("http://127.0.0.1:8765");
        let url = c
            .endpoint(&["api", "action", "device", "USB\\VID 1/2", "recycle"])
            .unwrap();
        assert_eq!(
            url.path(),
            "/api/action/device/USB%5CVID%201%2F2/recycle"
        );
    }

    #[test]
    fn endpoint_refuses_dot_segments() {
        let c = client("http://127.0.0.1:8765");
        for id in ["", ".", ".."] {
            let result = c.endpoint(&["api", "action", "device", id, "recycle"]);
            assert!(
                matches!(result, Err(Error::InvalidPathSegment(ref s)) if s == id),
                "{id:?} -> {result:?}"
            );
        }
        // Dots inside an id are ordinary characters.
        let url = c.endpoint(&["api", "action", "device", "..scanner.", "recycle"]).unwrap();
        assert_eq!(url.path(), "/api/action/device/..scanner./recycle");
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let key: SecretString = "   ".to_string().into();
        let c = AgentClient::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:8765".parse().unwrap(),
            Some(&key),
        )
        .unwrap();
        assert!(!c.has_api_key());
    }

    #[test]
    fn rejects_non_hierarchical_base() {
        let result = AgentClient::with_client(
            reqwest::Client::new(),
            "mailto:ops@example.com".parse().unwrap(),
            None,
        );
        assert!(matches!(result, Err(Error::CannotBeABase(_))));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let body = "ж".repeat(150);
        let p = preview(&body);
        assert!(p.len() <= 200);
        assert!(body.starts_with(p));
    }
}
