// ── Monitor facade ──
//
// Owns the configuration and the shared agent client. Cheaply cloneable;
// the poller and the dispatcher share one connection pool.

use std::sync::Arc;

use posmon_api::AgentClient;
use tracing::debug;

use crate::config::MonitorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::health::OverallLevel;
use crate::model::StatusSnapshot;
use crate::poller::{Poller, PollerHandle};

/// Fetch and parse the current status document.
pub(crate) async fn fetch_snapshot(client: &AgentClient) -> Result<StatusSnapshot, CoreError> {
    let doc = client.get_status().await?;
    let snapshot = StatusSnapshot::parse(&doc)?;
    debug!(devices = snapshot.len(), "status snapshot received");
    Ok(snapshot)
}

/// Entry point for consumers of the core crate.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    client: AgentClient,
    dispatcher: Dispatcher,
}

impl Monitor {
    /// Build the HTTP client for `config`. Makes no requests.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        let client = AgentClient::new(
            config.url.clone(),
            config.api_key.as_ref(),
            &config.transport(),
        )?;
        let dispatcher = Dispatcher::new(client.clone());

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                client,
                dispatcher,
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &AgentClient {
        &self.inner.client
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// One-shot status read.
    pub async fn fetch_status(&self) -> Result<StatusSnapshot, CoreError> {
        fetch_snapshot(&self.inner.client).await
    }

    /// One-shot overall level. Never fails: an unreadable agent is RED.
    pub async fn overall_level(&self) -> OverallLevel {
        match self.fetch_status().await {
            Ok(snapshot) => snapshot.level(),
            Err(e) => {
                debug!(error = %e, "status unavailable");
                OverallLevel::Red
            }
        }
    }

    /// Start a background poller at the configured interval.
    pub fn start_poller(&self) -> PollerHandle {
        Poller::new(
            self.inner.client.clone(),
            self.inner.config.effective_poll_interval(),
        )
        .spawn()
    }
}
