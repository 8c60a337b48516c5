// ── Background status poller ──
//
// Fixed-period refresh of the agent status. Each tick is spawned as its
// own task carrying a monotonically increasing tick number, so a slow
// request never delays the next one. Results go through a `watch`
// channel and a result is only published if its tick is newer than the
// one already there: an older tick finishing late is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use posmon_api::AgentClient;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::MIN_POLL_INTERVAL;
use crate::error::CoreError;
use crate::health::OverallLevel;
use crate::model::StatusSnapshot;
use crate::monitor::fetch_snapshot;

/// Latest published poll outcome.
#[derive(Debug, Clone)]
pub struct PollState {
    /// Tick number that produced this state. `0` before the first poll.
    pub tick: u64,
    pub level: OverallLevel,
    /// `None` when the last poll failed or no poll has completed.
    pub snapshot: Option<Arc<StatusSnapshot>>,
    /// Why the last poll produced no snapshot.
    pub error: Option<Arc<CoreError>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PollState {
    fn initial() -> Self {
        Self {
            tick: 0,
            level: OverallLevel::from_snapshot(None),
            snapshot: None,
            error: None,
            updated_at: None,
        }
    }

    fn from_outcome(tick: u64, outcome: Result<StatusSnapshot, CoreError>) -> Self {
        let (snapshot, error) = match outcome {
            Ok(snapshot) => (Some(Arc::new(snapshot)), None),
            Err(e) => (None, Some(Arc::new(e))),
        };
        Self {
            tick,
            level: OverallLevel::from_snapshot(snapshot.as_deref()),
            snapshot,
            error,
            updated_at: Some(Utc::now()),
        }
    }

    /// Whether at least one poll has completed.
    pub fn has_polled(&self) -> bool {
        self.tick > 0
    }

    /// Per-device summary lines of the latest snapshot; empty if none.
    pub fn summary_lines(&self) -> Vec<String> {
        self.snapshot
            .as_deref()
            .map(StatusSnapshot::summary_lines)
            .unwrap_or_default()
    }
}

/// Publish `next` unless a state from the same or a later tick is already
/// there. Returns whether it was published.
fn publish(state: &watch::Sender<PollState>, next: PollState) -> bool {
    state.send_if_modified(|current| {
        if next.tick <= current.tick {
            debug!(
                stale_tick = next.tick,
                current_tick = current.tick,
                "discarding stale poll result"
            );
            return false;
        }
        if next.level != current.level {
            info!(from = %current.level, to = %next.level, tick = next.tick, "overall level changed");
        }
        *current = next;
        true
    })
}

// ── Poller ───────────────────────────────────────────────────────────

/// Periodic status refresher. Configure, then [`spawn`](Self::spawn).
pub struct Poller {
    client: AgentClient,
    period: Duration,
}

impl Poller {
    /// `period` is clamped to [`MIN_POLL_INTERVAL`].
    pub fn new(client: AgentClient, period: Duration) -> Self {
        Self {
            client,
            period: period.max(MIN_POLL_INTERVAL),
        }
    }

    /// Start polling on the current Tokio runtime. The first tick fires
    /// immediately.
    pub fn spawn(self) -> PollerHandle {
        let (tx, _rx) = watch::channel(PollState::initial());
        let state = Arc::new(tx);
        // `cancel` abandons in-flight polls; its child `stop` only ends ticking.
        let cancel = CancellationToken::new();
        let stop = cancel.child_token();
        let poke = Arc::new(Notify::new());

        let task = tokio::spawn(poll_loop(
            self.client,
            self.period,
            Arc::clone(&state),
            Arc::clone(&poke),
            stop.clone(),
            cancel.clone(),
        ));

        PollerHandle {
            state,
            stop,
            cancel,
            poke,
            task: Some(task),
        }
    }
}

async fn poll_loop(
    client: AgentClient,
    period: Duration,
    state: Arc<watch::Sender<PollState>>,
    poke: Arc<Notify>,
    stop: CancellationToken,
    cancel: CancellationToken,
) {
    let tracker = TaskTracker::new();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;

    debug!(period_ms = period.as_millis(), "poller started");

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            () = poke.notified() => interval.reset(),
            _ = interval.tick() => {}
        }

        tick += 1;
        tracker.spawn(poll_once(
            client.clone(),
            Arc::clone(&state),
            tick,
            cancel.clone(),
        ));
    }

    tracker.close();
    tracker.wait().await;
    debug!(ticks = tick, "poller stopped");
}

async fn poll_once(
    client: AgentClient,
    state: Arc<watch::Sender<PollState>>,
    tick: u64,
    cancel: CancellationToken,
) {
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        outcome = fetch_snapshot(&client) => outcome,
    };

    if let Err(ref e) = outcome {
        warn!(tick, error = %e, "status poll failed, reporting RED");
    }
    publish(&state, PollState::from_outcome(tick, outcome));
}

// ── Handle ───────────────────────────────────────────────────────────

/// Owner handle for a running poller. Dropping it aborts polling.
pub struct PollerHandle {
    state: Arc<watch::Sender<PollState>>,
    stop: CancellationToken,
    cancel: CancellationToken,
    poke: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Latest overall level. RED until the first poll completes.
    pub fn level(&self) -> OverallLevel {
        self.state.borrow().level
    }

    /// Full copy of the latest published state.
    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Latest snapshot, if the last poll produced one.
    pub fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.state.borrow().summary_lines()
    }

    /// Receiver notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Published states as a `Stream`, starting with the current one.
    pub fn stream(&self) -> WatchStream<PollState> {
        WatchStream::new(self.state.subscribe())
    }

    /// Fire a tick now instead of waiting for the period, e.g. after an
    /// operator action changed device state.
    pub fn refresh_now(&self) {
        self.poke.notify_one();
    }

    /// Stop scheduling ticks and wait for outstanding ones to complete
    /// or fail. Their results are still published.
    pub async fn shutdown(mut self) {
        self.stop.cancel();
        self.join().await;
    }

    /// Stop ticking and abandon in-flight requests.
    pub async fn abort(mut self) {
        self.cancel.cancel();
        self.join().await;
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
