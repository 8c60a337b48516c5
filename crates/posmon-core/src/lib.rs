//! Health rollup and command layer between `posmon-api` and presentation
//! consumers (CLI today, a tray shell tomorrow).
//!
//! - **Status model** ([`model`]): [`StatusSnapshot`] parsed from the
//!   agent's `/api/status` document. Malformed device entries degrade to
//!   [`DeviceState::Unknown`] instead of failing the whole snapshot.
//!
//! - **Health aggregator** ([`health`]): [`OverallLevel`] is a pure
//!   function of a snapshot (or its absence): any failed/unknown device is
//!   RED, any degraded/recovering device is YELLOW, otherwise GREEN.
//!
//! - **[`Poller`]**: periodic background refresh publishing a
//!   [`PollState`] through a `watch` channel. Every tick is its own task and
//!   the newest tick always wins over a slower, older one.
//!
//! - **[`Dispatcher`]**: one-shot operator commands (preflight, recycle,
//!   export, ...) returning an [`ActionResult`]. No automatic retries.
//!
//! - **[`Monitor`]**: facade that owns the configuration and the shared
//!   HTTP client and vends the two above.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod model;
pub mod monitor;
pub mod poller;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::MonitorConfig;
pub use dispatcher::{Action, ActionPayload, ActionResult, Dispatcher, Readiness};
pub use error::CoreError;
pub use health::{HealthCounts, OverallLevel, Severity};
pub use model::{DeviceRecord, DeviceState, DeviceStatus, ParseError, RuntimeCounters, StatusSnapshot};
pub use monitor::Monitor;
pub use poller::{PollState, Poller, PollerHandle};
