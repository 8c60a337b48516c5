// ── Status model ──
//
// Domain types for the agent's `/api/status` document. Parsing is
// tolerant per entry: one broken device must not hide the others.

mod device;
mod snapshot;

pub use device::{DeviceRecord, DeviceState, DeviceStatus, RuntimeCounters};
pub use snapshot::{ParseError, StatusSnapshot};
