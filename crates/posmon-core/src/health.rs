// ── Health aggregation ──
//
// Collapses a snapshot into one traffic-light level. Pure functions,
// no I/O. Precedence, first match wins:
//
//   no snapshot                      -> RED
//   any FAILED or UNKNOWN device     -> RED
//   any DEGRADED or RECOVERING       -> YELLOW
//   otherwise (including no devices) -> GREEN

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

use crate::model::{DeviceState, StatusSnapshot};

/// How much a single device state contributes to the overall level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

impl DeviceState {
    /// Severity class of this state. Total over every variant.
    pub fn severity(self) -> Severity {
        match self {
            Self::Ok => Severity::Healthy,
            Self::Degraded | Self::Recovering => Severity::Warning,
            Self::Failed | Self::Unknown => Severity::Critical,
        }
    }
}

/// Overall readiness of the terminal's peripherals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OverallLevel {
    Green,
    Yellow,
    Red,
}

impl OverallLevel {
    /// Level for an optional snapshot. `None` means the agent could not be
    /// read, which is always RED.
    pub fn from_snapshot(snapshot: Option<&StatusSnapshot>) -> Self {
        snapshot.map_or(Self::Red, |s| Self::from_states(s.states()))
    }

    /// Level for a collection of device states. Order does not matter.
    pub fn from_states(states: impl IntoIterator<Item = DeviceState>) -> Self {
        let mut warning = false;
        for state in states {
            match state.severity() {
                Severity::Critical => return Self::Red,
                Severity::Warning => warning = true,
                Severity::Healthy => {}
            }
        }
        if warning { Self::Yellow } else { Self::Green }
    }

    pub fn is_green(self) -> bool {
        self == Self::Green
    }
}

impl StatusSnapshot {
    /// Overall level of this snapshot.
    pub fn level(&self) -> OverallLevel {
        OverallLevel::from_snapshot(Some(self))
    }
}

/// Per-severity device counts, for status headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthCounts {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

impl HealthCounts {
    pub fn of(snapshot: &StatusSnapshot) -> Self {
        snapshot
            .states()
            .fold(Self::default(), |mut counts, state| {
                counts.total += 1;
                match state.severity() {
                    Severity::Healthy => counts.healthy += 1,
                    Severity::Warning => counts.warning += 1,
                    Severity::Critical => counts.critical += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceRecord, DeviceStatus};
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    fn snapshot(states: &[DeviceState]) -> StatusSnapshot {
        StatusSnapshot::from_devices(
            states
                .iter()
                .enumerate()
                .map(|(i, s)| DeviceStatus::new(DeviceRecord::bare(format!("dev-{i}")), *s)),
        )
    }

    #[test]
    fn absent_snapshot_is_red() {
        assert_eq!(OverallLevel::from_snapshot(None), OverallLevel::Red);
    }

    #[test]
    fn empty_snapshot_is_green() {
        assert_eq!(snapshot(&[]).level(), OverallLevel::Green);
    }

    #[test]
    fn precedence() {
        use DeviceState::{Degraded, Failed, Ok, Recovering, Unknown};

        assert_eq!(snapshot(&[Ok, Ok]).level(), OverallLevel::Green);
        assert_eq!(snapshot(&[Ok, Degraded]).level(), OverallLevel::Yellow);
        assert_eq!(snapshot(&[Recovering]).level(), OverallLevel::Yellow);
        assert_eq!(snapshot(&[Ok, Failed]).level(), OverallLevel::Red);
        assert_eq!(snapshot(&[Unknown]).level(), OverallLevel::Red);
        assert_eq!(snapshot(&[Degraded, Failed, Ok]).level(), OverallLevel::Red);
        assert_eq!(snapshot(&[Recovering, Unknown]).level(), OverallLevel::Red);
    }

    #[test]
    fn critical_state_anywhere_dominates() {
        for filler in DeviceState::iter() {
            for critical in [DeviceState::Failed, DeviceState::Unknown] {
                let mut states = vec![filler; 4];
                states.insert(2, critical);
                assert_eq!(OverallLevel::from_states(states), OverallLevel::Red);
            }
        }
    }

    #[test]
    fn level_is_order_independent() {
        use DeviceState::{Degraded, Ok, Recovering};

        let base = [Ok, Degraded, Ok, Recovering, Ok];
        let expected = OverallLevel::from_states(base);
        for rotation in 0..base.len() {
            let mut states = base;
            states.rotate_left(rotation);
            assert_eq!(OverallLevel::from_states(states), expected);
            states.reverse();
            assert_eq!(OverallLevel::from_states(states), expected);
        }
    }

    #[test]
    fn every_state_has_a_severity() {
        let classes: Vec<_> = DeviceState::iter().map(DeviceState::severity).collect();
        assert_eq!(classes.len(), 5);
        assert!(classes.contains(&Severity::Healthy));
        assert!(classes.contains(&Severity::Warning));
        assert!(classes.contains(&Severity::Critical));
    }

    #[test]
    fn counts() {
        use DeviceState::{Degraded, Failed, Ok, Unknown};

        let counts = HealthCounts::of(&snapshot(&[Ok, Ok, Degraded, Failed, Unknown]));
        assert_eq!(
            counts,
            HealthCounts {
                total: 5,
                healthy: 2,
                warning: 1,
                critical: 2,
            }
        );
    }

    #[test]
    fn level_names() {
        assert_eq!(OverallLevel::Yellow.to_string(), "YELLOW");
        assert_eq!("red".parse::<OverallLevel>().ok(), Some(OverallLevel::Red));
    }
}
