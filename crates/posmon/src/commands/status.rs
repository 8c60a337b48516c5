//! `posmon status`: one-shot readiness view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use posmon_core::{DeviceStatus, HealthCounts, Monitor, OverallLevel, StatusSnapshot};

use crate::cli::{OutputFormat, StatusArgs};
use crate::commands::Ctx;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Device")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Timeouts")]
    timeouts: String,
    #[tabled(rename = "Last action")]
    last_action: String,
}

impl DeviceRow {
    pub(crate) fn new(d: &DeviceStatus, color: bool) -> Self {
        Self {
            id: d.record.id.clone(),
            name: d.record.friendly.clone(),
            state: output::paint_state(d.state, color),
            port: d.record.com_port.clone().unwrap_or_else(|| "-".into()),
            role: d.record.role.clone().unwrap_or_else(|| "-".into()),
            timeouts: d
                .runtime
                .timeouts
                .map_or_else(|| "-".into(), |n| n.to_string()),
            last_action: d.runtime.last_action.map_or_else(|| "-".into(), short_time),
        }
    }
}

fn short_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Report ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct StatusReport<'a> {
    level: OverallLevel,
    counts: HealthCounts,
    #[serde(flatten)]
    snapshot: &'a StatusSnapshot,
}

pub(crate) fn header(level: OverallLevel, counts: HealthCounts, color: bool) -> String {
    format!(
        "Readiness: {}  ({} devices: {} healthy, {} warning, {} critical)",
        output::paint_level(level, color),
        counts.total,
        counts.healthy,
        counts.warning,
        counts.critical,
    )
}

/// Render a snapshot with its readiness level in the selected format.
pub(crate) fn render(snapshot: &StatusSnapshot, format: OutputFormat, color: bool) -> String {
    let report = StatusReport {
        level: snapshot.level(),
        counts: HealthCounts::of(snapshot),
        snapshot,
    };
    output::render_single(
        format,
        &report,
        |r| {
            let head = header(r.level, r.counts, color);
            if r.snapshot.is_empty() {
                return format!("{head}\nNo devices reported.");
            }
            let rows: Vec<DeviceRow> = r.snapshot.iter().map(|d| DeviceRow::new(d, color)).collect();
            let mut out = format!("{head}\n{}", output::render_table(&rows));
            for d in r.snapshot.iter() {
                if let Some(ref issue) = d.issue {
                    out.push_str(&format!("\n! {}: {issue}", d.record.label()));
                }
            }
            out
        },
        |r| {
            std::iter::once(r.level.to_string())
                .chain(r.snapshot.summary_lines())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

pub async fn handle(monitor: &Monitor, args: StatusArgs, ctx: &Ctx) -> Result<(), CliError> {
    let snapshot = monitor.fetch_status().await?;
    let level = snapshot.level();

    output::print_output(&render(&snapshot, ctx.format, ctx.color), ctx.quiet);

    if args.check && !level.is_green() {
        return Err(CliError::NotReady { level });
    }
    Ok(())
}
