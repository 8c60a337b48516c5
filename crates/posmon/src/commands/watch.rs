//! `posmon watch`: background poller feeding a live readiness log.

use chrono::{DateTime, Local, Utc};
use futures_util::StreamExt;
use serde::Serialize;

use posmon_core::{Monitor, OverallLevel, PollState, StatusSnapshot};

use crate::cli::{OutputFormat, WatchArgs};
use crate::commands::{Ctx, status};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct PollEvent<'a> {
    tick: u64,
    level: OverallLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a StatusSnapshot>,
}

impl<'a> From<&'a PollState> for PollEvent<'a> {
    fn from(s: &'a PollState) -> Self {
        Self {
            tick: s.tick,
            level: s.level,
            at: s.updated_at,
            error: s.error.as_ref().map(ToString::to_string),
            snapshot: s.snapshot.as_deref(),
        }
    }
}

fn stamp(state: &PollState) -> String {
    state
        .updated_at
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// One line per poll; the full device view whenever the level changes.
fn render_poll(state: &PollState, changed: bool, ctx: &Ctx) -> String {
    let event = PollEvent::from(state);
    match ctx.format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::render_single(OutputFormat::JsonCompact, &event, |_| String::new(), |_| String::new())
        }
        OutputFormat::Plain => {
            let mut lines = vec![format!("{} {}", stamp(state), state.level)];
            if changed {
                lines.extend(state.summary_lines());
            }
            lines.join("\n")
        }
        OutputFormat::Table => {
            let mut out = format!("[{}] {}", stamp(state), output::paint_level(state.level, ctx.color));
            match (&state.snapshot, &state.error) {
                (_, Some(e)) => out.push_str(&format!("  {}", e.short_reason())),
                (Some(snapshot), None) if changed => {
                    out.push('\n');
                    out.push_str(&status::render(snapshot, OutputFormat::Table, ctx.color));
                }
                (Some(snapshot), None) => out.push_str(&format!("  {} devices", snapshot.len())),
                (None, None) => {}
            }
            out
        }
    }
}

pub async fn handle(monitor: &Monitor, args: WatchArgs, ctx: &Ctx) -> Result<(), CliError> {
    let poller = monitor.start_poller();
    let mut states = poller.stream();
    let mut last_level: Option<OverallLevel> = None;
    let mut seen: u64 = 0;

    if !ctx.quiet {
        eprintln!(
            "Watching {} every {}s (Ctrl-C to stop)",
            monitor.config().url,
            monitor.config().effective_poll_interval().as_secs_f64()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let state = tokio::select! {
            _ = &mut ctrl_c => break,
            next = states.next() => match next {
                Some(state) => state,
                None => break,
            },
        };
        if !state.has_polled() {
            continue;
        }

        let changed = last_level != Some(state.level);
        last_level = Some(state.level);
        output::print_output(&render_poll(&state, changed, ctx), ctx.quiet);

        seen += 1;
        if args.count.is_some_and(|n| seen >= n) {
            break;
        }
    }

    // Nothing is shown after this point, so in-flight polls are dropped.
    poller.abort().await;
    Ok(())
}

