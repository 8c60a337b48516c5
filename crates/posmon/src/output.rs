//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use posmon_core::{DeviceState, OverallLevel};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ───────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Readiness level in traffic-light colors.
pub fn paint_level(level: OverallLevel, color: bool) -> String {
    if !color {
        return level.to_string();
    }
    match level {
        OverallLevel::Green => level.green().bold().to_string(),
        OverallLevel::Yellow => level.yellow().bold().to_string(),
        OverallLevel::Red => level.red().bold().to_string(),
    }
}

pub fn paint_state(state: DeviceState, color: bool) -> String {
    if !color {
        return state.to_string();
    }
    match state {
        DeviceState::Ok => state.green().to_string(),
        DeviceState::Degraded | DeviceState::Recovering => state.yellow().to_string(),
        DeviceState::Failed | DeviceState::Unknown => state.red().to_string(),
    }
}

// ── Render dispatchers ──────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => line_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ───────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    if compact {
        serde_json::to_string(data).expect("serialization should not fail")
    } else {
        serde_json::to_string_pretty(data).expect("serialization should not fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        name: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: &'static str,
    }

    #[test]
    fn single_item_in_each_format() {
        let item = Item { name: "scanner" };
        let render = |format| {
            render_single(format, &item, |i| format!("Name: {}", i.name), |i| i.name.to_owned())
        };
        assert_eq!(render(OutputFormat::Table), "Name: scanner");
        assert_eq!(render(OutputFormat::Plain), "scanner");
        assert_eq!(render(OutputFormat::JsonCompact), r#"{"name":"scanner"}"#);
        assert!(render(OutputFormat::Json).contains("\n"));
    }

    #[test]
    fn table_has_header() {
        let table = render_table(&[Row { name: "scanner" }]);
        assert!(table.contains("Name"));
        assert!(table.contains("scanner"));
    }

    #[test]
    fn uncolored_level_is_plain_text() {
        assert_eq!(paint_level(OverallLevel::Red, false), "RED");
        assert!(paint_level(OverallLevel::Green, true).contains("GREEN"));
        assert_eq!(paint_state(DeviceState::Recovering, false), "RECOVERING");
    }
}
