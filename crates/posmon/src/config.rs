//! CLI configuration -- thin wrapper around `posmon_config`.
//!
//! Adds the `GlobalOpts` overrides (--url, --api-key, --timeout, ...) on
//! top of the file + environment layers.

use std::time::Duration;

use clap::ValueEnum;

use posmon_config::Config;
use posmon_core::MonitorConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use posmon_config::{KeySource, config_path, load_config_or_default};

/// Translate file config + global flags into a `MonitorConfig`.
///
/// Flags win over environment and file values.
pub fn resolve_monitor_config(
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(MonitorConfig, KeySource), CliError> {
    let mut effective = cfg.clone();
    if let Some(ref url) = global.url {
        effective.service.url.clone_from(url);
    }
    if let Some(secs) = global.timeout {
        effective.service.timeout = secs;
    }

    let (api_key, source) =
        posmon_config::resolve_api_key(global.api_key.as_deref(), &effective.service);
    let monitor = posmon_config::to_monitor_config(&effective, api_key)?;

    tracing::debug!(url = %monitor.url, key_source = %source, "resolved agent configuration");
    Ok((monitor, source))
}

/// Apply a `--interval` override to the poll period.
pub fn with_interval(mut monitor: MonitorConfig, secs: Option<u64>) -> Result<MonitorConfig, CliError> {
    if let Some(secs) = secs {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        monitor.poll_interval = Duration::from_secs(secs);
    }
    Ok(monitor)
}

/// Output format: flag, then config, then table.
pub fn output_format(cfg: &Config, global: &GlobalOpts) -> OutputFormat {
    global
        .output
        .or_else(|| <OutputFormat as ValueEnum>::from_str(&cfg.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

/// Color mode: flag, then config, then auto.
pub fn color_mode(cfg: &Config, global: &GlobalOpts) -> ColorMode {
    global
        .color
        .or_else(|| <ColorMode as ValueEnum>::from_str(&cfg.defaults.color, true).ok())
        .unwrap_or(ColorMode::Auto)
}
