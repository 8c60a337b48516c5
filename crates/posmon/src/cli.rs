//! Clap derive structures for the `posmon` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// posmon -- health and recovery for SmartPOS USB peripherals
#[derive(Debug, Parser)]
#[command(
    name = "posmon",
    version,
    about = "Monitor and operate SmartPOS USB peripherals",
    long_about = "Talks to the local SmartPOS USB agent: shows scanner, printer and \
        payment-terminal health as a GREEN / YELLOW / RED readiness level, and runs \
        operator actions such as preflight checks, device recycles and diagnostic exports.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Agent base URL (overrides config)
    #[arg(long, short = 'u', env = "POSMON_URL", global = true)]
    pub url: Option<String>,

    /// API key for actions (overrides env, keyring and config)
    #[arg(long, env = "POSMON_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "POSMON_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "POSMON_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one line per device (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the readiness level and per-device state
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Poll continuously and report readiness changes
    Watch(WatchArgs),

    /// Ask the agent to re-check every device now
    Preflight(PreflightArgs),

    /// Reset and reinitialize one device
    Recycle(DeviceArgs),

    /// Restart the driver service bound to one device
    RestartService(DeviceArgs),

    /// Re-enumerate attached USB devices
    Rescan,

    /// Reload the agent's device policy
    PolicyReload,

    /// Download a diagnostic archive
    Export(ExportArgs),

    /// Manage posmon configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Exit with code 9 unless the level is GREEN
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between polls (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Stop after this many polls
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

#[derive(Debug, Args)]
pub struct PreflightArgs {
    /// Exit with code 9 unless the level is GREEN
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device id or friendly name
    pub device: String,

    /// Send the id as given even if the agent does not list it
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Categories to include: db, logs, traces [default: from config, else db,logs]
    #[arg(long, short = 'm')]
    pub mask: Option<String>,

    /// Output file [default: from config, else Downloads/smartpos_usb_export.zip]
    #[arg(long = "out", short = 'O')]
    pub out: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Print the config file location
    Path,

    /// Show the effective configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key (url, api_key_env, timeout, export_timeout, interval, mask, export_path, output, color)
        key: String,
        /// Value
        value: String,
    },

    /// Store the API key in the system keyring
    SetKey,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
