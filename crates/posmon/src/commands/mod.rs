//! Command dispatch: bridges CLI args -> monitor operations -> output formatting.

pub mod actions;
pub mod config_cmd;
pub mod export;
pub mod preflight;
pub mod status;
pub mod util;
pub mod watch;

use posmon_config::Config;
use posmon_core::Monitor;

use crate::cli::{ColorMode, Command, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Resolved presentation settings shared by every handler.
pub struct Ctx {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
    pub cfg: Config,
}

impl Ctx {
    pub fn new(cfg: Config, global: &GlobalOpts) -> Self {
        let color_mode: ColorMode = config::color_mode(&cfg, global);
        Self {
            format: config::output_format(&cfg, global),
            color: output::should_color(color_mode),
            quiet: global.quiet,
            yes: global.yes,
            cfg,
        }
    }
}

/// Dispatch an agent-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, monitor: &Monitor, ctx: &Ctx) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(monitor, args, ctx).await,
        Command::Watch(args) => watch::handle(monitor, args, ctx).await,
        Command::Preflight(args) => preflight::handle(monitor, args, ctx).await,
        Command::Recycle(args) => actions::recycle(monitor, args, ctx).await,
        Command::RestartService(args) => actions::restart_service(monitor, args, ctx).await,
        Command::Rescan => actions::rescan(monitor, ctx).await,
        Command::PolicyReload => actions::reload_policy(monitor, ctx).await,
        Command::Export(args) => export::handle(monitor, args, ctx).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
