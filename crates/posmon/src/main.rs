mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use posmon_core::Monitor;

use crate::cli::{Cli, Command};
use crate::commands::Ctx;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the agent
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "posmon", &mut std::io::stdout());
            Ok(())
        }

        // All other commands talk to the agent
        cmd => {
            let cfg = config::load_config_or_default();
            let (mut monitor_config, _key_source) =
                config::resolve_monitor_config(&cfg, &cli.global)?;
            if let Command::Watch(ref args) = cmd {
                monitor_config = config::with_interval(monitor_config, args.interval)?;
            }
            let monitor = Monitor::new(monitor_config)?;
            let ctx = Ctx::new(cfg, &cli.global);

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &monitor, &ctx).await
        }
    }
}
