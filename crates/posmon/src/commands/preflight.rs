//! `posmon preflight`: ask the agent to re-check every device now.

use posmon_core::{ActionPayload, Monitor};

use crate::cli::PreflightArgs;
use crate::commands::{Ctx, status, util};
use crate::error::CliError;
use crate::output;

pub async fn handle(monitor: &Monitor, args: PreflightArgs, ctx: &Ctx) -> Result<(), CliError> {
    let result = monitor.dispatcher().preflight().await;
    let Some(ActionPayload::Readiness(readiness)) = util::finish(result, ctx)? else {
        return Ok(());
    };

    output::print_output(
        &status::render(&readiness.snapshot, ctx.format, ctx.color),
        ctx.quiet,
    );

    if args.check && !readiness.level.is_green() {
        return Err(CliError::NotReady {
            level: readiness.level,
        });
    }
    Ok(())
}
