//! Shared helpers for command handlers.

use std::io::IsTerminal;

use posmon_core::{ActionPayload, ActionResult, Monitor};

use crate::commands::Ctx;
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Resolve a device id or friendly name against the agent's current view.
///
/// With `force`, the query is sent verbatim when it cannot be resolved
/// (including when the status fetch itself fails).
pub async fn resolve_device_id(
    monitor: &Monitor,
    query: &str,
    force: bool,
) -> Result<String, CliError> {
    match monitor.fetch_status().await {
        Ok(snapshot) => match snapshot.resolve(query) {
            Ok(device) => Ok(device.id().to_owned()),
            Err(_) if force => Ok(query.to_owned()),
            Err(e) => Err(e.into()),
        },
        Err(e) if force => {
            tracing::debug!(error = %e, "status unavailable, sending device id as given");
            Ok(query.to_owned())
        }
        Err(e) => Err(e.into()),
    }
}

/// Report an action outcome on stderr and turn failures into `CliError`.
pub fn finish(result: ActionResult, ctx: &Ctx) -> Result<Option<ActionPayload>, CliError> {
    if result.is_success() && !ctx.quiet {
        eprintln!("{}", result.notification());
    }
    result.into_result().map_err(CliError::from)
}
