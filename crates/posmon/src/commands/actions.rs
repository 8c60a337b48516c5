//! Device and agent maintenance actions: recycle, restart-service,
//! rescan, policy-reload.

use posmon_core::Monitor;

use crate::cli::DeviceArgs;
use crate::commands::{Ctx, util};
use crate::error::CliError;

pub async fn recycle(monitor: &Monitor, args: DeviceArgs, ctx: &Ctx) -> Result<(), CliError> {
    let device_id = util::resolve_device_id(monitor, &args.device, args.force).await?;
    if !util::confirm(
        &format!("Recycle device '{device_id}'? It will be unavailable while it resets"),
        "recycle",
        ctx.yes,
    )? {
        return Ok(());
    }

    let result = monitor.dispatcher().recycle_device(&device_id).await;
    util::finish(result, ctx)?;
    Ok(())
}

pub async fn restart_service(
    monitor: &Monitor,
    args: DeviceArgs,
    ctx: &Ctx,
) -> Result<(), CliError> {
    let device_id = util::resolve_device_id(monitor, &args.device, args.force).await?;
    if !util::confirm(
        &format!("Restart the driver service for '{device_id}'?"),
        "restart-service",
        ctx.yes,
    )? {
        return Ok(());
    }

    let result = monitor.dispatcher().restart_service(&device_id).await;
    util::finish(result, ctx)?;
    Ok(())
}

pub async fn rescan(monitor: &Monitor, ctx: &Ctx) -> Result<(), CliError> {
    let result = monitor.dispatcher().rescan().await;
    util::finish(result, ctx)?;
    Ok(())
}

pub async fn reload_policy(monitor: &Monitor, ctx: &Ctx) -> Result<(), CliError> {
    if !util::confirm("Reload the device policy on the agent?", "policy-reload", ctx.yes)? {
        return Ok(());
    }
    let result = monitor.dispatcher().reload_policy().await;
    util::finish(result, ctx)?;
    Ok(())
}
