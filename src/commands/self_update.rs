// src/commands/self_update.rs

//! Update the update tool itself.
//!
//! The compatibility flag from the catalog is a hard gate: an incompatible
//! newer tool is reported and never downloaded, and the other commands that
//! run the implicit check abort rather than continue past it.

use std::fs;
use std::process::Command;

use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::commands::Context;
use crate::error::{Error, Result};
use crate::installer;
use crate::platform;

pub fn run(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    println!("Fetching the latest update tool version from the remote server...");
    let Some(latest) = client.fetch_latest_tool_version()? else {
        println!("Failed to find the latest update tool version");
        return Ok(());
    };

    if latest.version == ctx.tool_version() {
        println!(
            "The latest update tool version '{}' is already in use",
            latest.version
        );
        println!();
        println!("If you want to update the Ballerina distribution, use 'bal-update update'");
        return Ok(());
    }

    if !latest.compatible {
        print_incompatible_notice();
        return Ok(());
    }

    let store = ctx.store();
    store.check_writable()?;
    let _lock = store.lock()?;
    install_tool(ctx, &client, &latest.version)
}

/// Implicit check run by `pull` and `update`. Installs a newer compatible
/// tool in place; returns `false` when a newer incompatible tool exists, in
/// which case the calling operation must abort.
pub fn check_tool_update(ctx: &Context, client: &CatalogClient) -> Result<bool> {
    println!("Checking for newer versions of the update tool...");
    let Some(latest) = client.fetch_latest_tool_version()? else {
        println!("Failed to find the latest update tool version");
        return Ok(true);
    };
    if latest.version == ctx.tool_version() {
        return Ok(true);
    }
    if !latest.compatible {
        print_incompatible_notice();
        return Ok(false);
    }

    let store = ctx.store();
    store.check_writable()?;
    let _lock = store.lock()?;
    install_tool(ctx, client, &latest.version)?;
    println!();
    Ok(true)
}

fn print_incompatible_notice() {
    println!();
    println!("ERROR: Outdated Ballerina update tool version found");
    println!("Use the following command to update the Ballerina update tool");
    println!("   bal-update self-update");
    println!();
}

/// Download the tool archive, run its bundled install script, and delete
/// the temporary extraction directory on every exit path.
fn install_tool(ctx: &Context, client: &CatalogClient, tool_version: &str) -> Result<()> {
    let unzip_dir = ctx.paths.tool_unzip_dir();
    if unzip_dir.exists() {
        fs::remove_dir_all(&unzip_dir)?;
    }
    fs::create_dir_all(&unzip_dir)?;

    let result = download_and_run(ctx, client, tool_version);
    if let Err(e) = fs::remove_dir_all(&unzip_dir) {
        warn!("failed to remove '{}': {}", unzip_dir.display(), e);
    }
    result
}

fn download_and_run(ctx: &Context, client: &CatalogClient, tool_version: &str) -> Result<()> {
    let tool_name = format!("ballerina-command-{}", tool_version);
    let unzip_dir = ctx.paths.tool_unzip_dir();

    let response = client
        .open_artifact(&client.tool_artifact_url(tool_version))?
        .ok_or_else(|| Error::ToolVersionNotFound(tool_version.to_string()))?;
    let extracted = installer::install_archive(response, &unzip_dir, &tool_name)?;

    let script_name = platform::install_script_name();
    let script = unzip_dir.join(script_name);
    fs::copy(extracted.join("scripts").join(script_name), &script)?;
    installer::set_executable(&script)?;

    info!("running the bundled install script");
    let status = Command::new(&script).status()?;
    if status.success() {
        println!("Update successfully completed");
    } else {
        println!("Update failed due to errors");
    }
    Ok(())
}
