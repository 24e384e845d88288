// src/commands/pull.rs

//! Fetch a distribution and set it as the active version.

use crate::commands::{self_update, Context, LATEST_PULL_INPUT};
use crate::error::{Error, Result};
use crate::version;

/// `pull <version|latest>`.
///
/// Sequence: tool self-update check (skipped in test mode), resolve the
/// version token, validate it against the catalog, short-circuit when it is
/// already active, install, set active.
pub fn run(ctx: &Context, version_arg: &str, test_flag: bool) -> Result<()> {
    let client = ctx.client()?;

    if !(test_flag || ctx.config.test_mode) {
        // An incompatible newer tool is a hard stop, never silently skipped.
        if !self_update::check_tool_update(ctx, &client)? {
            return Ok(());
        }
    }

    let version = if version_arg == LATEST_PULL_INPUT {
        println!("Fetching the latest distribution from the remote server...");
        version::resolve_latest_in_catalog(&client)?
    } else {
        let channels = client.fetch_channels()?;
        if !version::is_valid_version(&channels, version_arg) {
            return Err(Error::DistributionNotFound(version_arg.to_string()));
        }
        version_arg.to_string()
    };

    let store = ctx.store();
    if store.active_version()?.as_deref() == Some(version.as_str()) {
        println!("'{}' is already the active distribution", version);
        return Ok(());
    }

    store.check_writable()?;
    let _lock = store.lock()?;
    store.install(&client, &version)?;
    store.set_active(&version)?;
    println!("'{}' successfully set as the active distribution", version);
    Ok(())
}
