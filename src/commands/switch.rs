// src/commands/switch.rs

//! Mark an installed distribution as the active one (the `use` subcommand).

use crate::commands::Context;
use crate::error::{Error, Result};
use crate::version;

pub fn run(ctx: &Context, version_arg: &str) -> Result<()> {
    let client = ctx.client()?;
    let channels = client.fetch_channels()?;

    // A token the catalog has never heard of is a different failure from a
    // known version that simply has not been pulled yet.
    if !version::is_valid_version(&channels, version_arg) {
        return Err(Error::InvalidDistribution(version_arg.to_string()));
    }

    let store = ctx.store();
    if !store.is_installed(version_arg)? {
        return Err(Error::NotInstalled(version_arg.to_string()));
    }

    if store.active_version()?.as_deref() == Some(version_arg) {
        // no cache invalidation on the already-active path
        println!(
            "'{}' is the current active distribution version",
            version_arg
        );
        return Ok(());
    }

    store.check_writable()?;
    let _lock = store.lock()?;
    store.set_active(version_arg)?;
    println!(
        "'{}' successfully set as the active distribution",
        version_arg
    );
    Ok(())
}
