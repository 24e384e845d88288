// src/commands/update.rs

//! Move the active distribution to the latest patch of its series.

use crate::commands::{self_update, Context};
use crate::error::{Error, Result};
use crate::version::{self, dist_dir_name};

pub fn run(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    if !ctx.config.test_mode {
        if !self_update::check_tool_update(ctx, &client)? {
            return Ok(());
        }
    }

    let store = ctx.store();
    let Some(current) = store.active_version()? else {
        return Err(Error::Usage(
            "there is no active distribution to update. Run 'bal-update pull latest' to fetch one"
                .to_string(),
        ));
    };

    let token = dist_dir_name(&current);
    println!(
        "Fetching the latest patch distribution for '{}' from the remote server...",
        token
    );
    let Some(latest) = version::resolve_latest_patch(&client, &current)? else {
        println!("Failed to find the latest patch distribution for '{}'", token);
        return Ok(());
    };

    if latest == current {
        println!(
            "The latest patch distribution '{}' is already the active distribution",
            latest
        );
        return Ok(());
    }

    store.check_writable()?;
    let _lock = store.lock()?;
    store.install(&client, &latest)?;
    store.set_active(&latest)?;
    println!(
        "Successfully set the latest patch distribution '{}' as the active distribution",
        latest
    );
    Ok(())
}
