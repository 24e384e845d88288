// src/commands/remove.rs

//! Remove one non-active distribution, or all of them.

use crate::catalog;
use crate::commands::Context;
use crate::error::{Error, Result};
use crate::store::dependencies::GcOutcome;
use crate::store::DistributionStore;

pub fn run(ctx: &Context, version: Option<&str>, all: bool) -> Result<()> {
    let store = ctx.store();
    store.check_writable()?;
    let _lock = store.lock()?;

    if all {
        remove_all(ctx, &store)
    } else {
        match version {
            Some(version) => remove_one(ctx, &store, version),
            None => Err(Error::Usage(
                "a distribution or '--all' must be specified to remove".to_string(),
            )),
        }
    }
}

fn remove_one(ctx: &Context, store: &DistributionStore, version: &str) -> Result<()> {
    store.remove(version)?;
    println!("Distribution '{}' successfully removed", version);

    // the bundle this version used may now be orphaned
    let client = ctx.client()?;
    let channels = client.fetch_channels()?;
    let installed = store.installed_versions()?;
    match ctx.deps().garbage_collect(&channels, version, &installed)? {
        GcOutcome::Deleted(dependency) => {
            println!(
                "No local distributions found for the dependency '{}'",
                dependency
            );
            println!("Deleted the dependency '{}'", dependency);
        }
        GcOutcome::NoCatalogDependency => {
            println!("No dependency found for the given distribution version");
        }
        GcOutcome::StillReferenced => {}
    }
    Ok(())
}

fn remove_all(ctx: &Context, store: &DistributionStore) -> Result<()> {
    let removed = store.remove_all()?;
    if removed.is_empty() {
        println!("There is nothing to remove. Only the active distribution is remaining");
        return Ok(());
    }
    println!("All non-active distributions are successfully removed");

    // After removing everything non-active, the only bundle that can still
    // be required is the active version's own.
    let keep = match store.active_version()? {
        Some(active) => {
            let client = ctx.client()?;
            let channels = client.fetch_channels()?;
            catalog::find_dependency(&channels, &active).filter(|name| !name.is_empty())
        }
        None => None,
    };
    let swept = ctx.deps().sweep_except(keep.as_deref())?;
    if !swept.is_empty() {
        println!("Removed unused dependencies");
    }
    Ok(())
}
