// src/commands/list.rs

//! List distributions, locally installed and remotely available.
//!
//! A successful catalog fetch refreshes the offline snapshot; a connection
//! failure falls back to it, unless a directory scan proves it stale.

use tracing::warn;

use crate::commands::Context;
use crate::error::{Error, Result};
use crate::store::snapshot::{self, DistListSnapshot};

/// Remote listings are truncated to this many recent releases per channel
/// unless `--all` is given.
const RECENT_PER_CHANNEL: usize = 10;

pub fn run(ctx: &Context, all_flag: bool, pre_releases: bool) -> Result<()> {
    let store = ctx.store();
    let active = store.active_version()?.unwrap_or_default();
    let installed = store.installed_versions()?;

    let outcome = ctx.client().and_then(|client| client.fetch_channels());
    match outcome {
        Ok(channels) => {
            println!("Distributions available locally:\n");
            for channel in &channels {
                for dist in &channel.distributions {
                    if installed.iter().any(|v| *v == dist.version) {
                        println!("{}", mark_version(&active, &dist.version, None));
                    }
                }
            }

            let snap = DistListSnapshot::from_catalog(&channels, &installed);
            if let Err(e) = snapshot::write(&ctx.paths.dist_list_file(), &snap) {
                warn!("failed to refresh the offline snapshot: {}", e);
            }

            println!("\nDistributions available remotely:");
            for channel in &channels {
                if channel.name.contains("pre-release") && !pre_releases {
                    continue;
                }
                println!("\n{}\n", channel.name);
                let dists = &channel.distributions;
                let latest = dists.last().map(|d| d.version.as_str()).unwrap_or("");
                let shown = if !all_flag && dists.len() > RECENT_PER_CHANNEL {
                    println!(
                        "... To list all the previous distributions execute 'bal-update list --all'"
                    );
                    &dists[dists.len() - RECENT_PER_CHANNEL..]
                } else {
                    &dists[..]
                };
                for dist in shown {
                    println!("{}", mark_version(&active, &dist.version, Some(latest)));
                }
            }
        }
        Err(e @ (Error::Connection | Error::ProxyConnection | Error::Server(_))) => {
            println!("Distributions available locally:\n");
            list_offline(ctx, &active, &installed);
            println!("\nDistributions available remotely:\n");
            println!("ballerina: {}", e);
        }
        Err(e) => return Err(e),
    }

    println!();
    println!("Use 'bal-update help' for more information on specific commands.");
    Ok(())
}

/// Offline local section. The snapshot only wins when it covers everything
/// the directory scan found; otherwise it is stale and the scan is printed.
fn list_offline(ctx: &Context, active: &str, installed: &[String]) {
    match snapshot::read(&ctx.paths.dist_list_file()) {
        Ok(snap) if snap.covers(installed) => {
            for version in snap.versions() {
                println!("{}", mark_version(active, version, None));
            }
        }
        _ => {
            for version in installed {
                println!("{}", mark_version(active, version, None));
            }
        }
    }
}

fn mark_version(active: &str, version: &str, latest: Option<&str>) -> String {
    let used_marker = if active == version { "* " } else { "  " };
    match latest {
        Some(latest) if latest == version => format!("{}{} - latest", used_marker, version),
        _ => format!("{}{}", used_marker, version),
    }
}
