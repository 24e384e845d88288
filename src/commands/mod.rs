// src/commands/mod.rs

//! Top-level operations, one module per subcommand.
//!
//! Commands sequence the catalog client, installer, and stores, and are the
//! recovery boundary for the error taxonomy: everything below returns
//! `Result`, everything user-visible is printed here or in `main`.

pub mod list;
pub mod pull;
pub mod remove;
pub mod self_update;
pub mod switch;
pub mod update;

use std::fs;

use chrono::NaiveDate;
use tracing::debug;

use crate::catalog::CatalogClient;
use crate::config::{Config, Paths};
use crate::error::Result;
use crate::platform;
use crate::store::dependencies::DependencyStore;
use crate::store::DistributionStore;

/// Distribution type reported in the user-agent for catalog-level queries.
const CATALOG_UA_TYPE: &str = "jballerina";

/// Version token that asks pull to resolve the newest release itself.
pub const LATEST_PULL_INPUT: &str = "latest";

/// Everything a command needs: resolved configuration plus the path map.
pub struct Context {
    pub config: Config,
    pub paths: Paths,
}

impl Context {
    /// Context for a normal invocation.
    pub fn discover() -> Result<Self> {
        let paths = Paths::discover()?;
        let config = Config::from_env(&paths.ballerina_home())?;
        Ok(Context { config, paths })
    }

    pub fn new(config: Config, paths: Paths) -> Self {
        Context { config, paths }
    }

    pub fn store(&self) -> DistributionStore {
        DistributionStore::new(self.paths.clone())
    }

    pub fn deps(&self) -> DependencyStore {
        DependencyStore::new(&self.paths)
    }

    /// Version of this tool, compared against the server's latest.
    pub fn tool_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Catalog client carrying the analytics user-agent for this host.
    pub fn client(&self) -> Result<CatalogClient> {
        let active = self.store().active_version()?.unwrap_or_default();
        let user_agent = platform::user_agent(CATALOG_UA_TYPE, &active, self.tool_version());
        CatalogClient::new(&self.config, user_agent)
    }
}

/// Once-a-day advisory check for a newer patch release. Purely informative:
/// every failure is swallowed, an invocation must never break on it.
pub fn print_update_notice(ctx: &Context) {
    if let Err(e) = try_update_notice(ctx) {
        debug!("update notice suppressed: {}", e);
    }
}

fn try_update_notice(ctx: &Context) -> Result<()> {
    let Some(version) = ctx.store().active_version()? else {
        return Ok(());
    };
    if !notice_due_today(ctx)? {
        return Ok(());
    }
    let client = ctx.client()?;
    let Some(latest) = client.fetch_latest(&version, "patch")? else {
        return Ok(());
    };
    // 1.0.x releases are serviced through their own channel
    if latest.starts_with("1.0.") || latest == version {
        return Ok(());
    }
    println!("A new version of Ballerina is available: {}", latest);
    println!(
        "Use 'bal-update pull {}' to download and use the distribution",
        latest
    );
    println!();
    Ok(())
}

/// True at most once per day, tracked by a date stamp file.
fn notice_due_today(ctx: &Context) -> Result<bool> {
    let stamp = ctx.paths.update_notice_file();
    let today = chrono::Local::now().date_naive();
    let due = match fs::read_to_string(&stamp) {
        Ok(raw) => raw
            .trim()
            .parse::<NaiveDate>()
            .map(|last| (today - last).num_days() > 1)
            .unwrap_or(true),
        Err(_) => true,
    };
    if due {
        if let Some(parent) = stamp.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&stamp, format!("{}\n", today))?;
    }
    Ok(due)
}
