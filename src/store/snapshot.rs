// src/store/snapshot.rs

//! Best-effort offline snapshot of locally installed distributions.
//!
//! `list` refreshes this file on every successful catalog fetch so an
//! offline invocation can still show something. It is a cache, never a
//! source of truth: a snapshot that fails to cover the current directory
//! scan loses to the scan.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Channel;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistListSnapshot {
    pub channels: Vec<SnapshotChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotChannel {
    pub name: String,
    pub releases: Vec<SnapshotRelease>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRelease {
    pub name: String,
    pub version: String,
}

impl DistListSnapshot {
    /// Record the installed subset of the catalog, keeping channel order.
    pub fn from_catalog(channels: &[Channel], installed: &[String]) -> Self {
        let channels = channels
            .iter()
            .map(|channel| SnapshotChannel {
                name: channel.name.clone(),
                releases: channel
                    .distributions
                    .iter()
                    .filter(|dist| installed.iter().any(|v| *v == dist.version))
                    .map(|dist| SnapshotRelease {
                        name: dist.name.clone(),
                        version: dist.version.clone(),
                    })
                    .collect(),
            })
            .collect();
        DistListSnapshot { channels }
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.channels
            .iter()
            .flat_map(|c| c.releases.iter())
            .map(|r| r.version.as_str())
    }

    /// True when every installed version appears in the snapshot. A stale
    /// snapshot must not shadow the directory scan.
    pub fn covers(&self, installed: &[String]) -> bool {
        installed
            .iter()
            .all(|version| self.versions().any(|v| v == version))
    }
}

pub fn read(path: &Path) -> Result<DistListSnapshot> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write the snapshot via temp-then-rename so readers never observe a torn
/// file.
pub fn write(path: &Path, snapshot: &DistListSnapshot) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid snapshot path '{}'", path.display()),
        )
    })?;
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(serde_json::to_string(snapshot)?.as_bytes())?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
