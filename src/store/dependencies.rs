// src/store/dependencies.rs

//! Shared runtime dependency bundles.
//!
//! A bundle is installed once under the dependencies root and reused by
//! every distribution that declares it. No reference count is persisted:
//! liveness is recomputed on demand from the live catalog, so the mapping
//! survives catalog changes between installs without any local migration.

use std::fs;

use tracing::{debug, info};

use crate::catalog::{self, CatalogClient, Channel};
use crate::config::Paths;
use crate::error::{Error, Result};
use crate::installer;

/// Result of a garbage-collection pass after removing one distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcOutcome {
    /// The catalog no longer associates a dependency with the removed version
    NoCatalogDependency,
    /// Some installed distribution still references the bundle
    StillReferenced,
    /// The bundle was orphaned and its directory deleted
    Deleted(String),
}

pub struct DependencyStore {
    paths: Paths,
}

impl DependencyStore {
    pub fn new(paths: &Paths) -> Self {
        DependencyStore {
            paths: paths.clone(),
        }
    }

    /// Directory existence is the sole installed check.
    pub fn is_installed(&self, name: &str) -> Result<bool> {
        Ok(self.paths.dependency_dir(name)?.is_dir())
    }

    /// Names of all installed bundles.
    pub fn installed(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.paths.dependencies_root()?)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Install the bundle unless its directory already exists.
    ///
    /// The archive is staged and committed by rename, so a failed download
    /// or extraction leaves no partial directory. Returns `true` when the
    /// bundle was already present.
    pub fn ensure_installed(
        &self,
        client: &CatalogClient,
        name: &str,
        for_version: &str,
    ) -> Result<bool> {
        if self.is_installed(name)? {
            debug!("dependency '{}' already installed", name);
            return Ok(true);
        }

        println!(
            "\nFetching the dependencies for '{}' from the remote server...",
            for_version
        );
        let url = client.dependency_artifact_url(name);
        let response = client
            .open_artifact(&url)?
            .ok_or_else(|| Error::DependencyNotFound(name.to_string()))?;

        let root = self.paths.dependencies_root()?;
        let bundle_dir = installer::install_archive(response, &root, name)?;
        installer::set_executable_recursive(&bundle_dir)?;
        info!("installed dependency '{}'", name);
        Ok(false)
    }

    /// Delete the bundle the removed version used, unless another installed
    /// distribution in the same channel still references it. The channel
    /// set comes from a fresh catalog fetch by the caller: liveness is a
    /// catalog fact, not local state.
    pub fn garbage_collect(
        &self,
        channels: &[Channel],
        removed_version: &str,
        installed_versions: &[String],
    ) -> Result<GcOutcome> {
        let Some(dependency) =
            catalog::find_dependency(channels, removed_version).filter(|d| !d.is_empty())
        else {
            return Ok(GcOutcome::NoCatalogDependency);
        };

        let sharing = catalog::versions_sharing_dependency(channels, removed_version);
        if installed_versions.iter().any(|v| sharing.contains(v)) {
            debug!("dependency '{}' still referenced", dependency);
            return Ok(GcOutcome::StillReferenced);
        }

        let dir = self.paths.dependency_dir(&dependency)?;
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        info!("deleted orphaned dependency '{}'", dependency);
        Ok(GcOutcome::Deleted(dependency))
    }

    /// Delete every installed bundle except `keep`. Used by remove-all,
    /// where only the active version's dependency can still be required.
    pub fn sweep_except(&self, keep: Option<&str>) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for name in self.installed()? {
            if Some(name.as_str()) == keep {
                continue;
            }
            fs::remove_dir_all(self.paths.dependency_dir(&name)?)?;
            removed.push(name);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Distribution;

    fn test_paths() -> (tempfile::TempDir, Paths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(
            dir.path().join("install"),
            dir.path().join("home"),
        );
        (dir, paths)
    }

    fn dist(version: &str, channel: &str, dependency: &str) -> Distribution {
        Distribution {
            name: version.to_string(),
            version: version.to_string(),
            kind: String::new(),
            channel: channel.to_string(),
            dependency: dependency.to_string(),
        }
    }

    fn sample_channels() -> Vec<Channel> {
        vec![
            Channel {
                name: "rolling".to_string(),
                distributions: vec![dist("slp1", "rolling", "jdk17")],
            },
            Channel {
                name: "1.x".to_string(),
                distributions: vec![
                    dist("1.2.3", "1.x", "jdk11"),
                    dist("1.2.13", "1.x", "jdk11"),
                ],
            },
        ]
    }

    #[test]
    fn test_installed_lists_directories_only() {
        let (_tmp, paths) = test_paths();
        let store = DependencyStore::new(&paths);

        fs::create_dir_all(paths.dependency_dir("jdk11").unwrap()).unwrap();
        fs::create_dir_all(paths.dependency_dir("jdk17").unwrap()).unwrap();
        fs::write(paths.dependencies_root().unwrap().join("stray.txt"), "x").unwrap();

        assert_eq!(store.installed().unwrap(), vec!["jdk11", "jdk17"]);
        assert!(store.is_installed("jdk11").unwrap());
        assert!(!store.is_installed("jdk8").unwrap());
    }

    #[test]
    fn test_sweep_except_keeps_named_bundle() {
        let (_tmp, paths) = test_paths();
        let store = DependencyStore::new(&paths);

        fs::create_dir_all(paths.dependency_dir("jdk11").unwrap()).unwrap();
        fs::create_dir_all(paths.dependency_dir("jdk17").unwrap()).unwrap();

        let removed = store.sweep_except(Some("jdk17")).unwrap();
        assert_eq!(removed, vec!["jdk11"]);
        assert!(!store.is_installed("jdk11").unwrap());
        assert!(store.is_installed("jdk17").unwrap());
    }

    #[test]
    fn test_sweep_without_keep_clears_everything() {
        let (_tmp, paths) = test_paths();
        let store = DependencyStore::new(&paths);

        fs::create_dir_all(paths.dependency_dir("jdk11").unwrap()).unwrap();
        let removed = store.sweep_except(None).unwrap();
        assert_eq!(removed, vec!["jdk11"]);
    }

    #[test]
    fn test_garbage_collect_deletes_orphaned_bundle() {
        let (_tmp, paths) = test_paths();
        let store = DependencyStore::new(&paths);
        fs::create_dir_all(paths.dependency_dir("jdk11").unwrap()).unwrap();

        // 1.2.3 was just removed; only slp1 (jdk17) remains installed
        let outcome = store
            .garbage_collect(&sample_channels(), "1.2.3", &["slp1".to_string()])
            .unwrap();
        assert_eq!(outcome, GcOutcome::Deleted("jdk11".to_string()));
        assert!(!store.is_installed("jdk11").unwrap());
    }

    #[test]
    fn test_garbage_collect_keeps_referenced_bundle() {
        let (_tmp, paths) = test_paths();
        let store = DependencyStore::new(&paths);
        fs::create_dir_all(paths.dependency_dir("jdk11").unwrap()).unwrap();

        // 1.2.13 still needs jdk11
        let outcome = store
            .garbage_collect(&sample_channels(), "1.2.3", &["1.2.13".to_string()])
            .unwrap();
        assert_eq!(outcome, GcOutcome::StillReferenced);
        assert!(store.is_installed("jdk11").unwrap());
    }

    #[test]
    fn test_garbage_collect_without_catalog_entry() {
        let (_tmp, paths) = test_paths();
        let store = DependencyStore::new(&paths);

        let outcome = store
            .garbage_collect(&sample_channels(), "9.9.9", &[])
            .unwrap();
        assert_eq!(outcome, GcOutcome::NoCatalogDependency);
    }
}
