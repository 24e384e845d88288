// src/store/mod.rs

//! Local distribution store.
//!
//! This module owns all persisted state:
//! - Installed distributions (`{root}/distributions/{type}-{version}`)
//! - Installed dependency bundles (`{root}/dependencies/{name}`)
//! - The single active-version pointer under `~/.ballerina`
//! - The derived caches invalidated when the active version changes
//!
//! Directory existence is the sole source of truth for "installed".
//! Every mutation is staged and committed by rename, and mutating
//! operations hold an advisory lock file for their duration.

pub mod dependencies;
pub mod snapshot;

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, info, warn};

use crate::catalog::{self, CatalogClient};
use crate::config::Paths;
use crate::error::{Error, Result};
use crate::installer;
use crate::store::dependencies::DependencyStore;
use crate::version::{dist_dir_name, version_of_token};

/// Advisory lock held for the duration of a mutating operation.
///
/// The lock is a `create_new` file holding the owner pid; dropping the
/// guard releases it. A stale lock left by a killed process has to be
/// removed by hand, which the conflict message spells out.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub struct DistributionStore {
    paths: Paths,
}

impl DistributionStore {
    pub fn new(paths: Paths) -> Self {
        DistributionStore { paths }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Existence check on the `{type}-{version}` directory.
    pub fn is_installed(&self, version: &str) -> Result<bool> {
        Ok(self.paths.distribution_dir(version)?.is_dir())
    }

    /// Versions of all installed distributions, sorted by directory name.
    /// Bookkeeping files and staging leftovers in the root are ignored.
    pub fn installed_versions(&self) -> Result<Vec<String>> {
        let mut entries: Vec<String> = Vec::new();
        for entry in fs::read_dir(self.paths.distributions_root()?)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if let Some(version) = version_of_token(&name) {
                entries.push(version.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// The version named by the active pointer, if it points at an
    /// installed distribution; otherwise the system default recorded by the
    /// platform installer, if any.
    pub fn active_version(&self) -> Result<Option<String>> {
        self.sync_installer_version()?;

        if let Some(version) = read_version_token(&self.paths.version_file())? {
            if self.is_installed(&version)? {
                return Ok(Some(version));
            }
        }
        read_version_token(&self.paths.installed_version_file()?)
    }

    /// A fresh platform install drops new `installer-version` and default
    /// version files into the distributions root. When the recorded
    /// per-user installer version falls behind, the user's pointer is reset
    /// to the new system default.
    fn sync_installer_version(&self) -> Result<()> {
        let system_file = self.paths.installed_installer_version_file()?;
        if !system_file.is_file() {
            return Ok(());
        }
        let system_version = fs::read_to_string(&system_file)?.trim().to_string();
        let user_file = self.paths.installer_version_file();
        let user_version = match fs::read_to_string(&user_file) {
            Ok(raw) => raw.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if system_version == user_version {
            return Ok(());
        }

        info!("installer changed; resetting the active version to the system default");
        if let Some(default_version) = read_version_token(&self.paths.installed_version_file()?)? {
            self.write_active_pointer(&default_version)?;
        }
        atomic_write(&user_file, &system_version)
    }

    /// Point the active pointer at `version` and invalidate the derived
    /// caches, which are keyed by the previously active version. Callers
    /// are responsible for skipping the call in the already-active case.
    pub fn set_active(&self, version: &str) -> Result<()> {
        self.write_active_pointer(version)?;
        self.clear_derived_caches()?;
        info!("active distribution set to '{}'", version);
        Ok(())
    }

    fn write_active_pointer(&self, version: &str) -> Result<()> {
        atomic_write(&self.paths.version_file(), &dist_dir_name(version))
    }

    /// Install `version` and the dependency bundle its catalog entry
    /// declares. Idempotent at the directory level: an installed version is
    /// reported and left untouched. Returns `true` in that case.
    ///
    /// If the dependency cannot be satisfied after the distribution archive
    /// was already extracted, the distribution directory is rolled back: a
    /// distribution without its runtime cannot work and must not pass the
    /// installed check.
    pub fn install(&self, client: &CatalogClient, version: &str) -> Result<bool> {
        if self.is_installed(version)? {
            println!("'{}' is already available locally", version);
            return Ok(true);
        }

        let dir_name = dist_dir_name(version);
        println!(
            "Fetching the '{}' distribution from the remote server...",
            version
        );
        let response = client
            .open_artifact(&client.distribution_artifact_url(version))?
            .ok_or_else(|| Error::DistributionNotFound(version.to_string()))?;
        let root = self.paths.distributions_root()?;
        let dist_dir = installer::install_archive(response, &root, &dir_name)?;
        installer::apply_distribution_permissions(&dist_dir)?;

        if let Err(e) = self.satisfy_dependency(client, version) {
            warn!("rolling back '{}': {}", dir_name, e);
            let _ = fs::remove_dir_all(&dist_dir);
            return Err(e);
        }
        info!("installed distribution '{}'", dir_name);
        Ok(false)
    }

    fn satisfy_dependency(&self, client: &CatalogClient, version: &str) -> Result<()> {
        let channels = client.fetch_channels()?;
        let dependency = catalog::find_dependency(&channels, version)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::DependencyUnavailable(version.to_string()))?;
        DependencyStore::new(&self.paths).ensure_installed(client, &dependency, version)?;
        Ok(())
    }

    /// Delete an installed, non-active distribution and the caches keyed by
    /// its version. Dependency garbage collection is sequenced by the
    /// caller so the removal itself stays a local operation.
    pub fn remove(&self, version: &str) -> Result<()> {
        if self.active_version()?.as_deref() == Some(version) {
            return Err(Error::ActiveDistributionRemoval);
        }
        let dir = self.paths.distribution_dir(version)?;
        if !dir.is_dir() {
            return Err(Error::DistributionNotFound(version.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        self.clear_version_caches(version)?;
        info!("removed distribution '{}'", version);
        Ok(())
    }

    /// Delete every installed distribution except the active one. Returns
    /// the removed versions; an empty list means there was nothing to
    /// remove and no mutation was performed.
    pub fn remove_all(&self) -> Result<Vec<String>> {
        let active = self.active_version()?;
        let victims: Vec<String> = self
            .installed_versions()?
            .into_iter()
            .filter(|version| active.as_deref() != Some(version.as_str()))
            .collect();
        if victims.is_empty() {
            return Ok(victims);
        }
        for version in &victims {
            fs::remove_dir_all(self.paths.distribution_dir(version)?)?;
            self.clear_version_caches(version)?;
            debug!("removed distribution '{}'", version);
        }
        Ok(victims)
    }

    /// The derived caches are meaningless once the active version changes.
    fn clear_derived_caches(&self) -> Result<()> {
        for cache in [self.paths.bir_cache(), self.paths.jar_cache()] {
            if cache.exists() {
                fs::remove_dir_all(&cache)?;
                debug!("cleared cache {}", cache.display());
            }
        }
        Ok(())
    }

    /// Repository caches namespaced by a removed version.
    fn clear_version_caches(&self, version: &str) -> Result<()> {
        for cache in self.paths.repo_caches(version) {
            if cache.exists() {
                fs::remove_dir_all(&cache)?;
                debug!("cleared cache {}", cache.display());
            }
        }
        Ok(())
    }

    /// Proactive writability probe of the install root, run before any
    /// mutating operation rather than discovered halfway through one.
    pub fn check_writable(&self) -> Result<()> {
        let root = self.paths.install_root().to_path_buf();
        fs::create_dir_all(&root)?;
        match tempfile::tempfile_in(&root) {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::PermissionDenied(root.display().to_string())),
        }
    }

    /// Take the advisory install-root lock.
    pub fn lock(&self) -> Result<LockGuard> {
        let path = self.paths.lock_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", process::id());
                Ok(LockGuard { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Error::Locked(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn read_version_token(path: &Path) -> Result<Option<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(raw
        .lines()
        .next()
        .and_then(|line| version_of_token(line.trim()))
        .map(str::to_string))
}

/// Write a single-line file via temp-then-rename in the target directory.
fn atomic_write(path: &Path, line: &str) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid path '{}'", path.display()),
        )
    })?;
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    writeln!(tmp, "{}", line)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, DistributionStore) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("install"), dir.path().join("home"));
        (dir, DistributionStore::new(paths))
    }

    fn install_dir(store: &DistributionStore, version: &str) {
        fs::create_dir_all(store.paths().distribution_dir(version).unwrap()).unwrap();
    }

    #[test]
    fn test_is_installed_directory_check() {
        let (_tmp, store) = test_store();
        assert!(!store.is_installed("1.2.3").unwrap());
        install_dir(&store, "1.2.3");
        assert!(store.is_installed("1.2.3").unwrap());
    }

    #[test]
    fn test_installed_versions_skips_bookkeeping() {
        let (_tmp, store) = test_store();
        install_dir(&store, "1.2.3");
        install_dir(&store, "slp1");
        let root = store.paths().distributions_root().unwrap();
        fs::write(root.join("ballerina-version"), "ballerina-slp1\n").unwrap();
        fs::create_dir_all(root.join(".stage-abandoned")).unwrap();

        assert_eq!(store.installed_versions().unwrap(), vec!["1.2.3", "slp1"]);
    }

    #[test]
    fn test_active_pointer_round_trip() {
        let (_tmp, store) = test_store();
        install_dir(&store, "slp1");
        store.set_active("slp1").unwrap();

        assert_eq!(store.active_version().unwrap().as_deref(), Some("slp1"));
        let raw = fs::read_to_string(store.paths().version_file()).unwrap();
        assert_eq!(raw.trim(), "ballerina-slp1");
    }

    #[test]
    fn test_active_version_ignores_uninstalled_pointer() {
        let (_tmp, store) = test_store();
        // pointer names a version with no directory behind it
        atomic_write(&store.paths().version_file(), "ballerina-slp9").unwrap();
        assert_eq!(store.active_version().unwrap(), None);
    }

    #[test]
    fn test_set_active_clears_derived_caches() {
        let (_tmp, store) = test_store();
        install_dir(&store, "slp1");
        let bir = store.paths().bir_cache();
        fs::create_dir_all(&bir).unwrap();
        fs::write(bir.join("stale.bir"), "x").unwrap();

        store.set_active("slp1").unwrap();
        assert!(!bir.exists());
    }

    #[test]
    fn test_remove_refuses_active_version() {
        let (_tmp, store) = test_store();
        install_dir(&store, "slp1");
        store.set_active("slp1").unwrap();

        let result = store.remove("slp1");
        assert!(matches!(result, Err(Error::ActiveDistributionRemoval)));
        assert!(store.is_installed("slp1").unwrap());
    }

    #[test]
    fn test_remove_missing_version() {
        let (_tmp, store) = test_store();
        let result = store.remove("1.2.3");
        assert!(matches!(result, Err(Error::DistributionNotFound(_))));
    }

    #[test]
    fn test_remove_deletes_directory_and_version_caches() {
        let (_tmp, store) = test_store();
        install_dir(&store, "1.2.3");
        install_dir(&store, "slp1");
        store.set_active("slp1").unwrap();
        let [central, local] = store.paths().repo_caches("1.2.3");
        fs::create_dir_all(&central).unwrap();
        fs::create_dir_all(&local).unwrap();

        store.remove("1.2.3").unwrap();
        assert!(!store.is_installed("1.2.3").unwrap());
        assert!(!central.exists());
        assert!(!local.exists());
        assert_eq!(store.active_version().unwrap().as_deref(), Some("slp1"));
    }

    #[test]
    fn test_remove_all_nothing_but_active() {
        let (_tmp, store) = test_store();
        install_dir(&store, "slp1");
        store.set_active("slp1").unwrap();

        let removed = store.remove_all().unwrap();
        assert!(removed.is_empty());
        assert!(store.is_installed("slp1").unwrap());
    }

    #[test]
    fn test_remove_all_keeps_active_only() {
        let (_tmp, store) = test_store();
        install_dir(&store, "1.2.3");
        install_dir(&store, "1.2.13");
        install_dir(&store, "slp1");
        store.set_active("slp1").unwrap();

        let removed = store.remove_all().unwrap();
        assert_eq!(removed, vec!["1.2.13", "1.2.3"]);
        assert!(store.is_installed("slp1").unwrap());
        assert!(!store.is_installed("1.2.3").unwrap());
        assert!(!store.is_installed("1.2.13").unwrap());
    }

    #[test]
    fn test_lock_conflict_and_release() {
        let (_tmp, store) = test_store();
        let guard = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(Error::Locked(_))));
        drop(guard);
        // released on drop
        let _guard = store.lock().unwrap();
    }

    #[test]
    fn test_installer_version_sync_resets_pointer() {
        let (_tmp, store) = test_store();
        install_dir(&store, "1.2.3");
        install_dir(&store, "slp1");
        store.set_active("1.2.3").unwrap();

        // a platform install drops a new default and installer version
        let root = store.paths().distributions_root().unwrap();
        fs::write(root.join("ballerina-version"), "ballerina-slp1\n").unwrap();
        fs::write(root.join("installer-version"), "2\n").unwrap();

        assert_eq!(store.active_version().unwrap().as_deref(), Some("slp1"));
        let user_installer =
            fs::read_to_string(store.paths().installer_version_file()).unwrap();
        assert_eq!(user_installer.trim(), "2");
    }
}
