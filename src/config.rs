// src/config.rs

//! Environment-driven configuration and the on-disk path map.
//!
//! The remote catalog base URL is selected among production/staging/dev via
//! environment variables; an optional `Settings.toml` in the Ballerina home
//! supplies proxy details for outbound requests.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::platform;
use crate::version::DistType;

const PRODUCTION_URL: &str = "https://api.central.ballerina.io/2.0/update-tool";
const STAGING_URL: &str = "https://api.staging-central.ballerina.io/2.0/update-tool";
const DEV_URL: &str = "https://api.dev-central.ballerina.io/2.0/update-tool";

const STAGING_ENV: &str = "BALLERINA_STAGING_UPDATE";
const DEV_ENV: &str = "BALLERINA_DEV_UPDATE";
const TEST_MODE_ENV: &str = "TEST_MODE_ACTIVE";

const SETTINGS_FILE: &str = "Settings.toml";

/// Resolved runtime configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub test_mode: bool,
    pub proxy: Option<ProxySettings>,
}

/// Proxy connection details from the `[proxy]` table of `Settings.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    proxy: Option<ProxySettings>,
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Config {
    /// Build the configuration from the environment and the settings file in
    /// the given Ballerina home directory.
    pub fn from_env(ballerina_home: &Path) -> Result<Self> {
        let base_url = if env_flag(DEV_ENV) {
            DEV_URL
        } else if env_flag(STAGING_ENV) {
            STAGING_URL
        } else {
            PRODUCTION_URL
        };

        Ok(Config {
            base_url: base_url.to_string(),
            test_mode: env_flag(TEST_MODE_ENV),
            proxy: load_proxy_settings(&ballerina_home.join(SETTINGS_FILE))?,
        })
    }
}

/// Read the `[proxy]` table, if the settings file defines one.
///
/// A missing file or a file without a `[proxy]` table is not an error; a
/// present but unusable table is.
pub fn load_proxy_settings(path: &Path) -> Result<Option<ProxySettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let settings: SettingsFile = toml::from_str(&raw)
        .map_err(|e| Error::Settings(format!("{}: {}", path.display(), e)))?;
    match settings.proxy {
        Some(proxy) if proxy.host.is_empty() => {
            Err(Error::Settings("proxy host must not be empty".to_string()))
        }
        Some(proxy) if proxy.port == 0 => {
            Err(Error::Settings("proxy port must be between 1 and 65535".to_string()))
        }
        other => Ok(other),
    }
}

/// The on-disk layout the tool owns: the install root (distributions and
/// dependencies) and the per-user state under `~/.ballerina`.
#[derive(Debug, Clone)]
pub struct Paths {
    install_root: PathBuf,
    user_home: PathBuf,
}

impl Paths {
    pub fn new(install_root: PathBuf, user_home: PathBuf) -> Self {
        Paths {
            install_root,
            user_home,
        }
    }

    /// Discover the layout for a normal invocation: the install root is the
    /// grandparent of the running executable (`{root}/bin/bal-update`), the
    /// user home comes from the environment.
    pub fn discover() -> Result<Self> {
        let exe = env::current_exe()?;
        let install_root = exe
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "failed to get the path to the installation directory",
                ))
            })?;
        Ok(Paths::new(install_root, platform::user_home()?))
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// `{install-root}/distributions`, created on first use.
    pub fn distributions_root(&self) -> Result<PathBuf> {
        let dir = self.install_root.join("distributions");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// `{install-root}/dependencies`, created on first use.
    pub fn dependencies_root(&self) -> Result<PathBuf> {
        let dir = self.install_root.join("dependencies");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Advisory lock taken by mutating operations.
    pub fn lock_file(&self) -> PathBuf {
        self.install_root.join(".update-tool.lock")
    }

    /// Scratch directory for unpacking a downloaded tool archive.
    pub fn tool_unzip_dir(&self) -> PathBuf {
        self.install_root.join("ballerina-command-tmp")
    }

    /// `~/.ballerina`
    pub fn ballerina_home(&self) -> PathBuf {
        self.user_home.join(".ballerina")
    }

    /// Active-version pointer file, single line `{type}-{version}`.
    pub fn version_file(&self) -> PathBuf {
        self.ballerina_home().join("ballerina-version")
    }

    /// Per-user copy of the installer version, synced from the install root.
    pub fn installer_version_file(&self) -> PathBuf {
        self.ballerina_home().join("installer-version")
    }

    /// System default written by the platform installer, if any.
    pub fn installed_version_file(&self) -> Result<PathBuf> {
        Ok(self.distributions_root()?.join("ballerina-version"))
    }

    pub fn installed_installer_version_file(&self) -> Result<PathBuf> {
        Ok(self.distributions_root()?.join("installer-version"))
    }

    /// Best-effort offline snapshot of the catalog for `list`.
    pub fn dist_list_file(&self) -> PathBuf {
        self.ballerina_home().join("local-dists.json")
    }

    /// Date stamp throttling the daily new-version notice.
    pub fn update_notice_file(&self) -> PathBuf {
        self.ballerina_home().join("command-notice")
    }

    /// Intermediate-representation cache, meaningless across version switches.
    pub fn bir_cache(&self) -> PathBuf {
        self.ballerina_home().join("bir_cache")
    }

    /// Compiled-artifact cache, meaningless across version switches.
    pub fn jar_cache(&self) -> PathBuf {
        self.ballerina_home().join("jar_cache")
    }

    /// Per-version repository caches cleared when a version is removed.
    pub fn repo_caches(&self, version: &str) -> [PathBuf; 2] {
        let repositories = self.ballerina_home().join("repositories");
        [
            repositories
                .join("central.ballerina.io")
                .join(format!("cache-{}", version)),
            repositories.join("local").join(format!("cache-{}", version)),
        ]
    }

    /// Directory of an installed distribution: `{type}-{version}`.
    pub fn distribution_dir(&self, version: &str) -> Result<PathBuf> {
        Ok(self
            .distributions_root()?
            .join(format!("{}-{}", DistType::classify(version), version)))
    }

    /// Directory of an installed dependency bundle.
    pub fn dependency_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(self.dependencies_root()?.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_proxy_settings_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_proxy_settings(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_proxy_settings_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[proxy]\nhost = \"proxy.example.com\"\nport = 8080\nuser = \"alice\"\npassword = \"secret\""
        )
        .unwrap();

        let proxy = load_proxy_settings(&path).unwrap().unwrap();
        assert_eq!(proxy.host, "proxy.example.com");
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_proxy_settings_without_proxy_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "[central]\naccesstoken = \"abc\"\n").unwrap();
        assert!(load_proxy_settings(&path).unwrap().is_none());
    }

    #[test]
    fn test_proxy_settings_rejects_empty_host() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "[proxy]\nhost = \"\"\nport = 8080\n").unwrap();
        assert!(matches!(
            load_proxy_settings(&path),
            Err(Error::Settings(_))
        ));
    }

    #[test]
    fn test_distribution_dir_embeds_type() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().to_path_buf(), dir.path().to_path_buf());
        let legacy = paths.distribution_dir("1.2.3").unwrap();
        assert!(legacy.ends_with("distributions/jballerina-1.2.3"));
        let current = paths.distribution_dir("2201.8.0").unwrap();
        assert!(current.ends_with("distributions/ballerina-2201.8.0"));
    }
}
