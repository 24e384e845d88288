// src/platform.rs

//! Host-specific naming: entry-point basenames, the OS tag reported in the
//! user-agent, and user home discovery.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// OS/arch tag attached to every catalog request for server-side analytics.
pub fn os_tag() -> &'static str {
    if cfg!(windows) {
        "win-64"
    } else if cfg!(target_os = "macos") {
        if cfg!(target_arch = "aarch64") {
            "macos-arm-64"
        } else {
            "macos-64"
        }
    } else {
        "linux-64"
    }
}

/// `user-agent` value: `{distribution type}/{active version} ({os}) Updater/{tool version}`.
pub fn user_agent(dist_type: &str, active_version: &str, tool_version: &str) -> String {
    format!(
        "{}/{} ({}) Updater/{}",
        dist_type,
        active_version,
        os_tag(),
        tool_version
    )
}

/// Candidate basenames for a distribution's entry-point script, current
/// generation first. The installer probes in order and marks the first hit
/// executable.
pub fn exec_candidates() -> [&'static str; 2] {
    if cfg!(windows) {
        ["bal.bat", "ballerina.bat"]
    } else {
        ["bal", "ballerina"]
    }
}

/// Basename of the install script bundled inside a tool archive.
pub fn install_script_name() -> &'static str {
    if cfg!(windows) {
        "install.bat"
    } else {
        "install"
    }
}

/// Basename of the optional language-server launcher script.
pub fn lang_server_launcher_name() -> &'static str {
    if cfg!(windows) {
        "language-server-launcher.bat"
    } else {
        "language-server-launcher.sh"
    }
}

/// Basename of the optional debug-adapter launcher script.
pub fn debug_adapter_name() -> &'static str {
    if cfg!(windows) {
        "debug-adapter-launcher.bat"
    } else {
        "debug-adapter-launcher.sh"
    }
}

/// User home directory. Under sudo the invoking user's home is preferred so
/// per-user state does not end up owned by root.
pub fn user_home() -> Result<PathBuf> {
    if !cfg!(windows) {
        if let Ok(home) = env::var("HOME") {
            if home.contains("root") {
                if let Ok(sudo_user) = env::var("SUDO_USER") {
                    return Ok(PathBuf::from("/home").join(sudo_user));
                }
            }
            return Ok(PathBuf::from(home));
        }
    }
    env::var_os("USERPROFILE")
        .or_else(|| env::var_os("HOME"))
        .map(PathBuf::from)
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine the user home directory",
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_shape() {
        let ua = user_agent("jballerina", "1.2.3", "1.5.0");
        assert!(ua.starts_with("jballerina/1.2.3 ("));
        assert!(ua.ends_with(") Updater/1.5.0"));
    }

    #[test]
    fn test_exec_candidates_prefer_current_name() {
        let [first, second] = exec_candidates();
        assert!(first.starts_with("bal"));
        assert!(second.starts_with("ballerina"));
    }
}
