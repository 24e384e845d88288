// src/installer.rs

//! Archive download and installation.
//!
//! Artifacts are streamed to a temporary zip next to their destination,
//! extracted into a hidden staging directory, and committed with a single
//! rename. A killed download or extraction therefore never produces a
//! directory that passes the installed check.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Response;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::platform;

/// Fixed copy buffer for streaming downloads
const DOWNLOAD_BUF_SIZE: usize = 8192;

fn progress_bar(length: Option<u64>, label: &str) -> ProgressBar {
    // Content-Length drives progress reporting only; without it the
    // download still proceeds, just silently.
    match length {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::with_template("{msg} [{bar:40}] {bytes}/{total_bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.set_message(format!("Downloading {}", label));
            bar
        }
        None => ProgressBar::hidden(),
    }
}

/// Stream a response body into `dest` with progress reporting.
pub fn download_to_file(mut response: Response, dest: &Path, label: &str) -> Result<()> {
    let bar = progress_bar(response.content_length(), label);
    let mut writer = BufWriter::new(File::create(dest)?);
    let mut buf = [0u8; DOWNLOAD_BUF_SIZE];
    loop {
        let count = response.read(&mut buf)?;
        if count == 0 {
            break;
        }
        writer.write_all(&buf[..count])?;
        bar.inc(count as u64);
    }
    writer.flush()?;
    bar.finish_and_clear();
    debug!("downloaded {} to {}", label, dest.display());
    Ok(())
}

/// Extract a zip archive into `dest`.
///
/// Entries are tolerated in any order: parent directories are created on
/// demand for file entries whose directory entry has not been seen yet.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            // entry path escapes the destination; never write it
            warn!("skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            io::copy(&mut entry, &mut out)?;
        }
    }
    Ok(())
}

/// Extract an already-downloaded archive whose top-level folder is
/// `dir_name` and move that folder into place under `root`.
pub fn stage_install(archive: &Path, root: &Path, dir_name: &str) -> Result<PathBuf> {
    let stage = tempfile::Builder::new()
        .prefix(".stage-")
        .tempdir_in(root)?;
    extract_zip(archive, stage.path())?;

    let extracted = stage.path().join(dir_name);
    if !extracted.is_dir() {
        return Err(Error::BadArchive(format!(
            "archive does not contain a '{}' directory",
            dir_name
        )));
    }

    let final_path = root.join(dir_name);
    fs::rename(&extracted, &final_path)?;
    Ok(final_path)
}

/// Remove staging leftovers a killed invocation may have left behind.
/// Anything dot-prefixed in the root is ours: real installs never are.
fn reap_stale(root: &Path) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(".stage-") || name.starts_with(".download-") {
            debug!("reaping stale staging entry {}", name);
            let path = entry.path();
            let _ = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
        }
    }
}

/// Download an artifact and commit it as `{root}/{dir_name}`.
///
/// The temporary archive lives next to the destination so the final rename
/// stays on one filesystem, and is deleted on every exit path.
pub fn install_archive(response: Response, root: &Path, dir_name: &str) -> Result<PathBuf> {
    reap_stale(root);
    let archive = tempfile::Builder::new()
        .prefix(".download-")
        .suffix(".zip")
        .tempfile_in(root)?;
    download_to_file(response, archive.path(), dir_name)?;
    stage_install(archive.path(), root, dir_name)
}

/// Owner read/write/execute at minimum, leaving broader bits intact.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Mark a whole bundle executable, the way runtime dependencies ship.
pub fn set_executable_recursive(path: &Path) -> Result<()> {
    set_executable(path)?;
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            set_executable_recursive(&entry?.path())?;
        }
    }
    Ok(())
}

/// Apply executable permissions to a freshly extracted distribution: the
/// entry-point script (current-generation basename probed first) and, when
/// present, the language-server and debug-adapter launchers.
pub fn apply_distribution_permissions(dist_dir: &Path) -> Result<()> {
    let bin = dist_dir.join("bin");
    match platform::exec_candidates()
        .iter()
        .map(|name| bin.join(name))
        .find(|candidate| candidate.exists())
    {
        Some(entry_point) => set_executable(&entry_point)?,
        None => warn!("no entry-point script found under {}", bin.display()),
    }

    let tools = dist_dir.join("lib").join("tools");
    let launchers = [
        tools
            .join("lang-server")
            .join("launcher")
            .join(platform::lang_server_launcher_name()),
        tools
            .join("debug-adapter")
            .join("launcher")
            .join(platform::debug_adapter_name()),
    ];
    for launcher in launchers {
        if launcher.exists() {
            set_executable(&launcher)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use zip::write::SimpleFileOptions;

    fn build_zip(dest: &Path, entries: &[(&str, Option<&str>)]) {
        let file = File::create(dest).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in entries {
            match contents {
                Some(data) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(data.as_bytes()).unwrap();
                }
                None => {
                    writer.add_directory(*name, options).unwrap();
                }
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extract_zip_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dist.zip");
        // file entry arrives before any directory entry for its parent
        build_zip(
            &archive,
            &[("jballerina-1.2.3/bin/bal", Some("#!/bin/sh\n"))],
        );

        let dest = dir.path().join("out");
        extract_zip(&archive, &dest).unwrap();
        assert!(dest.join("jballerina-1.2.3/bin/bal").is_file());
    }

    #[test]
    fn test_stage_install_commits_expected_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dist.zip");
        build_zip(
            &archive,
            &[
                ("ballerina-slp1/", None),
                ("ballerina-slp1/bin/bal", Some("#!/bin/sh\n")),
            ],
        );

        let installed = stage_install(&archive, dir.path(), "ballerina-slp1").unwrap();
        assert!(installed.is_dir());
        assert!(installed.join("bin/bal").is_file());
        // staging directory is gone after the commit
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".stage-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_stage_install_rejects_wrong_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dist.zip");
        build_zip(&archive, &[("unrelated/readme.txt", Some("hi"))]);

        let result = stage_install(&archive, dir.path(), "ballerina-slp1");
        assert!(matches!(result, Err(Error::BadArchive(_))));
        assert!(!dir.path().join("ballerina-slp1").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_executable_adds_owner_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bal");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();

        set_executable(&script).unwrap();
        let mode = fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_distribution_permissions_probes_current_name_first() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("bal"), "#!/bin/sh\n").unwrap();
        fs::write(bin.join("ballerina"), "#!/bin/sh\n").unwrap();
        fs::set_permissions(bin.join("bal"), fs::Permissions::from_mode(0o644)).unwrap();
        fs::set_permissions(bin.join("ballerina"), fs::Permissions::from_mode(0o644)).unwrap();

        apply_distribution_permissions(dir.path()).unwrap();
        let bal_mode = fs::metadata(bin.join("bal")).unwrap().permissions().mode();
        let legacy_mode = fs::metadata(bin.join("ballerina"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(bal_mode & 0o755, 0o755);
        // only the probed entry point is touched
        assert_eq!(legacy_mode & 0o111, 0);
    }
}
