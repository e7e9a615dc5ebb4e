//! Installer - replaces a destination directory with a freshly fetched tree
//!
//! Removal is best effort: every entry has its permissions normalized before
//! it is deleted, individual failures are collected instead of aborting, and
//! an error is only reported when something is still left on disk. The
//! replace is not transactional; if the process dies between removal and
//! move the destination is simply absent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SyncError;

/// Move `source` to `destination`, removing whatever was there before.
///
/// `source` is consumed: on success it no longer exists.
pub fn install(source: &Path, destination: &Path) -> Result<(), SyncError> {
    let install_err = |source: io::Error| SyncError::Install {
        path: destination.to_path_buf(),
        source,
    };

    if fs::symlink_metadata(destination).is_ok() {
        debug!("Removing existing {}", destination.display());
        remove_dir_forced(destination).map_err(install_err)?;
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(install_err)?;
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Typically the workspace lives on another filesystem
            debug!(
                "Rename {} -> {} failed ({}), copying instead",
                source.display(),
                destination.display(),
                e
            );
            if let Err(e) = copy_tree(source, destination) {
                let _ = remove_dir_forced(destination);
                return Err(install_err(e));
            }
            if let Err(e) = remove_dir_forced(source) {
                warn!("Failed to clean up {}: {}", source.display(), e);
            }
            Ok(())
        }
    }
}

/// Recursively delete `path`, clearing restrictive permissions as it goes.
///
/// Keeps going past entries it cannot delete and fails only if `path`
/// still exists at the end.
pub fn remove_dir_forced(path: &Path) -> io::Result<()> {
    let mut failures: Vec<(PathBuf, io::Error)> = Vec::new();
    remove_entry(path, &mut failures);

    if fs::symlink_metadata(path).is_err() {
        for (entry, e) in &failures {
            debug!("Transient removal failure at {}: {}", entry.display(), e);
        }
        return Ok(());
    }

    let detail = failures
        .first()
        .map(|(entry, e)| format!("{}: {}", entry.display(), e))
        .unwrap_or_else(|| "unknown cause".to_string());
    Err(io::Error::new(
        io::ErrorKind::Other,
        format!(
            "{} entries under {} could not be removed (first: {})",
            failures.len(),
            path.display(),
            detail
        ),
    ))
}

fn remove_entry(path: &Path, failures: &mut Vec<(PathBuf, io::Error)>) {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            failures.push((path.to_path_buf(), e));
            return;
        }
    };

    if metadata.is_dir() {
        // Needs write and execute before its children can go
        let _ = make_writable(path, true);

        match fs::read_dir(path) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok(entry) => remove_entry(&entry.path(), failures),
                        Err(e) => failures.push((path.to_path_buf(), e)),
                    }
                }
            }
            Err(e) => failures.push((path.to_path_buf(), e)),
        }

        if let Err(e) = fs::remove_dir(path) {
            failures.push((path.to_path_buf(), e));
        }
        return;
    }

    if let Err(first) = fs::remove_file(path) {
        if first.kind() != io::ErrorKind::PermissionDenied {
            failures.push((path.to_path_buf(), first));
            return;
        }
        if !metadata.file_type().is_symlink() {
            let _ = make_writable(path, false);
        }
        if let Some(parent) = path.parent() {
            let _ = make_writable(parent, true);
        }
        if let Err(e) = fs::remove_file(path) {
            failures.push((path.to_path_buf(), e));
        }
    }
}

#[cfg(unix)]
fn make_writable(path: &Path, is_dir: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let bits = if is_dir { 0o700 } else { 0o600 };
    permissions.set_mode(permissions.mode() | bits);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_writable(path: &Path, _is_dir: bool) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

/// Copy a tree for moves that `rename` cannot do
fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    let points_to = fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}
