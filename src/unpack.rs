//! Unpacker - extracts a branch archive and locates its wrapper directory
//!
//! Hosting services wrap the branch contents in one synthetic folder named
//! like `<repo>-<ref>`. The whole archive is extracted into a scratch
//! directory and the path of that single folder is returned.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

use crate::error::SyncError;

/// Extract `archive_path` into `scratch` and return the wrapper directory.
///
/// Fails with [`SyncError::MalformedArchive`] when no entry lives under a
/// directory, or when more than one top-level directory is present.
pub fn unpack(archive_path: &Path, scratch: &Path) -> Result<PathBuf, SyncError> {
    let file = File::open(archive_path)
        .map_err(|e| SyncError::malformed(archive_path, format!("cannot open: {}", e)))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| SyncError::malformed(archive_path, e.to_string()))?;

    let root = wrapper_directory(archive.file_names(), archive_path)?;
    debug!(
        "Archive {} has wrapper directory '{}'",
        archive_path.display(),
        root
    );

    fs::create_dir_all(scratch)
        .map_err(|e| SyncError::malformed(archive_path, format!("cannot create scratch: {}", e)))?;
    archive
        .extract(scratch)
        .map_err(|e| SyncError::malformed(archive_path, format!("extraction failed: {}", e)))?;

    let extracted = scratch.join(&root);
    if !extracted.is_dir() {
        return Err(SyncError::malformed(
            archive_path,
            format!("wrapper '{}' was not extracted as a directory", root),
        ));
    }
    Ok(extracted)
}

/// The single distinct first path component among entries inside a directory
fn wrapper_directory<'a>(
    names: impl Iterator<Item = &'a str>,
    archive_path: &Path,
) -> Result<String, SyncError> {
    let roots: BTreeSet<&str> = names
        .filter_map(|name| name.split_once('/').map(|(first, _)| first))
        .filter(|first| !first.is_empty())
        .collect();

    let mut iter = roots.iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(SyncError::malformed(
            archive_path,
            "no top-level directory (archive is empty or contains only loose files)",
        )),
        (Some(root), None) => Ok(root.to_string()),
        (Some(_), Some(_)) => Err(SyncError::malformed(
            archive_path,
            format!(
                "expected one top-level directory, found {}: {}",
                roots.len(),
                roots.iter().copied().collect::<Vec<_>>().join(", ")
            ),
        )),
    }
}
