//! Preflight checks run once before any network activity
//!
//! The write probe is the only check that can abort a run. The remaining
//! checks only produce warnings.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::{Settings, Strategy};
use crate::error::SyncError;
use crate::git::GitClient;

/// Marker created and deleted in the target root to prove it is writable
pub const MARKER_FILE: &str = "_write_test.tmp";

/// Create the target root if needed and prove we can write into it
pub fn check_write_access(root: &Path) -> Result<(), SyncError> {
    let write_err = |source: std::io::Error| SyncError::WriteAccess {
        path: root.to_path_buf(),
        source,
    };

    fs::create_dir_all(root).map_err(write_err)?;

    let marker = root.join(MARKER_FILE);
    let mut file = fs::File::create(&marker).map_err(write_err)?;
    file.write_all(b"ok").map_err(write_err)?;
    drop(file);
    fs::remove_file(&marker).map_err(write_err)?;

    Ok(())
}

/// Non-fatal problems with the environment, as human readable messages
pub fn environment_warnings(settings: &Settings) -> Vec<String> {
    let mut warnings = Vec::new();

    if settings.strategy == Strategy::Clone && !GitClient::is_available() {
        warnings.push(
            "Git not found in PATH; every clone will fail. Install git: https://git-scm.com/downloads"
                .to_string(),
        );
    }

    if settings.strategy == Strategy::Archive && settings.token.is_none() {
        warnings.push(
            "No GitHub token set; downloads are anonymous and private repositories will not be found"
                .to_string(),
        );
    }

    if settings.repositories.is_empty() {
        warnings.push("No repositories configured, nothing to do".to_string());
    }

    warnings
}
