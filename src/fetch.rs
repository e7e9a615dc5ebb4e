//! Fetcher - turns a repository reference into bytes or a working tree on disk

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::{RepositoryRef, Settings, Strategy};
use crate::error::SyncError;
use crate::git::GitClient;
use crate::github::ArchiveClient;
use crate::workspace::Workspace;

/// What a fetch produced inside the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Zip archive of `branch`, still to be unpacked
    Archive { path: PathBuf, branch: String },
    /// A complete working tree, ready to install
    WorkingTree(PathBuf),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        repo: &RepositoryRef,
        workspace: &Workspace,
    ) -> Result<FetchResult, SyncError>;
}

/// Build the fetcher for the configured strategy
pub fn fetcher_for(settings: &Settings) -> anyhow::Result<Box<dyn Fetcher>> {
    Ok(match settings.strategy {
        Strategy::Archive => Box::new(ArchiveClient::new(settings)?),
        Strategy::Clone => Box::new(GitClient::new(settings)),
    })
}
