use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info, warn};

use crate::config::{RepositoryRef, Settings};
use crate::error::SyncError;
use crate::fetch::{FetchResult, Fetcher};
use crate::install::remove_dir_forced;
use crate::workspace::Workspace;

/// Clone strategy: materializes a full working tree with the `git` client
#[derive(Debug, Clone)]
pub struct GitClient {
    clone_base: String,
}

impl GitClient {
    /// Create a new Git client with the given settings
    pub fn new(settings: &Settings) -> Self {
        Self {
            clone_base: settings.clone_url.trim_end_matches('/').to_string(),
        }
    }

    /// Clone URL of a repository: `<base>/<owner>/<repo>.git`
    pub fn clone_url(&self, repo: &RepositoryRef) -> String {
        format!("{}/{}.git", self.clone_base, repo.full_name())
    }

    /// Whether a `git` binary can be executed
    pub fn is_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Clone a repository into `target_path`
    pub async fn clone_repository(
        &self,
        repo: &RepositoryRef,
        target_path: &Path,
    ) -> Result<(), SyncError> {
        let clone_url = self.clone_url(repo);
        info!("Cloning repository: {} -> {}", repo, target_path.display());
        debug!("Using clone URL: {}", clone_url);

        let output = AsyncCommand::new("git")
            .args(["clone", "--quiet", clone_url.as_str()])
            .arg(target_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| SyncError::transfer_caused_by(repo.full_name(), "failed to run git", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if target_path.exists() {
                if let Err(e) = remove_dir_forced(target_path) {
                    warn!("Failed to clean up partial clone: {}", e);
                }
            }
            return Err(SyncError::transfer(
                repo.full_name(),
                format!("git clone exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        info!("Successfully cloned: {}", repo);
        Ok(())
    }
}

#[async_trait]
impl Fetcher for GitClient {
    async fn fetch(
        &self,
        repo: &RepositoryRef,
        workspace: &Workspace,
    ) -> Result<FetchResult, SyncError> {
        let target_path = workspace.scratch_dir(repo.name());
        self.clone_repository(repo, &target_path).await?;
        Ok(FetchResult::WorkingTree(target_path))
    }
}
