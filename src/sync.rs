//! Sync Engine - Orchestrates sequential repository synchronization
//!
//! Repositories are processed one at a time in configured order:
//! fetch, unpack (archive strategy only), install. A failure is recorded
//! against its repository and the run moves on to the next one; only a
//! failed write probe or workspace setup aborts the whole run.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{Policy, RepositoryRef, Settings};
use crate::error::SyncError;
use crate::fetch::{fetcher_for, FetchResult, Fetcher};
use crate::install::install;
use crate::preflight;
use crate::unpack::unpack;
use crate::workspace::Workspace;

/// Result of syncing one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// Destination now holds a fresh copy
    Installed {
        repository: String,
        path: PathBuf,
        /// Branch the archive came from; `None` for clones
        branch: Option<String>,
    },
    /// Left alone because of the policy
    Skipped {
        repository: String,
        path: PathBuf,
        reason: String,
    },
    /// Operation failed with error
    Failed { repository: String, error: String },
}

/// Results from a complete sync run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub total_repositories: usize,
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration: Duration,
    pub results: Vec<SyncResult>,
}

impl SyncSummary {
    /// Compile sync summary from results
    pub fn from_results(results: Vec<SyncResult>, duration: Duration) -> Self {
        let mut installed = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for result in &results {
            match result {
                SyncResult::Installed { .. } => installed += 1,
                SyncResult::Skipped { .. } => skipped += 1,
                SyncResult::Failed { .. } => failed += 1,
            }
        }

        Self {
            total_repositories: results.len(),
            installed,
            skipped,
            failed,
            duration,
            results,
        }
    }
}

/// The main sync engine that orchestrates repository synchronization
pub struct SyncEngine {
    settings: Settings,
    fetcher: Box<dyn Fetcher>,
}

impl SyncEngine {
    /// Create a new sync engine using the fetcher for the configured strategy
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let fetcher = fetcher_for(&settings)?;
        Ok(Self::with_fetcher(settings, fetcher))
    }

    pub fn with_fetcher(settings: Settings, fetcher: Box<dyn Fetcher>) -> Self {
        Self { settings, fetcher }
    }

    /// Run a complete sync: preflight, then every repository in order.
    ///
    /// Only run-fatal errors are returned; per-repository failures are
    /// reported in the summary.
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        let start_time = Instant::now();
        let root = &self.settings.target.root_directory;

        info!("Checking write access to {}", root.display());
        preflight::check_write_access(root)?;

        for warning in preflight::environment_warnings(&self.settings) {
            warn!("{}", warning);
        }

        let workspace = Workspace::create()?;
        info!(
            "Syncing {} repositories into {} ({:?}, {:?})",
            self.settings.repositories.len(),
            root.display(),
            self.settings.strategy,
            self.settings.policy
        );

        let mut results = Vec::with_capacity(self.settings.repositories.len());
        for repo in &self.settings.repositories {
            let result = match self.sync_repository(repo, &workspace).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Failed to sync {}: {}", repo, e);
                    SyncResult::Failed {
                        repository: repo.full_name().to_string(),
                        error: e.to_string(),
                    }
                }
            };
            debug!("Sync completed: {:?}", result);
            results.push(result);
        }

        workspace.close();

        let summary = SyncSummary::from_results(results, start_time.elapsed());
        info!(
            "Sync completed in {:.2}s: {} installed, {} skipped, {} failed",
            summary.duration.as_secs_f64(),
            summary.installed,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    /// Fetch, unpack and install a single repository
    pub async fn sync_repository(
        &self,
        repo: &RepositoryRef,
        workspace: &Workspace,
    ) -> Result<SyncResult, SyncError> {
        let destination = self.settings.target.destination_for(repo);

        if self.settings.policy == Policy::SkipIfPresent && destination.exists() {
            info!("Already present, skipping: {}", destination.display());
            return Ok(SyncResult::Skipped {
                repository: repo.full_name().to_string(),
                path: destination,
                reason: "destination already exists".to_string(),
            });
        }

        let (tree, branch) = match self.fetcher.fetch(repo, workspace).await? {
            FetchResult::Archive { path, branch } => {
                let root = unpack(&path, &workspace.scratch_dir(repo.name()))?;
                if let Err(e) = std::fs::remove_file(&path) {
                    debug!("Could not remove archive {}: {}", path.display(), e);
                }
                (root, Some(branch))
            }
            FetchResult::WorkingTree(path) => (path, None),
        };

        install(&tree, &destination)?;
        info!("Ready: {}", destination.display());

        Ok(SyncResult::Installed {
            repository: repo.full_name().to_string(),
            path: destination,
            branch,
        })
    }
}
