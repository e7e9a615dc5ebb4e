use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::{RepositoryRef, Settings};
use crate::error::SyncError;
use crate::fetch::{FetchResult, Fetcher};
use crate::workspace::Workspace;

/// Downloads branch zip archives from the hosting service
pub struct ArchiveClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    api_version: String,
    /// Longest silence tolerated while connecting, waiting for headers or
    /// between two body chunks
    idle_timeout: Duration,
}

/// Outcome of a single branch download attempt
#[derive(Debug, PartialEq, Eq)]
enum Attempt {
    Downloaded,
    BranchMissing,
}

impl ArchiveClient {
    /// Create a client with the inactivity timeout and optional token
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.timeout)
            .user_agent(concat!("reposnap/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        if settings.token.is_some() {
            info!("Using bearer token for archive downloads");
        }

        Ok(Self {
            client,
            base_url: settings.archive_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            api_version: settings.api_version.clone(),
            idle_timeout: settings.timeout,
        })
    }

    /// Archive URL of one branch: `<base>/<owner>/<repo>/zip/refs/heads/<branch>`
    pub fn archive_url(&self, repo: &RepositoryRef, branch: &str) -> String {
        format!(
            "{}/{}/zip/refs/heads/{}",
            self.base_url,
            repo.full_name(),
            branch
        )
    }

    /// Stream one branch archive into `dest`.
    ///
    /// A slow transfer is fine as long as data keeps arriving; only a single
    /// wait longer than the idle timeout aborts it.
    async fn download(
        &self,
        repo: &RepositoryRef,
        url: &str,
        dest: &Path,
    ) -> Result<Attempt, SyncError> {
        let name = repo.full_name();
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request
                .bearer_auth(token)
                .header("X-GitHub-Api-Version", &self.api_version);
        }

        let mut response = timeout(self.idle_timeout, request.send())
            .await
            .map_err(|e| {
                SyncError::transfer_caused_by(name, format!("no response from {}", url), e)
            })?
            .map_err(|e| SyncError::transfer_caused_by(name, format!("request to {} failed", url), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Attempt::BranchMissing);
        }
        if !status.is_success() {
            return Err(SyncError::transfer(
                name,
                format!("{} returned HTTP {}", url, status),
            ));
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            SyncError::transfer_caused_by(name, format!("cannot create {}", dest.display()), e)
        })?;

        let mut written: u64 = 0;
        loop {
            let chunk = timeout(self.idle_timeout, response.chunk())
                .await
                .map_err(|e| {
                    SyncError::transfer_caused_by(
                        name,
                        format!("download of {} stalled after {} bytes", url, written),
                        e,
                    )
                })?
                .map_err(|e| {
                    SyncError::transfer_caused_by(name, format!("download of {} interrupted", url), e)
                })?;

            let chunk = match chunk {
                Some(chunk) => chunk,
                None => break,
            };
            file.write_all(&chunk).await.map_err(|e| {
                SyncError::transfer_caused_by(name, format!("cannot write {}", dest.display()), e)
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            SyncError::transfer_caused_by(name, format!("cannot write {}", dest.display()), e)
        })?;

        debug!("Wrote {} bytes to {}", written, dest.display());
        Ok(Attempt::Downloaded)
    }
}

#[async_trait]
impl Fetcher for ArchiveClient {
    async fn fetch(
        &self,
        repo: &RepositoryRef,
        workspace: &Workspace,
    ) -> Result<FetchResult, SyncError> {
        let dest = workspace.archive_path(repo.name());

        for branch in repo.candidate_branches() {
            let url = self.archive_url(repo, branch);
            info!("Downloading {} ({})", repo, branch);
            debug!("GET {}", url);

            match self.download(repo, &url, &dest).await {
                Ok(Attempt::Downloaded) => {
                    info!("Downloaded {} ({})", repo, branch);
                    return Ok(FetchResult::Archive {
                        path: dest,
                        branch: branch.clone(),
                    });
                }
                Ok(Attempt::BranchMissing) => {
                    info!("Branch {} not found for {}, trying next", branch, repo);
                }
                Err(e) => {
                    let _ = tokio::fs::remove_file(&dest).await;
                    return Err(e);
                }
            }
        }

        Err(SyncError::NotFound {
            repository: repo.full_name().to_string(),
            branches: repo.candidate_branches().to_vec(),
        })
    }
}
