//! reposnap - Branch snapshot fetcher for a fixed set of repositories
//!
//! reposnap brings a configured list of repositories onto local disk, one at a
//! time, either by downloading the zip archive of the first available
//! candidate branch or by cloning with `git`, and replaces the local copy
//! under a single target directory.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading, repository references and resolved settings
//! - [`fetch`]: The [`Fetcher`] seam and its result type
//! - [`github`]: Archive downloads with branch fallback
//! - [`git`]: Clone strategy via the `git` client
//! - [`unpack`]: Archive extraction and wrapper-directory discovery
//! - [`install`]: Forced removal and directory replacement
//! - [`sync`]: The sequential orchestrator

pub mod config;
pub mod error;
pub mod fetch;
pub mod git;
pub mod github;
pub mod install;
pub mod preflight;
pub mod sync;
pub mod unpack;
pub mod workspace;

pub use config::{Config, Overrides, Policy, RepositoryRef, Settings, Strategy, SyncTarget};
pub use error::SyncError;
pub use fetch::{FetchResult, Fetcher};
pub use git::GitClient;
pub use github::ArchiveClient;
pub use sync::{SyncEngine, SyncResult, SyncSummary};
pub use workspace::Workspace;
