use anyhow::{anyhow, bail, Context, Result};
use dirs::config_dir;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Main configuration structure for reposnap
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory every repository is materialized under
    #[serde(default = "default_target_directory")]
    pub target_directory: String,

    /// Repositories to fetch, in order
    #[serde(default = "default_repositories")]
    pub repositories: Vec<RepositoryEntry>,

    /// Fetch behavior settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Hosting service endpoints and credentials
    #[serde(default)]
    pub github: GitHubConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A repository as written in the configuration file: either a bare
/// `owner/name` or a mapping with its own branch list.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RepositoryEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        branches: Option<Vec<String>>,
    },
}

/// How a repository is brought onto disk
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Download the branch zip archive and unpack it
    #[default]
    Archive,
    /// Run `git clone`
    Clone,
}

/// What to do when the destination directory already exists
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Fetch again and replace the existing directory
    #[default]
    AlwaysReplace,
    /// Leave an existing directory alone
    SkipIfPresent,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub policy: Policy,

    /// Candidate branches for repositories that don't list their own
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,

    /// Timeout for a single archive request in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Hosting service configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    /// Base URL serving branch zip archives
    #[serde(default = "default_archive_url")]
    pub archive_url: String,

    /// Base URL used to build clone URLs
    #[serde(default = "default_clone_url")]
    pub clone_url: String,

    /// Environment variable holding an optional bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Value of the X-GitHub-Api-Version header sent with authenticated requests
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact", "full"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

// Default value functions
fn default_target_directory() -> String {
    dirs::home_dir()
        .map(|home| home.join("repos").to_string_lossy().into_owned())
        .unwrap_or_else(|| "repos".to_string())
}
fn default_repositories() -> Vec<RepositoryEntry> {
    ["FHWN-Robotik/WS-KI", "FHWN-Robotik/WS-IndRob", "FHWN-Robotik/WS-MobRob"]
        .into_iter()
        .map(|name| RepositoryEntry::Name(name.to_string()))
        .collect()
}
fn default_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}
fn default_timeout() -> u64 {
    120
}
fn default_archive_url() -> String {
    "https://codeload.github.com".to_string()
}
fn default_clone_url() -> String {
    "https://github.com".to_string()
}
fn default_token_env() -> String {
    "GH_TOKEN".to_string()
}
fn default_api_version() -> String {
    "2022-11-28".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}
fn default_true() -> bool {
    true
}

// Default implementations
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            policy: Policy::default(),
            branches: default_branches(),
            timeout: default_timeout(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            archive_url: default_archive_url(),
            clone_url: default_clone_url(),
            token_env: default_token_env(),
            api_version: default_api_version(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_true(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_directory: default_target_directory(),
            repositories: default_repositories(),
            sync: SyncConfig::default(),
            github: GitHubConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// One remote repository and the branches to try, first match wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    owner_and_name: String,
    candidate_branches: Vec<String>,
}

impl RepositoryRef {
    /// Validate an `owner/name` identifier and pair it with its branches
    pub fn new(owner_and_name: &str, candidate_branches: Vec<String>) -> Result<Self> {
        let owner_and_name = owner_and_name.trim();
        let parts: Vec<&str> = owner_and_name.split('/').collect();

        if parts.len() != 2 {
            bail!(
                "Invalid repository identifier '{}': expected owner/name",
                owner_and_name
            );
        }
        for part in &parts {
            if part.is_empty() || *part == "." || *part == ".." || part.contains('\\') {
                bail!(
                    "Invalid repository identifier '{}': bad component '{}'",
                    owner_and_name,
                    part
                );
            }
        }

        let candidate_branches: Vec<String> = candidate_branches
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if candidate_branches.is_empty() {
            bail!("Repository {} has no candidate branches", owner_and_name);
        }

        Ok(Self {
            owner_and_name: owner_and_name.to_string(),
            candidate_branches,
        })
    }

    pub fn full_name(&self) -> &str {
        &self.owner_and_name
    }

    /// Repository name without the owner, used as the destination folder
    pub fn name(&self) -> &str {
        self.owner_and_name
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.owner_and_name)
    }

    pub fn candidate_branches(&self) -> &[String] {
        &self.candidate_branches
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.owner_and_name)
    }
}

/// Root directory under which every repository lands as `<root>/<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub root_directory: PathBuf,
}

impl SyncTarget {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
        }
    }

    pub fn destination_for(&self, repo: &RepositoryRef) -> PathBuf {
        self.root_directory.join(repo.name())
    }
}

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target_directory: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub policy: Option<Policy>,
    pub repositories: Vec<String>,
}

/// Fully resolved, immutable settings handed to the sync engine
#[derive(Debug, Clone)]
pub struct Settings {
    pub target: SyncTarget,
    pub repositories: Vec<RepositoryRef>,
    pub strategy: Strategy,
    pub policy: Policy,
    pub timeout: Duration,
    pub archive_url: String,
    pub clone_url: String,
    pub api_version: String,
    pub token: Option<String>,
}

impl Settings {
    /// Settings for the given target and repositories with every other
    /// value taken from the defaults
    pub fn new(target: SyncTarget, repositories: Vec<RepositoryRef>) -> Self {
        let config = Config::default();
        Self {
            target,
            repositories,
            strategy: config.sync.strategy,
            policy: config.sync.policy,
            timeout: Duration::from_secs(config.sync.timeout),
            archive_url: config.github.archive_url,
            clone_url: config.github.clone_url,
            api_version: config.github.api_version,
            token: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            debug!(
                "No configuration at {:?}, using built-in defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("reposnap").join("config.yml"))
    }

    /// `target_directory` with `~` and environment variables expanded
    pub fn expanded_target_directory(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.target_directory)
            .context("Failed to expand target_directory path")?;

        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Apply command-line overrides and validate everything into [`Settings`]
    pub fn resolve(&self, overrides: &Overrides) -> Result<Settings> {
        // An explicit target replaces the configured one entirely, so the
        // configured value is only expanded when it is actually used
        let root = match &overrides.target_directory {
            Some(root) => root.clone(),
            None => self.expanded_target_directory()?,
        };

        let repositories = if overrides.repositories.is_empty() {
            self.repositories
                .iter()
                .map(|entry| self.repository_ref(entry))
                .collect::<Result<Vec<_>>>()?
        } else {
            overrides
                .repositories
                .iter()
                .map(|name| RepositoryRef::new(name, self.sync.branches.clone()))
                .collect::<Result<Vec<_>>>()?
        };

        let mut seen = HashSet::new();
        for repo in &repositories {
            if !seen.insert(repo.name().to_lowercase()) {
                return Err(anyhow!(
                    "Repository name '{}' appears more than once; destinations would collide",
                    repo.name()
                ));
            }
        }

        Ok(Settings {
            target: SyncTarget::new(root),
            repositories,
            strategy: overrides.strategy.unwrap_or(self.sync.strategy),
            policy: overrides.policy.unwrap_or(self.sync.policy),
            timeout: Duration::from_secs(self.sync.timeout),
            archive_url: self.github.archive_url.clone(),
            clone_url: self.github.clone_url.clone(),
            api_version: self.github.api_version.clone(),
            token: read_token(&self.github.token_env),
        })
    }

    fn repository_ref(&self, entry: &RepositoryEntry) -> Result<RepositoryRef> {
        match entry {
            RepositoryEntry::Name(name) => RepositoryRef::new(name, self.sync.branches.clone()),
            RepositoryEntry::Detailed { name, branches } => RepositoryRef::new(
                name,
                branches.clone().unwrap_or_else(|| self.sync.branches.clone()),
            ),
        }
    }
}

/// Read an optional bearer token from the named environment variable
fn read_token(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => {
            debug!("Using token from {}", var);
            Some(token.trim().to_string())
        }
        _ => {
            debug!("{} not set, requests will be anonymous", var);
            None
        }
    }
}
