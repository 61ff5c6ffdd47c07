//! Configuration loading and management
//!
//! Handles parsing of the `config.toml` file found under the platform
//! config directory (`~/.config/t0/config.toml` on Linux) or passed with
//! `--config`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::ensure::EnsureConfig;
use crate::error::{Error, Result};
use crate::task::{TAG_ID, TAG_UUID};
use crate::todotxt;

const CONFIG_FILE: &str = "config.toml";
const REDACTED: &str = "<redacted>";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the todo.txt file
    #[serde(default = "default_todo_file")]
    pub todo_file: PathBuf,

    /// Task property enforcement
    #[serde(default)]
    pub ensure: EnsureConfig,

    /// Tracker sync configuration
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            todo_file: default_todo_file(),
            ensure: EnsureConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

fn default_todo_file() -> PathBuf {
    PathBuf::from("todo.txt")
}

/// Per-tracker sync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub gitlab: GitlabConfig,

    #[serde(default)]
    pub openproject: OpenProjectConfig,
}

/// GitHub issues assigned to the token owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_github_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_github_endpoint")]
    pub api_endpoint: String,

    /// Body prefix for issues
    #[serde(default = "default_github_issue_prefix")]
    pub issue_prefix: String,

    /// Body prefix for pull requests
    #[serde(default = "default_github_pull_prefix")]
    pub pull_prefix: String,
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_endpoint() -> String {
    "/issues?filter=assigned&state=all&per_page=100&pulls=1".to_string()
}

fn default_github_issue_prefix() -> String {
    "GitHub Issue: ".to_string()
}

fn default_github_pull_prefix() -> String {
    "GitHub PR: ".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: default_github_base_url(),
            api_endpoint: default_github_endpoint(),
            issue_prefix: default_github_issue_prefix(),
            pull_prefix: default_github_pull_prefix(),
        }
    }
}

/// GitLab issues visible to the token owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitlabConfig {
    /// Personal access token
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_gitlab_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_gitlab_endpoint")]
    pub api_endpoint: String,

    /// Body prefix for issues
    #[serde(default = "default_gitlab_issue_prefix")]
    pub issue_prefix: String,
}

fn default_gitlab_base_url() -> String {
    "https://gitlab.com/api/v4".to_string()
}

fn default_gitlab_endpoint() -> String {
    "/issues".to_string()
}

fn default_gitlab_issue_prefix() -> String {
    "GitLab Issue: ".to_string()
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: default_gitlab_base_url(),
            api_endpoint: default_gitlab_endpoint(),
            issue_prefix: default_gitlab_issue_prefix(),
        }
    }
}

/// OpenProject work packages from a saved query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenProjectConfig {
    /// Instance base URL, e.g. `https://op.example.com`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    /// Saved query whose results are synced
    #[serde(default)]
    pub query_id: String,

    /// Body prefix; a trailing space is added when missing
    #[serde(default = "default_openproject_prefix")]
    pub todo_prefix: String,
}

fn default_openproject_prefix() -> String {
    "OpenProject".to_string()
}

impl Default for OpenProjectConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            query_id: String::new(),
            todo_prefix: default_openproject_prefix(),
        }
    }
}

impl GithubConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url, "sync.github.api_base_url")?;
        validate_endpoint(&self.api_endpoint, "sync.github.api_endpoint")
    }
}

impl GitlabConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url, "sync.gitlab.api_base_url")?;
        validate_endpoint(&self.api_endpoint, "sync.gitlab.api_endpoint")
    }
}

impl OpenProjectConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.query_id.trim().is_empty()
    }

    fn validate(&self) -> Result<()> {
        if !self.url.trim().is_empty() {
            validate_base_url(&self.url, "sync.openproject.url")?;
        }
        Ok(())
    }
}

fn validate_base_url(url: &str, field: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::InvalidConfig(format!(
            "{field}: '{trimmed}' must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str, field: &str) -> Result<()> {
    if !endpoint.starts_with('/') {
        return Err(Error::InvalidConfig(format!(
            "{field}: '{endpoint}' must start with '/'"
        )));
    }
    Ok(())
}

fn validate_default_tags(ensure: &EnsureConfig) -> Result<()> {
    for (key, value) in &ensure.default_tags {
        if !todotxt::is_tag_key(key) {
            return Err(Error::InvalidConfig(format!(
                "ensure.default_tags key '{key}' must use only letters, digits, '_' or '-'"
            )));
        }
        if key == TAG_ID || key == TAG_UUID {
            return Err(Error::InvalidConfig(format!(
                "ensure.default_tags cannot set the identity tag '{key}'"
            )));
        }
        if key == todotxt::DUE_KEY {
            return Err(Error::InvalidConfig(
                "ensure.default_tags cannot set 'due'; it is the task due date".to_string(),
            ));
        }
        if value.trim().is_empty() || value.starts_with("//") {
            return Err(Error::InvalidConfig(format!(
                "ensure.default_tags value for '{key}' cannot be empty or start with '//'"
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Default location of the config file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "t0").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file (which must exist), or the default file when
    /// present, or defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Copy with secrets replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for secret in [
            &mut copy.sync.github.token,
            &mut copy.sync.gitlab.token,
            &mut copy.sync.openproject.api_key,
        ] {
            if !secret.is_empty() {
                *secret = REDACTED.to_string();
            }
        }
        copy
    }

    pub fn validate(&self) -> Result<()> {
        if self.todo_file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("todo_file cannot be empty".to_string()));
        }
        validate_default_tags(&self.ensure)?;
        self.sync.github.validate()?;
        self.sync.gitlab.validate()?;
        self.sync.openproject.validate()?;
        Ok(())
    }
}
