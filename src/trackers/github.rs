//! GitHub issues and pull requests.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use super::{date_prefix, get_json, join_url};
use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::task::{Task, TaskList, TAG_STATE, TAG_URL};

pub const NAME: &str = "github";

const ACCEPT_V3: &str = "application/vnd.github.v3+json";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssue {
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

impl GithubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.html_url.contains("/pull/")
    }
}

pub fn to_task_list(issues: Vec<GithubIssue>, config: &GithubConfig) -> TaskList {
    issues
        .into_iter()
        .map(|issue| {
            let prefix = if issue.is_pull_request() {
                &config.pull_prefix
            } else {
                &config.issue_prefix
            };
            let mut task = Task::new(format!("{prefix}{}", issue.title.trim()));
            task.creation_date = issue.created_at.as_deref().and_then(date_prefix);
            task.due_date = issue.due_on.as_deref().and_then(date_prefix);
            task.set_tag(TAG_URL, issue.html_url);
            if let Some(state) = issue.state.filter(|s| !s.is_empty()) {
                task.set_tag(TAG_STATE, state);
            }
            task
        })
        .collect()
}

pub async fn fetch_github(client: &reqwest::Client, config: &GithubConfig) -> Result<TaskList> {
    if !config.is_configured() {
        return Err(Error::InvalidConfig(
            "sync.github.token is required (or set GITHUB_TOKEN)".to_string(),
        ));
    }

    let url = join_url(&config.api_base_url, &config.api_endpoint);
    tracing::info!(%url, "fetching github issues");
    let request = client
        .get(&url)
        .header(AUTHORIZATION, format!("token {}", config.token.trim()))
        .header(ACCEPT, ACCEPT_V3);

    let issues: Vec<GithubIssue> = get_json(NAME, request).await?;
    tracing::debug!(count = issues.len(), "github issues received");
    Ok(to_task_list(issues, config))
}
