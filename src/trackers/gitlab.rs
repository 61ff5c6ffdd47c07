//! GitLab issues.

use serde::Deserialize;

use super::{date_prefix, get_json, join_url};
use crate::config::GitlabConfig;
use crate::error::{Error, Result};
use crate::task::{Task, TaskList, TAG_STATE, TAG_URL};

pub const NAME: &str = "gitlab";

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabIssue {
    pub title: String,
    pub web_url: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

pub fn to_task_list(issues: Vec<GitlabIssue>, config: &GitlabConfig) -> TaskList {
    issues
        .into_iter()
        .map(|issue| {
            let mut task = Task::new(format!("{}{}", config.issue_prefix, issue.title.trim()));
            task.creation_date = issue.created_at.as_deref().and_then(date_prefix);
            task.due_date = issue.due_date.as_deref().and_then(date_prefix);
            task.set_tag(TAG_URL, issue.web_url);
            if let Some(state) = issue.state.filter(|s| !s.is_empty()) {
                task.set_tag(TAG_STATE, state);
            }
            task
        })
        .collect()
}

pub async fn fetch_gitlab(client: &reqwest::Client, config: &GitlabConfig) -> Result<TaskList> {
    if !config.is_configured() {
        return Err(Error::InvalidConfig(
            "sync.gitlab.token is required (or set GITLAB_TOKEN)".to_string(),
        ));
    }

    let url = join_url(&config.api_base_url, &config.api_endpoint);
    tracing::info!(%url, "fetching gitlab issues");
    let request = client.get(&url).header(TOKEN_HEADER, config.token.trim());

    let issues: Vec<GitlabIssue> = get_json(NAME, request).await?;
    tracing::debug!(count = issues.len(), "gitlab issues received");
    Ok(to_task_list(issues, config))
}
