//! OpenProject work packages from a saved query.
//!
//! The API returns HAL documents; work packages sit under
//! `_embedded.results._embedded.elements`.

use serde::Deserialize;

use super::{date_prefix, get_json, join_url};
use crate::config::OpenProjectConfig;
use crate::error::{Error, Result};
use crate::task::{Task, TaskList, TAG_STATE, TAG_THRESHOLD, TAG_URL};

pub const NAME: &str = "openproject";

const API_USER: &str = "apikey";

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(rename = "_embedded")]
    pub embedded: QueryEmbedded,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryEmbedded {
    pub results: WorkPackageCollection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkPackageCollection {
    #[serde(rename = "_embedded")]
    pub embedded: WorkPackageElements,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkPackageElements {
    #[serde(default)]
    pub elements: Vec<WorkPackage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPackage {
    pub id: u64,
    pub subject: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: WorkPackageLinks,
    /// Instance-specific fields. Not mapped onto tasks.
    #[serde(default)]
    pub custom_fields: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkPackageLinks {
    #[serde(default)]
    pub project: Link,
    #[serde(rename = "type", default)]
    pub kind: Link,
    #[serde(default)]
    pub status: Link,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub title: Option<String>,
}

impl Link {
    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

impl QueryResponse {
    pub fn into_work_packages(self) -> Vec<WorkPackage> {
        self.embedded.results.embedded.elements
    }
}

/// `prefix` with exactly one trailing space, or empty.
fn body_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed} ")
    }
}

pub fn to_task_list(packages: Vec<WorkPackage>, config: &OpenProjectConfig) -> TaskList {
    let prefix = body_prefix(&config.todo_prefix);
    let base = config.url.trim_end_matches('/');

    packages
        .into_iter()
        .map(|package| {
            let subject = package.subject.trim();
            let title = [package.links.project.title(), package.links.kind.title(), Some(subject)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(": ");

            let mut task = Task::new(format!("{prefix}{title}"));
            task.creation_date = package.created_at.as_deref().and_then(date_prefix);
            task.due_date = package.due_date.as_deref().and_then(date_prefix);
            if let Some(start) = package.start_date.as_deref().and_then(date_prefix) {
                task.set_tag(TAG_THRESHOLD, start.format("%Y-%m-%d").to_string());
            }
            task.set_tag(TAG_URL, format!("{base}/wp/{}", package.id));
            if let Some(state) = package.links.status.title() {
                task.set_tag(TAG_STATE, state);
            }
            task
        })
        .collect()
}

pub async fn fetch_openproject(
    client: &reqwest::Client,
    config: &OpenProjectConfig,
) -> Result<TaskList> {
    for (key, value) in [
        ("url", &config.url),
        ("api_key", &config.api_key),
        ("query_id", &config.query_id),
    ] {
        if value.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("sync.openproject.{key} is required")));
        }
    }

    let url = join_url(
        &config.url,
        &format!("/api/v3/queries/{}", config.query_id.trim()),
    );
    tracing::info!(%url, "fetching openproject query");
    let request = client
        .get(&url)
        .basic_auth(API_USER, Some(config.api_key.trim()));

    let response: QueryResponse = get_json(NAME, request).await?;
    let packages = response.into_work_packages();
    tracing::debug!(count = packages.len(), "openproject work packages received");
    Ok(to_task_list(packages, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FIXTURE: &str = r#"{
        "_type": "Query",
        "_embedded": {
            "results": {
                "_type": "WorkPackageCollection",
                "total": 2,
                "_embedded": {
                    "elements": [
                        {
                            "id": 42,
                            "subject": "Install router",
                            "startDate": "2024-05-01",
                            "dueDate": "2024-05-10",
                            "createdAt": "2024-04-28T08:00:00Z",
                            "customFields": { "customField3": "rack 4" },
                            "_links": {
                                "project": { "href": "/api/v3/projects/1", "title": "Network" },
                                "type": { "href": "/api/v3/types/1", "title": "Task" },
                                "status": { "href": "/api/v3/statuses/7", "title": "In progress" }
                            }
                        },
                        {
                            "id": 43,
                            "subject": "Untyped",
                            "_links": {}
                        }
                    ]
                }
            }
        }
    }"#;

    fn config() -> OpenProjectConfig {
        OpenProjectConfig {
            url: "https://op.example.com/".to_string(),
            api_key: "key".to_string(),
            query_id: "9".to_string(),
            ..OpenProjectConfig::default()
        }
    }

    #[test]
    fn converts_query_results() {
        let response: QueryResponse = serde_json::from_str(FIXTURE).expect("fixture");
        let packages = response.into_work_packages();
        assert_eq!(
            packages[0]
                .custom_fields
                .as_ref()
                .and_then(|fields| fields.get("customField3"))
                .and_then(|v| v.as_str()),
            Some("rack 4")
        );

        let tasks = to_task_list(packages, &config());
        assert_eq!(tasks.len(), 2);

        let first = &tasks[0];
        assert_eq!(first.body, "OpenProject Network: Task: Install router");
        assert_eq!(first.url(), Some("https://op.example.com/wp/42"));
        assert_eq!(first.tag(TAG_THRESHOLD), Some("2024-05-01"));
        assert_eq!(first.tag(TAG_STATE), Some("In progress"));
        assert_eq!(first.due_date, NaiveDate::from_ymd_opt(2024, 5, 10));
        assert_eq!(first.creation_date, NaiveDate::from_ymd_opt(2024, 4, 28));
        assert!(!first.has_tag("customField3"));

        let second = &tasks[1];
        assert_eq!(second.body, "OpenProject Untyped");
        assert!(!second.has_tag(TAG_THRESHOLD));
        assert!(!second.has_tag(TAG_STATE));
    }

    #[test]
    fn prefix_gets_single_trailing_space() {
        assert_eq!(body_prefix("OP"), "OP ");
        assert_eq!(body_prefix("OP:  "), "OP: ");
        assert_eq!(body_prefix(""), "");
    }
}
