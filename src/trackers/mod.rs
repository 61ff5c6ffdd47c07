//! Read-only issue tracker adapters.
//!
//! Each adapter turns tracker JSON into a [`TaskList`] whose tasks carry a
//! `url` tag (the reconcile join key) and, where the tracker has one, a
//! `state` tag. Conversion is pure; fetching is async over `reqwest`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::task::TaskList;

pub mod github;
pub mod gitlab;
pub mod openproject;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    Github,
    Gitlab,
    OpenProject,
}

impl TrackerKind {
    pub const ALL: [TrackerKind; 3] = [
        TrackerKind::Github,
        TrackerKind::Gitlab,
        TrackerKind::OpenProject,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrackerKind::Github => github::NAME,
            TrackerKind::Gitlab => gitlab::NAME,
            TrackerKind::OpenProject => openproject::NAME,
        }
    }

    pub fn is_configured(self, config: &SyncConfig) -> bool {
        match self {
            TrackerKind::Github => config.github.is_configured(),
            TrackerKind::Gitlab => config.gitlab.is_configured(),
            TrackerKind::OpenProject => config.openproject.is_configured(),
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TrackerKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown tracker: {s}")))
    }
}

/// Fetch every task `kind` exposes with the given settings.
pub async fn fetch(kind: TrackerKind, config: &SyncConfig) -> Result<TaskList> {
    let client = http_client()?;
    match kind {
        TrackerKind::Github => github::fetch_github(&client, &config.github).await,
        TrackerKind::Gitlab => gitlab::fetch_gitlab(&client, &config.gitlab).await,
        TrackerKind::OpenProject => {
            openproject::fetch_openproject(&client, &config.openproject).await
        }
    }
}

pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("t0/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

/// Send `request` and decode a JSON body, mapping non-2xx statuses to
/// [`Error::Tracker`].
async fn get_json<T: DeserializeOwned>(
    tracker: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request.send().await.map_err(|err| Error::Tracker {
        tracker,
        message: err.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let url = response.url().to_string();
        tracing::warn!(tracker, %status, %url, "tracker request rejected");
        return Err(Error::Tracker {
            tracker,
            message: format!("{url} returned status {status}"),
        });
    }

    let body = response.json::<T>().await?;
    Ok(body)
}

/// Join a base URL and a path without doubling the slash.
fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Date part of `YYYY-MM-DD` or an RFC 3339 timestamp.
fn date_prefix(value: &str) -> Option<NaiveDate> {
    let head = value.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
