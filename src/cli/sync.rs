//! t0 sync command implementation
//!
//! Fetches tracker issues, merges them into the todo file and writes it
//! back once.

use std::path::PathBuf;

use serde::Serialize;

use super::{Context, SyncArgs, SyncCommands};
use crate::config::SyncConfig;
use crate::ensure::ensure_list;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::reconcile::{reconcile, SyncReport};
use crate::todotxt::TodoFile;
use crate::trackers::{self, TrackerKind};

/// Which trackers to sync, plus flag overrides for their settings
pub struct SyncOptions {
    pub target: SyncTarget,
    pub common: SyncArgs,
    pub overrides: TrackerOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    One(TrackerKind),
    All,
}

#[derive(Debug, Default)]
pub struct TrackerOverrides {
    pub github_token: Option<String>,
    pub github_api_base_url: Option<String>,
    pub gitlab_token: Option<String>,
    pub gitlab_api_base_url: Option<String>,
    pub openproject_url: Option<String>,
    pub openproject_api_key: Option<String>,
    pub openproject_query_id: Option<String>,
}

impl From<SyncCommands> for SyncOptions {
    fn from(cmd: SyncCommands) -> Self {
        match cmd {
            SyncCommands::Github {
                common,
                token,
                api_base_url,
            } => SyncOptions {
                target: SyncTarget::One(TrackerKind::Github),
                common,
                overrides: TrackerOverrides {
                    github_token: token,
                    github_api_base_url: api_base_url,
                    ..TrackerOverrides::default()
                },
            },
            SyncCommands::Gitlab {
                common,
                token,
                api_base_url,
            } => SyncOptions {
                target: SyncTarget::One(TrackerKind::Gitlab),
                common,
                overrides: TrackerOverrides {
                    gitlab_token: token,
                    gitlab_api_base_url: api_base_url,
                    ..TrackerOverrides::default()
                },
            },
            SyncCommands::Openproject {
                common,
                url,
                api_key,
                query_id,
            } => SyncOptions {
                target: SyncTarget::One(TrackerKind::OpenProject),
                common,
                overrides: TrackerOverrides {
                    openproject_url: url,
                    openproject_api_key: api_key,
                    openproject_query_id: query_id,
                    ..TrackerOverrides::default()
                },
            },
            SyncCommands::All {
                common,
                github_token,
                gitlab_token,
                openproject_api_key,
            } => SyncOptions {
                target: SyncTarget::All,
                common,
                overrides: TrackerOverrides {
                    github_token,
                    gitlab_token,
                    openproject_api_key,
                    ..TrackerOverrides::default()
                },
            },
        }
    }
}

impl TrackerOverrides {
    fn apply(self, sync: &mut SyncConfig) {
        let pairs = [
            (self.github_token, &mut sync.github.token),
            (self.github_api_base_url, &mut sync.github.api_base_url),
            (self.gitlab_token, &mut sync.gitlab.token),
            (self.gitlab_api_base_url, &mut sync.gitlab.api_base_url),
            (self.openproject_url, &mut sync.openproject.url),
            (self.openproject_api_key, &mut sync.openproject.api_key),
            (self.openproject_query_id, &mut sync.openproject.query_id),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }
}

#[derive(Serialize)]
struct TrackerResult {
    tracker: TrackerKind,
    #[serde(flatten)]
    report: SyncReport,
}

#[derive(Serialize)]
struct SyncSummary {
    path: PathBuf,
    dry_run: bool,
    trackers: Vec<TrackerResult>,
    #[serde(flatten)]
    total: SyncReport,
}

/// Trackers to fetch for `target`, failing when nothing usable is configured.
fn select_trackers(target: SyncTarget, sync: &SyncConfig) -> Result<Vec<TrackerKind>> {
    match target {
        SyncTarget::One(kind) => {
            if !kind.is_configured(sync) {
                return Err(Error::InvalidConfig(missing_settings_message(kind)));
            }
            Ok(vec![kind])
        }
        SyncTarget::All => {
            let kinds: Vec<TrackerKind> = TrackerKind::ALL
                .into_iter()
                .filter(|kind| kind.is_configured(sync))
                .collect();
            if kinds.is_empty() {
                return Err(Error::InvalidConfig(
                    "no tracker is configured under [sync]".to_string(),
                ));
            }
            Ok(kinds)
        }
    }
}

fn missing_settings_message(kind: TrackerKind) -> String {
    match kind {
        TrackerKind::Github => "sync.github.token is required (or set GITHUB_TOKEN)".to_string(),
        TrackerKind::Gitlab => "sync.gitlab.token is required (or set GITLAB_TOKEN)".to_string(),
        TrackerKind::OpenProject => {
            "sync.openproject.url, api_key and query_id are required".to_string()
        }
    }
}

pub fn run(ctx: Context, options: SyncOptions) -> Result<()> {
    let mut config = ctx.config;
    options.overrides.apply(&mut config.sync);
    config.validate()?;

    let kinds = select_trackers(options.target, &config.sync)?;

    let file = TodoFile::new(config.todo_file.clone());
    let mut target = file.load_or_empty()?;
    ensure_list(&mut target, &config.ensure);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut total = SyncReport::default();
    let mut results = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let source = runtime.block_on(trackers::fetch(kind, &config.sync))?;
        tracing::info!(tracker = %kind, tasks = source.len(), "fetched tracker tasks");
        let (merged, report) = reconcile(target, source);
        target = merged;
        total += report;
        results.push(TrackerResult {
            tracker: kind,
            report,
        });
    }

    let ensured = ensure_list(&mut target, &config.ensure);

    let path = options.common.output.unwrap_or(config.todo_file);
    if options.common.dry_run {
        tracing::info!(path = %path.display(), "dry run; not writing");
    } else {
        TodoFile::new(path.clone()).save(&target)?;
    }

    let header = if options.common.dry_run {
        format!("Dry run for {}", path.display())
    } else {
        format!("Synced {}", path.display())
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Added", total.added.to_string());
    human.push_summary("Updated", total.updated.to_string());
    human.push_summary("Skipped", total.skipped.to_string());
    if results.len() > 1 {
        for result in &results {
            human.push_detail(format!(
                "{}: added {}, updated {}, skipped {}",
                result.tracker, result.report.added, result.report.updated, result.report.skipped
            ));
        }
    }
    for discarded in &ensured.discarded_identities {
        human.push_warning(format!("replaced undecodable identity {discarded}"));
    }
    if options.common.dry_run {
        human.push_next_step("rerun without --dry-run to write the file");
    }

    let command = match options.target {
        SyncTarget::One(kind) => format!("sync {kind}"),
        SyncTarget::All => "sync all".to_string(),
    };
    emit_success(
        ctx.output,
        &command,
        &SyncSummary {
            path,
            dry_run: options.common.dry_run,
            trackers: results,
            total,
        },
        Some(&human),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_values() {
        let mut sync = SyncConfig::default();
        sync.gitlab.token = "from-file".to_string();
        TrackerOverrides {
            github_token: Some("flag".to_string()),
            gitlab_token: Some("  ".to_string()),
            ..TrackerOverrides::default()
        }
        .apply(&mut sync);
        assert_eq!(sync.github.token, "flag");
        assert_eq!(sync.gitlab.token, "from-file");
        assert_eq!(sync.github.api_base_url, "https://api.github.com");
    }

    #[test]
    fn all_selects_configured_trackers_in_order() {
        let mut sync = SyncConfig::default();
        sync.gitlab.token = "t".to_string();
        sync.github.token = "t".to_string();
        let kinds = select_trackers(SyncTarget::All, &sync).expect("kinds");
        assert_eq!(kinds, vec![TrackerKind::Github, TrackerKind::Gitlab]);
    }

    #[test]
    fn unconfigured_tracker_is_a_config_error() {
        let sync = SyncConfig::default();
        assert!(matches!(
            select_trackers(SyncTarget::One(TrackerKind::OpenProject), &sync),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            select_trackers(SyncTarget::All, &sync),
            Err(Error::InvalidConfig(_))
        ));
    }
}
