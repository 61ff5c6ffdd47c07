//! t0 todo command implementation
//!
//! `todo update` normalizes the file in place; `todo list` prints it.

use std::path::PathBuf;

use serde::Serialize;

use super::Context;
use crate::ensure::{ensure_list, EnsureReport};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::Task;
use crate::todotxt::{format_task, TodoFile};

/// Options for the update command
pub struct UpdateOptions {
    pub long_ids: bool,
    pub no_completion_date: bool,
    pub no_creation_date: bool,
    pub tags: Vec<String>,
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct UpdateReport {
    path: PathBuf,
    #[serde(flatten)]
    ensure: EnsureReport,
}

#[derive(Serialize)]
struct ListedTask<'a> {
    line: usize,
    text: String,
    task: &'a Task,
}

pub fn run_update(ctx: Context, options: UpdateOptions) -> Result<()> {
    let mut config = ctx.config;
    if options.long_ids {
        config.ensure.prefer_short_ids = false;
    }
    if options.no_completion_date {
        config.ensure.enforce_completion_date = false;
    }
    if options.no_creation_date {
        config.ensure.enforce_creation_date = false;
    }
    for raw in &options.tags {
        let (key, value) = parse_tag_arg(raw)?;
        config.ensure.default_tags.insert(key, value);
    }
    config.validate()?;

    let mut tasks = TodoFile::new(config.todo_file.clone()).load()?;
    let report = ensure_list(&mut tasks, &config.ensure);

    let path = options.output.unwrap_or(config.todo_file);
    TodoFile::new(path.clone()).save(&tasks)?;
    tracing::info!(path = %path.display(), changed = report.changed, "todo file updated");

    let mut human = HumanOutput::new(format!("Updated {}", path.display()));
    human.push_summary("tasks", report.tasks.to_string());
    human.push_summary("changed", report.changed.to_string());
    human.push_summary("creation dates set", report.created_dates_set.to_string());
    human.push_summary("completion dates set", report.completion_dates_set.to_string());
    human.push_summary("identities minted", report.identities_minted.to_string());
    human.push_summary("identities re-encoded", report.identities_reencoded.to_string());
    human.push_summary("default tags added", report.default_tags_added.to_string());
    for discarded in &report.discarded_identities {
        human.push_warning(format!("replaced undecodable identity {discarded}"));
    }

    emit_success(
        ctx.output,
        "todo update",
        &UpdateReport {
            path,
            ensure: report,
        },
        Some(&human),
    )
}

pub fn run_list(ctx: Context) -> Result<()> {
    let path = ctx.config.todo_file;
    let tasks = TodoFile::new(path.clone()).load_numbered()?;

    let listed: Vec<ListedTask<'_>> = tasks
        .iter()
        .map(|(line, task)| ListedTask {
            line: *line,
            text: format_task(task),
            task,
        })
        .collect();

    let mut human = HumanOutput::new(format!("{} ({} tasks)", path.display(), listed.len()));
    for entry in &listed {
        human.push_detail(format!("{:>3} {}", entry.line, entry.text));
    }

    emit_success(ctx.output, "todo list", &listed, Some(&human))
}

/// Parse a `--tag key:value` argument.
fn parse_tag_arg(raw: &str) -> Result<(String, String)> {
    match raw.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::InvalidArgument(format!(
            "--tag expects key:value, got '{raw}'"
        ))),
    }
}
