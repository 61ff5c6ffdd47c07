//! Merge tracker records into the local task list.
//!
//! Records are joined on the `url` tag. Tracker records never touch local
//! completion state or task identity.

use std::collections::HashMap;
use std::ops::AddAssign;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::task::{Task, TaskList, TAG_ID, TAG_MODIFIED, TAG_THRESHOLD, TAG_UUID};

/// Counts from one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.skipped
    }
}

impl AddAssign for SyncReport {
    fn add_assign(&mut self, other: Self) {
        self.added += other.added;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

/// Merge `source` into `target`.
///
/// - source records without a `url` are skipped
/// - records whose `url` matches a target record update it when
///   [`needs_update`] says so, otherwise they are skipped
/// - everything else is appended in source order
pub fn reconcile(target: TaskList, source: TaskList) -> (TaskList, SyncReport) {
    reconcile_at(target, source, Utc::now())
}

fn reconcile_at(
    mut target: TaskList,
    source: TaskList,
    now: DateTime<Utc>,
) -> (TaskList, SyncReport) {
    let mut report = SyncReport::default();

    let mut by_url: HashMap<String, usize> = HashMap::new();
    for (index, task) in target.iter().enumerate() {
        if let Some(url) = task.url() {
            by_url.insert(url.to_string(), index);
        }
    }

    for incoming in source {
        let Some(url) = incoming.url().map(str::to_string) else {
            tracing::warn!(body = %incoming.body, "skipping source task without url");
            report.skipped += 1;
            continue;
        };

        match by_url.get(&url) {
            Some(&index) => {
                let existing = &mut target[index];
                if needs_update(existing, &incoming) {
                    tracing::debug!(%url, "updating task from source");
                    apply_update_at(existing, &incoming, now);
                    report.updated += 1;
                } else {
                    tracing::debug!(%url, "task unchanged");
                    report.skipped += 1;
                }
            }
            None => {
                tracing::debug!(%url, "adding task from source");
                by_url.insert(url, target.len());
                target.push(incoming);
                report.added += 1;
            }
        }
    }

    tracing::info!(
        added = report.added,
        updated = report.updated,
        skipped = report.skipped,
        "reconciled task lists"
    );
    (target, report)
}

/// True when the tracker changed something the local copy mirrors: body,
/// due date, or threshold tag. Completion and identity are local-only.
pub fn needs_update(existing: &Task, source: &Task) -> bool {
    existing.body != source.body
        || existing.due_date != source.due_date
        || existing.tag(TAG_THRESHOLD) != source.tag(TAG_THRESHOLD)
}

/// Copy tracker-owned fields from `source` onto `existing`, keeping the
/// local identity and completion state, and stamp `modified`.
pub fn apply_update(existing: &mut Task, source: &Task) {
    apply_update_at(existing, source, Utc::now());
}

fn apply_update_at(existing: &mut Task, source: &Task, now: DateTime<Utc>) {
    let completed = existing.completed;
    let completion_date = existing.completion_date;
    let identity_tags: Vec<(&str, String)> = [TAG_ID, TAG_UUID]
        .into_iter()
        .filter_map(|key| existing.tag(key).map(|value| (key, value.to_string())))
        .collect();

    existing.body = source.body.clone();
    existing.due_date = source.due_date;
    existing.projects = source.projects.clone();
    existing.contexts = source.contexts.clone();
    existing.tags = source.tags.clone();

    for key in [TAG_ID, TAG_UUID] {
        existing.remove_tag(key);
    }
    for (key, value) in identity_tags {
        existing.set_tag(key, value);
    }

    existing.completed = completed;
    existing.completion_date = completion_date;
    existing.set_tag(TAG_MODIFIED, now.to_rfc3339_opts(SecondsFormat::Secs, true));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TAG_URL;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("time")
    }

    fn tracked(body: &str, url: &str) -> Task {
        let mut task = Task::new(body);
        task.set_tag(TAG_URL, url);
        task
    }

    #[test]
    fn duplicate_urls_in_target_match_last_occurrence() {
        let target: TaskList = vec![tracked("first", "u"), tracked("second", "u")].into();
        let source: TaskList = vec![tracked("changed", "u")].into();
        let (merged, report) = reconcile_at(target, source, now());
        assert_eq!(report.updated, 1);
        assert_eq!(merged[0].body, "first");
        assert_eq!(merged[1].body, "changed");
    }

    #[test]
    fn duplicate_urls_in_source_are_added_once() {
        let source: TaskList = vec![tracked("a", "u"), tracked("a", "u")].into();
        let (merged, report) = reconcile_at(TaskList::new(), source, now());
        assert_eq!(merged.len(), 1);
        assert_eq!(report, SyncReport { added: 1, updated: 0, skipped: 1 });
    }

    #[test]
    fn threshold_presence_mismatch_triggers_update() {
        let existing = tracked("same", "u");
        let mut source = tracked("same", "u");
        assert!(!needs_update(&existing, &source));
        source.set_tag(TAG_THRESHOLD, "2024-07-01");
        assert!(needs_update(&existing, &source));
        assert!(needs_update(&source, &existing));
    }

    #[test]
    fn due_date_change_triggers_update() {
        let existing = tracked("same", "u");
        let mut source = tracked("same", "u");
        source.due_date = NaiveDate::from_ymd_opt(2024, 7, 1);
        assert!(needs_update(&existing, &source));
    }

    #[test]
    fn other_tag_changes_do_not_trigger_update() {
        let existing = tracked("same", "u");
        let mut source = tracked("same", "u");
        source.set_tag("state", "closed");
        source.completed = true;
        assert!(!needs_update(&existing, &source));
    }

    #[test]
    fn apply_update_keeps_identity_and_stamps_modified() {
        let mut existing = tracked("old", "u");
        existing.set_tag(TAG_ID, "tI4JMLyHOGsqsq86FlAqsp");
        existing.set_tag("local", "note");
        let mut source = tracked("new +proj @ctx", "u");
        source.set_tag(TAG_ID, "should-not-win");
        source.set_tag("state", "open");

        apply_update_at(&mut existing, &source, now());

        assert_eq!(existing.body, "new +proj @ctx");
        assert_eq!(existing.projects, vec!["proj".to_string()]);
        assert_eq!(existing.contexts, vec!["ctx".to_string()]);
        assert_eq!(existing.tag(TAG_ID), Some("tI4JMLyHOGsqsq86FlAqsp"));
        assert_eq!(existing.tag("state"), Some("open"));
        assert_eq!(existing.tag("local"), None);
        assert_eq!(existing.tag(TAG_MODIFIED), Some("2024-06-01T12:00:00Z"));
    }

    #[test]
    fn apply_update_drops_source_identity_when_existing_has_none() {
        let mut existing = tracked("old", "u");
        let mut source = tracked("new", "u");
        source.set_tag(TAG_UUID, "0192da75-c158-7d7f-be3c-d5b647bf7fa8");
        apply_update_at(&mut existing, &source, now());
        assert!(!existing.has_tag(TAG_UUID));
        assert!(!existing.has_tag(TAG_ID));
    }

    #[test]
    fn reports_sum() {
        let mut total = SyncReport { added: 1, updated: 2, skipped: 3 };
        total += SyncReport { added: 4, updated: 0, skipped: 1 };
        assert_eq!(total, SyncReport { added: 5, updated: 2, skipped: 4 });
        assert_eq!(total.total(), 11);
    }
}
