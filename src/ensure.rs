//! Task property normalization.
//!
//! Brings each task in line with the list invariants: a creation date, a
//! completion date on completed tasks, exactly one identity tag in the
//! preferred form, and any configured default tags.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{Identity, IdentityForm};
use crate::task::{Task, TaskList, TAG_ID, TAG_UUID};

/// Options for [`ensure_task`] and [`ensure_list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureConfig {
    /// Persist identities in the short `id` form instead of the long `uuid` form
    #[serde(default = "default_true")]
    pub prefer_short_ids: bool,

    /// Completed tasks must carry a completion date
    #[serde(default = "default_true")]
    pub enforce_completion_date: bool,

    /// Every task must carry a creation date
    #[serde(default = "default_true")]
    pub enforce_creation_date: bool,

    /// Tags added to every task that does not already set them
    #[serde(default)]
    pub default_tags: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for EnsureConfig {
    fn default() -> Self {
        Self {
            prefer_short_ids: true,
            enforce_completion_date: true,
            enforce_creation_date: true,
            default_tags: BTreeMap::new(),
        }
    }
}

impl EnsureConfig {
    pub fn preferred_form(&self) -> IdentityForm {
        if self.prefer_short_ids {
            IdentityForm::Short
        } else {
            IdentityForm::Long
        }
    }
}

/// What [`ensure_task`] changed on one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnsureOutcome {
    pub created_date_set: bool,
    pub completion_date_set: bool,
    pub identity_minted: bool,
    pub identity_reencoded: bool,
    /// Identity tag values that failed to decode and were replaced.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discarded_identity: Vec<String>,
    pub default_tags_added: usize,
}

impl EnsureOutcome {
    pub fn changed(&self) -> bool {
        self.created_date_set
            || self.completion_date_set
            || self.identity_minted
            || self.identity_reencoded
            || !self.discarded_identity.is_empty()
            || self.default_tags_added > 0
    }
}

/// Totals over a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnsureReport {
    pub tasks: usize,
    pub changed: usize,
    pub created_dates_set: usize,
    pub completion_dates_set: usize,
    pub identities_minted: usize,
    pub identities_reencoded: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discarded_identities: Vec<String>,
    pub default_tags_added: usize,
}

impl EnsureReport {
    fn record(&mut self, outcome: EnsureOutcome) {
        self.tasks += 1;
        if outcome.changed() {
            self.changed += 1;
        }
        self.created_dates_set += usize::from(outcome.created_date_set);
        self.completion_dates_set += usize::from(outcome.completion_date_set);
        self.identities_minted += usize::from(outcome.identity_minted);
        self.identities_reencoded += usize::from(outcome.identity_reencoded);
        self.discarded_identities.extend(outcome.discarded_identity);
        self.default_tags_added += outcome.default_tags_added;
    }
}

/// Normalize one task in place. Never fails; only fills gaps.
pub fn ensure_task(task: &mut Task, config: &EnsureConfig) -> EnsureOutcome {
    ensure_task_on(task, config, Utc::now().date_naive())
}

/// Normalize every task in place, in list order.
pub fn ensure_list(tasks: &mut TaskList, config: &EnsureConfig) -> EnsureReport {
    let today = Utc::now().date_naive();
    let mut report = EnsureReport::default();
    for task in tasks.iter_mut() {
        report.record(ensure_task_on(task, config, today));
    }
    report
}

fn ensure_task_on(task: &mut Task, config: &EnsureConfig, today: NaiveDate) -> EnsureOutcome {
    let mut outcome = EnsureOutcome::default();

    if config.enforce_creation_date && task.creation_date.is_none() {
        task.creation_date = Some(today);
        outcome.created_date_set = true;
    }

    if config.enforce_completion_date && task.completed && task.completion_date.is_none() {
        task.completion_date = Some(today);
        outcome.completion_date_set = true;
    }

    ensure_identity(task, config.preferred_form(), &mut outcome);

    for (key, value) in &config.default_tags {
        if !task.has_tag(key) {
            task.set_tag(key.clone(), value.clone());
            outcome.default_tags_added += 1;
        }
    }

    outcome
}

fn ensure_identity(task: &mut Task, preferred: IdentityForm, outcome: &mut EnsureOutcome) {
    let mut resolved: Option<Identity> = None;

    for key in [TAG_UUID, TAG_ID] {
        let Some(value) = task.tag(key) else {
            continue;
        };
        match Identity::decode(value) {
            Ok(identity) => {
                resolved.get_or_insert(identity);
            }
            Err(err) => {
                tracing::warn!(
                    tag = key,
                    value,
                    body = %task.body,
                    error = %err,
                    "discarding undecodable identity tag"
                );
                outcome.discarded_identity.push(format!("{key}:{value}"));
            }
        }
    }

    let identity = match resolved {
        Some(identity) => identity,
        None => {
            outcome.identity_minted = true;
            Identity::new()
        }
    };

    let encoded = identity.encode(preferred);
    let other_tag = match preferred {
        IdentityForm::Short => TAG_UUID,
        IdentityForm::Long => TAG_ID,
    };
    let removed_other = task.remove_tag(other_tag).is_some();
    let in_place = task.tag(preferred.tag()) == Some(encoded.as_str());
    if !outcome.identity_minted && (removed_other || !in_place) {
        outcome.identity_reencoded = true;
    }
    task.set_tag(preferred.tag(), encoded);
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "0192da75-c158-7d7f-be3c-d5b647bf7fa8";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
    }

    fn fixed_identity() -> Identity {
        Identity::decode(LONG).expect("identity")
    }

    #[test]
    fn fills_creation_date_and_short_id() {
        let mut task = Task::new("Write report");
        let outcome = ensure_task_on(&mut task, &EnsureConfig::default(), today());
        assert_eq!(task.creation_date, Some(today()));
        assert!(outcome.created_date_set);
        assert!(outcome.identity_minted);
        let id = task.tag(TAG_ID).expect("id tag");
        assert!(Identity::decode(id).is_ok());
        assert!(!task.has_tag(TAG_UUID));
    }

    #[test]
    fn completed_task_gets_completion_date() {
        let mut task = Task::new("Done");
        task.completed = true;
        let outcome = ensure_task_on(&mut task, &EnsureConfig::default(), today());
        assert_eq!(task.completion_date, Some(today()));
        assert!(outcome.completion_date_set);
    }

    #[test]
    fn disabled_date_enforcement_leaves_dates_alone() {
        let config = EnsureConfig {
            enforce_completion_date: false,
            enforce_creation_date: false,
            ..EnsureConfig::default()
        };
        let mut task = Task::new("Done");
        task.completed = true;
        ensure_task_on(&mut task, &config, today());
        assert_eq!(task.creation_date, None);
        assert_eq!(task.completion_date, None);
    }

    #[test]
    fn uuid_tag_is_converted_to_short_id() {
        let mut task = Task::new("Migrate");
        task.set_tag(TAG_UUID, LONG);
        let outcome = ensure_task_on(&mut task, &EnsureConfig::default(), today());
        assert!(outcome.identity_reencoded);
        assert!(!outcome.identity_minted);
        assert!(!task.has_tag(TAG_UUID));
        assert_eq!(task.tag(TAG_ID), Some(fixed_identity().encode_short().as_str()));
    }

    #[test]
    fn short_id_is_converted_to_uuid_when_long_preferred() {
        let config = EnsureConfig {
            prefer_short_ids: false,
            ..EnsureConfig::default()
        };
        let mut task = Task::new("Migrate");
        task.set_tag(TAG_ID, fixed_identity().encode_short());
        ensure_task_on(&mut task, &config, today());
        assert!(!task.has_tag(TAG_ID));
        assert_eq!(task.tag(TAG_UUID), Some(LONG));
    }

    #[test]
    fn uuid_wins_over_id_when_both_decode() {
        let other = Identity::new();
        let mut task = Task::new("Both");
        task.set_tag(TAG_UUID, LONG);
        task.set_tag(TAG_ID, other.encode_short());
        ensure_task_on(&mut task, &EnsureConfig::default(), today());
        assert_eq!(task.tag(TAG_ID), Some(fixed_identity().encode_short().as_str()));
        assert!(!task.has_tag(TAG_UUID));
    }

    #[test]
    fn garbage_identity_is_replaced_and_reported() {
        let mut task = Task::new("Broken");
        task.set_tag(TAG_ID, "not-a-valid-uuid-format");
        let outcome = ensure_task_on(&mut task, &EnsureConfig::default(), today());
        assert!(outcome.identity_minted);
        assert_eq!(outcome.discarded_identity, vec!["id:not-a-valid-uuid-format".to_string()]);
        assert_ne!(task.tag(TAG_ID), Some("not-a-valid-uuid-format"));
        assert!(Identity::decode(task.tag(TAG_ID).expect("id")).is_ok());
    }

    #[test]
    fn garbage_uuid_falls_back_to_valid_id() {
        let mut task = Task::new("Half broken");
        task.set_tag(TAG_UUID, "zzzz");
        task.set_tag(TAG_ID, fixed_identity().encode_short());
        let outcome = ensure_task_on(&mut task, &EnsureConfig::default(), today());
        assert!(!outcome.identity_minted);
        assert_eq!(task.identity(), Some(fixed_identity()));
        assert!(!task.has_tag(TAG_UUID));
    }

    #[test]
    fn default_tags_do_not_override_existing_values() {
        let mut config = EnsureConfig::default();
        config.default_tags.insert("app".to_string(), "t0".to_string());
        config.default_tags.insert("state".to_string(), "open".to_string());
        let mut task = Task::new("Tagged");
        task.set_tag("state", "closed");
        let outcome = ensure_task_on(&mut task, &config, today());
        assert_eq!(task.tag("app"), Some("t0"));
        assert_eq!(task.tag("state"), Some("closed"));
        assert_eq!(outcome.default_tags_added, 1);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut config = EnsureConfig::default();
        config.default_tags.insert("app".to_string(), "t0".to_string());
        for prefer_short_ids in [true, false] {
            config.prefer_short_ids = prefer_short_ids;
            let mut task = Task::new("Idempotent +p @c");
            task.completed = true;
            task.set_tag(TAG_ID, "garbage");
            ensure_task_on(&mut task, &config, today());
            let once = task.clone();
            let outcome = ensure_task_on(&mut task, &config, today());
            assert_eq!(task, once);
            assert!(!outcome.changed(), "{outcome:?}");
        }
    }

    #[test]
    fn ensure_list_reports_totals_in_order() {
        let mut tasks: TaskList = vec![Task::new("a"), Task::new("b")].into();
        tasks[1].set_tag(TAG_UUID, LONG);
        let report = ensure_list(&mut tasks, &EnsureConfig::default());
        assert_eq!(report.tasks, 2);
        assert_eq!(report.changed, 2);
        assert_eq!(report.identities_minted, 1);
        assert_eq!(report.identities_reencoded, 1);
        assert_eq!(tasks[0].body, "a");
        assert_eq!(tasks[1].identity(), Some(fixed_identity()));
    }
}
