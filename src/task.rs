//! Task records and ordered task lists.
//!
//! A [`Task`] is one todo.txt line in structured form. Metadata lives in
//! `tags` as `key:value` pairs; the keys the sync layer relies on are
//! exported as `TAG_*` constants.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Short-form identity tag.
pub const TAG_ID: &str = "id";
/// Long-form identity tag.
pub const TAG_UUID: &str = "uuid";
/// Join key for tracker sync.
pub const TAG_URL: &str = "url";
/// Tracker state (`open`, `closed`, ...).
pub const TAG_STATE: &str = "state";
/// Threshold date.
pub const TAG_THRESHOLD: &str = "t";
/// RFC 3339 timestamp of the last upstream update.
pub const TAG_MODIFIED: &str = "modified";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDate>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Task {
    /// Create an open task, collecting `+project` and `@context` markers
    /// from the body.
    pub fn new(body: impl Into<String>) -> Self {
        let mut task = Task::default();
        task.set_body(body);
        task
    }

    /// Replace the body and recompute projects and contexts from it.
    /// Runs of whitespace collapse to one space, as a todo.txt line keeps them.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into().split_whitespace().collect::<Vec<_>>().join(" ");
        let (projects, contexts) = markers(&self.body);
        self.projects = projects;
        self.contexts = contexts;
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn remove_tag(&mut self, key: &str) -> Option<String> {
        self.tags.remove(key)
    }

    /// Join key used to match tracker records.
    pub fn url(&self) -> Option<&str> {
        self.tag(TAG_URL)
    }

    /// Decoded identity, preferring the long-form `uuid` tag over `id`.
    pub fn identity(&self) -> Option<Identity> {
        [TAG_UUID, TAG_ID]
            .iter()
            .filter_map(|key| self.tag(key))
            .find_map(|value| Identity::decode(value).ok())
    }

    /// Mark the task done on `date`.
    pub fn complete(&mut self, date: NaiveDate) {
        self.completed = true;
        self.completion_date = Some(date);
    }
}

/// Collect `+project` and `@context` markers in order of appearance,
/// dropping duplicates.
pub fn markers(body: &str) -> (Vec<String>, Vec<String>) {
    let mut projects: Vec<String> = Vec::new();
    let mut contexts: Vec<String> = Vec::new();
    for word in body.split_whitespace() {
        let (list, name) = if let Some(name) = word.strip_prefix('+') {
            (&mut projects, name)
        } else if let Some(name) = word.strip_prefix('@') {
            (&mut contexts, name)
        } else {
            continue;
        };
        if name.is_empty() || list.iter().any(|existing| existing == name) {
            continue;
        }
        list.push(name.to_string());
    }
    (projects, contexts)
}

/// Ordered task collection. Order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList(Vec<Task>);

impl TaskList {
    pub fn new() -> Self {
        TaskList(Vec::new())
    }

    pub fn push(&mut self, task: Task) {
        self.0.push(task);
    }

    pub fn into_inner(self) -> Vec<Task> {
        self.0
    }
}

impl Deref for TaskList {
    type Target = [Task];

    fn deref(&self) -> &[Task] {
        &self.0
    }
}

impl DerefMut for TaskList {
    fn deref_mut(&mut self) -> &mut [Task] {
        &mut self.0
    }
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        TaskList(tasks)
    }
}

impl FromIterator<Task> for TaskList {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        TaskList(iter.into_iter().collect())
    }
}

impl IntoIterator for TaskList {
    type Item = Task;
    type IntoIter = std::vec::IntoIter<Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
