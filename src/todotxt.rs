//! todo.txt line codec and file store.
//!
//! Line layout:
//!
//! ```text
//! [x [completion-date] ][(P) ][creation-date ]body words... key:value... due:YYYY-MM-DD
//! ```
//!
//! `key:value` tokens are lifted out of the body into tags; `due:` fills the
//! typed due date. `+project` and `@context` words stay in the body.
//!
//! Body words that would otherwise read back as something else are escaped
//! with a backslash: `key\:value` for tag-shaped words, and `\x`, `\(A)` or
//! `\2024-01-01` for a first word shaped like a leading field. Words that
//! already look escaped get one more backslash, so every body round-trips.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::task::{Task, TaskList};

const DATE_FORMAT: &str = "%Y-%m-%d";
/// Tag key that fills the typed due date.
pub const DUE_KEY: &str = "due";
const ESCAPE: char = '\\';

/// Parse one todo.txt line.
///
/// Errors report line 1; [`parse_numbered`] reports real line numbers.
pub fn parse_line(line: &str) -> Result<Task> {
    parse_task(line).map_err(|message| Error::TodoParse { line: 1, message })
}

/// Parse a whole file, pairing each task with its 1-based line number.
/// Blank lines are skipped but still counted.
pub fn parse_numbered(content: &str) -> Result<Vec<(usize, Task)>> {
    let mut tasks = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let task = parse_task(line).map_err(|message| Error::TodoParse {
            line: index + 1,
            message,
        })?;
        tasks.push((index + 1, task));
    }
    Ok(tasks)
}

/// Parse a whole file, skipping blank lines.
pub fn parse_list(content: &str) -> Result<TaskList> {
    Ok(parse_numbered(content)?
        .into_iter()
        .map(|(_, task)| task)
        .collect())
}

/// Render one task as a todo.txt line.
pub fn format_task(task: &Task) -> String {
    let mut parts: Vec<String> = Vec::new();

    if task.completed {
        parts.push("x".to_string());
        if let Some(date) = task.completion_date {
            parts.push(date.format(DATE_FORMAT).to_string());
        }
    }
    if let Some(priority) = task.priority {
        parts.push(format!("({priority})"));
    }
    if let Some(date) = task.creation_date {
        parts.push(date.format(DATE_FORMAT).to_string());
    }
    for (position, word) in task.body.split_whitespace().enumerate() {
        parts.push(escape_word(word, position == 0));
    }
    for (key, value) in &task.tags {
        if value.is_empty() {
            continue;
        }
        parts.push(format!("{key}:{}", sanitize_value(value)));
    }
    if let Some(due) = task.due_date {
        parts.push(format!("{DUE_KEY}:{}", due.format(DATE_FORMAT)));
    }

    parts.join(" ")
}

/// Render a list, one task per line with a trailing newline.
pub fn format_list(tasks: &TaskList) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format_task(task));
        out.push('\n');
    }
    out
}

/// Keys that read back as tags: `[A-Za-z0-9_-]+`.
pub fn is_tag_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Values that read back as tags: non-empty, no whitespace, and not the
/// `//...` tail of a bare URL.
pub fn is_tag_value(value: &str) -> bool {
    !value.is_empty() && !value.starts_with("//") && !value.contains(char::is_whitespace)
}

fn parse_task(line: &str) -> std::result::Result<Task, String> {
    let mut rest = line.trim();
    if rest.is_empty() {
        return Err("empty line".to_string());
    }

    let mut task = Task::default();

    if let Some(after) = rest.strip_prefix("x ") {
        task.completed = true;
        rest = after.trim_start();
        if let Some((date, after)) = take_date(rest) {
            task.completion_date = Some(date);
            rest = after;
        }
    }

    if let Some((priority, after)) = take_priority(rest) {
        task.priority = Some(priority);
        rest = after;
    }

    if let Some((date, after)) = take_date(rest) {
        task.creation_date = Some(date);
        rest = after;
    }

    let mut words: Vec<String> = Vec::new();
    for (position, word) in rest.split_whitespace().enumerate() {
        match split_tag(word) {
            Some((DUE_KEY, value)) => match NaiveDate::parse_from_str(value, DATE_FORMAT) {
                Ok(due) => task.due_date = Some(due),
                Err(err) => {
                    tracing::debug!(word, error = %err, "keeping unparseable due date as text");
                    words.push(word.to_string());
                }
            },
            Some((key, value)) => {
                task.tags.insert(key.to_string(), value.to_string());
            }
            None => words.push(unescape_word(word, position == 0)),
        }
    }

    task.set_body(words.join(" "));
    Ok(task)
}

fn take_date(input: &str) -> Option<(NaiveDate, &str)> {
    let (head, tail) = split_first_word(input);
    Some((parse_date_word(head)?, tail))
}

fn take_priority(input: &str) -> Option<(char, &str)> {
    let (head, tail) = split_first_word(input);
    Some((parse_priority_word(head)?, tail))
}

fn parse_date_word(word: &str) -> Option<NaiveDate> {
    if word.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(word, DATE_FORMAT).ok()
}

fn parse_priority_word(word: &str) -> Option<char> {
    let mut chars = word.chars();
    match (chars.next(), chars.next(), chars.next(), chars.next()) {
        (Some('('), Some(priority), Some(')'), None) if priority.is_ascii_uppercase() => {
            Some(priority)
        }
        _ => None,
    }
}

fn split_first_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim_start()),
        None => (input, ""),
    }
}

fn split_tag(word: &str) -> Option<(&str, &str)> {
    let (key, value) = word.split_once(':')?;
    (is_tag_key(key) && is_tag_value(value)).then_some((key, value))
}

/// Byte offset of the colon in `key\...\:value`, a word that reads as a tag
/// once the backslashes before the colon are dropped.
fn escaped_tag_colon(word: &str) -> Option<usize> {
    let (head, value) = word.split_once(':')?;
    let key = head.trim_end_matches(ESCAPE);
    (key.len() < head.len() && is_tag_key(key) && is_tag_value(value)).then_some(head.len())
}

/// A word the line parser would consume as completion mark, priority or
/// date when it comes first.
fn is_leading_field(word: &str) -> bool {
    word == "x" || parse_priority_word(word).is_some() || parse_date_word(word).is_some()
}

fn escape_word(word: &str, leading: bool) -> String {
    if split_tag(word).is_some() || escaped_tag_colon(word).is_some() {
        if let Some((head, value)) = word.split_once(':') {
            return format!("{head}{ESCAPE}:{value}");
        }
    }
    if leading && is_leading_field(word.trim_start_matches(ESCAPE)) {
        return format!("{ESCAPE}{word}");
    }
    word.to_string()
}

fn unescape_word(word: &str, leading: bool) -> String {
    if let Some(colon) = escaped_tag_colon(word) {
        return format!("{}{}", &word[..colon - 1], &word[colon..]);
    }
    if leading {
        if let Some(stripped) = word.strip_prefix(ESCAPE) {
            if is_leading_field(stripped.trim_start_matches(ESCAPE)) {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_whitespace() { '_' } else { ch })
        .collect()
}

/// A todo.txt file on disk.
#[derive(Debug, Clone)]
pub struct TodoFile {
    path: PathBuf,
}

impl TodoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TaskList> {
        let tasks = parse_list(&self.read()?)?;
        tracing::debug!(path = %self.path.display(), tasks = tasks.len(), "loaded todo file");
        Ok(tasks)
    }

    /// Like [`TodoFile::load`], keeping each task's line number in the file.
    pub fn load_numbered(&self) -> Result<Vec<(usize, Task)>> {
        parse_numbered(&self.read()?)
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|source| Error::TodoFile {
            op: "read",
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`TodoFile::load`], but a missing file is an empty list.
    pub fn load_or_empty(&self) -> Result<TaskList> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "todo file missing; starting empty");
            return Ok(TaskList::new());
        }
        self.load()
    }

    /// Write the list atomically: temp file in the same directory, then rename.
    pub fn save(&self, tasks: &TaskList) -> Result<()> {
        let write_err = |source: std::io::Error| Error::TodoFile {
            op: "write",
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        temp.write_all(format_list(tasks).as_bytes())
            .map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path).map_err(|err| write_err(err.error))?;

        tracing::debug!(path = %self.path.display(), tasks = tasks.len(), "saved todo file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn parses_full_completed_line() {
        let task = parse_line(
            "x 2024-03-02 (A) 2024-03-01 Ship +release @work url:https://x/1 due:2024-03-05",
        )
        .expect("parse");
        assert!(task.completed);
        assert_eq!(task.completion_date, Some(date(2024, 3, 2)));
        assert_eq!(task.priority, Some('A'));
        assert_eq!(task.creation_date, Some(date(2024, 3, 1)));
        assert_eq!(task.body, "Ship +release @work");
        assert_eq!(task.projects, vec!["release".to_string()]);
        assert_eq!(task.contexts, vec!["work".to_string()]);
        assert_eq!(task.url(), Some("https://x/1"));
        assert_eq!(task.due_date, Some(date(2024, 3, 5)));
    }

    #[test]
    fn open_line_with_single_date_is_creation() {
        let task = parse_line("2024-01-10 Buy milk").expect("parse");
        assert!(!task.completed);
        assert_eq!(task.creation_date, Some(date(2024, 1, 10)));
        assert_eq!(task.completion_date, None);
    }

    #[test]
    fn completed_line_with_single_date_is_completion() {
        let task = parse_line("x 2024-01-10 Buy milk").expect("parse");
        assert_eq!(task.completion_date, Some(date(2024, 1, 10)));
        assert_eq!(task.creation_date, None);
    }

    #[rstest]
    #[case("see http://example.com/a", "see http://example.com/a")]
    #[case("trailing: colon", "trailing: colon")]
    #[case("(a) lowercase priority", "(a) lowercase priority")]
    #[case("xylophone practice", "xylophone practice")]
    fn body_tokens_that_are_not_tags(#[case] line: &str, #[case] body: &str) {
        let task = parse_line(line).expect("parse");
        assert_eq!(task.body, body);
    }

    #[test]
    fn word_key_value_is_lifted_into_tags() {
        let task = parse_line("meet at:noon").expect("parse");
        assert_eq!(task.tag("at"), Some("noon"));
        assert_eq!(task.body, "meet");
    }

    #[test]
    fn unparseable_due_stays_in_body() {
        let tasks = parse_list("ok\nbad due:someday\n").expect("parse");
        assert_eq!(tasks[1].body, "bad due:someday");
        assert_eq!(tasks[1].due_date, None);
        assert!(!tasks[1].has_tag("due"));
        assert_eq!(format_task(&tasks[1]), "bad due\\:someday");
    }

    #[rstest]
    #[case("Handle due:tomorrow keyword", "Handle due\\:tomorrow keyword")]
    #[case("Fix key:value parsing", "Fix key\\:value parsing")]
    #[case("Set due:2024-01-01 in config", "Set due\\:2024-01-01 in config")]
    #[case("already a\\:b escaped", "already a\\\\:b escaped")]
    #[case("x marks the spot", "\\x marks the spot")]
    #[case("(B) is a heading", "\\(B) is a heading")]
    #[case("2024-05-01 retro notes", "\\2024-05-01 retro notes")]
    #[case("\\x was escaped", "\\\\x was escaped")]
    #[case("http://example.com stays", "http://example.com stays")]
    #[case("mix x and (C) later", "mix x and (C) later")]
    fn body_words_survive_a_round_trip(#[case] body: &str, #[case] line: &str) {
        let task = Task::new(body);
        assert_eq!(format_task(&task), line);
        let reparsed = parse_line(line).expect("reparse");
        assert_eq!(reparsed, task);
        assert!(!reparsed.completed);
        assert!(reparsed.tags.is_empty());
    }

    #[test]
    fn escaped_words_follow_leading_fields() {
        let mut task = Task::new("x due:soon");
        task.completed = true;
        task.priority = Some('A');
        task.set_tag("url", "https://x/1");
        let line = format_task(&task);
        assert_eq!(line, "x (A) \\x due\\:soon url:https://x/1");
        assert_eq!(parse_line(&line).expect("reparse"), task);
    }

    #[test]
    fn parse_numbered_counts_blank_lines() {
        let tasks = parse_numbered("one\n\n   \ntwo\n").expect("parse");
        let lines: Vec<usize> = tasks.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![1, 4]);
    }

    #[test]
    fn format_then_parse_is_stable() {
        let line = "x 2024-03-02 (B) 2024-03-01 Fix +core @dev id:tI4JMLyHOGsq state:open due:2024-04-01";
        let task = parse_line(line).expect("parse");
        let formatted = format_task(&task);
        assert_eq!(parse_line(&formatted).expect("reparse"), task);
        assert_eq!(formatted, line);
    }

    #[test]
    fn format_replaces_whitespace_in_tag_values() {
        let mut task = Task::new("Review");
        task.set_tag("state", "in progress");
        assert_eq!(format_task(&task), "Review state:in_progress");
    }

    #[test]
    fn parse_list_skips_blank_lines() {
        let tasks = parse_list("one\n\n   \ntwo\n").expect("parse");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].body, "two");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TodoFile::new(dir.path().join("todo.txt"));
        let tasks = parse_list("(A) 2024-01-01 first\nx 2024-01-03 2024-01-02 second\n")
            .expect("parse");
        file.save(&tasks).expect("save");
        assert_eq!(file.load().expect("load"), tasks);
    }

    #[test]
    fn load_or_empty_tolerates_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TodoFile::new(dir.path().join("missing.txt"));
        assert!(file.load_or_empty().expect("empty").is_empty());
        assert!(matches!(file.load(), Err(Error::TodoFile { op: "read", .. })));
    }
}
