//! Flat-file persistence for goals, logs and the future-you conversation.
//!
//! Each collection lives in its own pretty-printed JSON file under the data
//! directory. Everything is loaded once on open and held in memory; every
//! mutation rewrites the affected file before the in-memory copy changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::LifedashError;
use crate::models::{ChatMessage, Goal, LogEntry};

pub const GOALS_FILE: &str = "goals.json";
pub const LOGS_FILE: &str = "logs.json";
pub const CHAT_FILE: &str = "future_chat.json";

/// Read a JSON file, falling back to `default` when it is missing or unreadable.
///
/// A file that exists but does not parse is moved aside to `<name>.corrupt`
/// so the next save cannot overwrite it.
pub fn load_json<T: DeserializeOwned>(path: &Path, default: T) -> T {
    if !path.exists() {
        return default;
    }

    let parsed = fs::read_to_string(path)
        .map_err(LifedashError::from)
        .and_then(|raw| serde_json::from_str(&raw).map_err(LifedashError::from));

    match parsed {
        Ok(value) => value,
        Err(e) => {
            let aside = corrupt_path(path);
            match fs::rename(path, &aside) {
                Ok(()) => tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Unreadable data file moved aside, starting empty"
                ),
                Err(rename_err) => tracing::error!(
                    path = %path.display(),
                    error = %e,
                    rename_error = %rename_err,
                    "Unreadable data file could not be moved aside"
                ),
            }
            default
        }
    }
}

/// `goals.json` -> `goals.json.corrupt`
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Write `data` as 2-space indented JSON. Non-ASCII text is written as-is.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), LifedashError> {
    let body = serde_json::to_string_pretty(data)?;
    fs::write(path, body).map_err(|source| {
        tracing::error!(path = %path.display(), error = %source, "Failed to save data file");
        LifedashError::Persistence {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[derive(Debug)]
pub struct JsonStore {
    data_dir: PathBuf,
    goals: Vec<Goal>,
    logs: Vec<LogEntry>,
    chat: Vec<ChatMessage>,
}

impl JsonStore {
    /// Create the data directory if needed and load all three collections.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, LifedashError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let goals: Vec<Goal> = load_json(&data_dir.join(GOALS_FILE), Vec::new());
        let logs: Vec<LogEntry> = load_json(&data_dir.join(LOGS_FILE), Vec::new());
        let chat: Vec<ChatMessage> = load_json(&data_dir.join(CHAT_FILE), Vec::new());

        tracing::info!(
            data_dir = %data_dir.display(),
            goals = goals.len(),
            logs = logs.len(),
            chat_messages = chat.len(),
            "Loaded data from disk"
        );

        Ok(Self {
            data_dir,
            goals,
            logs,
            chat,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn has_goal(&self, name: &str) -> bool {
        self.goals.iter().any(|g| g.name == name)
    }

    pub fn add_goal(&mut self, goal: Goal) -> Result<(), LifedashError> {
        let mut next = self.goals.clone();
        next.push(goal);
        save_json(&self.data_dir.join(GOALS_FILE), &next)?;
        self.goals = next;
        Ok(())
    }

    /// Remove the goal at `index`. Logs that reference it are kept.
    pub fn delete_goal(&mut self, index: usize) -> Result<Goal, LifedashError> {
        if index >= self.goals.len() {
            return Err(LifedashError::NotFound(format!("goal #{}", index)));
        }

        let mut next = self.goals.clone();
        let removed = next.remove(index);
        save_json(&self.data_dir.join(GOALS_FILE), &next)?;
        self.goals = next;
        Ok(removed)
    }

    pub fn add_log(&mut self, entry: LogEntry) -> Result<(), LifedashError> {
        if !self.has_goal(&entry.goal) {
            return Err(LifedashError::validation(format!(
                "No goal named '{}'. Create it in Set Goals first.",
                entry.goal
            )));
        }

        let mut next = self.logs.clone();
        next.push(entry);
        save_json(&self.data_dir.join(LOGS_FILE), &next)?;
        self.logs = next;
        Ok(())
    }

    pub fn append_chat(&mut self, message: ChatMessage) -> Result<(), LifedashError> {
        let mut next = self.chat.clone();
        next.push(message);
        save_json(&self.data_dir.join(CHAT_FILE), &next)?;
        self.chat = next;
        Ok(())
    }

    pub fn clear_chat(&mut self) -> Result<(), LifedashError> {
        save_json(&self.data_dir.join(CHAT_FILE), &Vec::<ChatMessage>::new())?;
        self.chat.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_open_creates_dir_and_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let store = JsonStore::open(&dir).unwrap();

        assert!(dir.is_dir());
        assert!(store.goals().is_empty());
        assert!(store.logs().is_empty());
        assert!(store.chat_history().is_empty());
    }

    #[test]
    fn test_mutations_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut store = JsonStore::open(tmp.path()).unwrap();
            store
                .add_goal(Goal::new("Run", Category::Health, Some("energy")).unwrap())
                .unwrap();
            store.add_log(LogEntry::new("Run", day(3), "5k")).unwrap();
            store.append_chat(ChatMessage::user("Am I on track?")).unwrap();
        }

        let store = JsonStore::open(tmp.path()).unwrap();
        assert_eq!(store.goals().len(), 1);
        assert_eq!(store.goals()[0].description, "energy");
        assert_eq!(store.logs()[0].date, "2024-05-03");
        assert_eq!(store.chat_history()[0].content, "Am I on track?");
    }

    #[test]
    fn test_saved_file_is_indented_and_keeps_unicode() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        store
            .add_goal(Goal::new("Apprendre le français", Category::Education, None).unwrap())
            .unwrap();

        let raw = fs::read_to_string(tmp.path().join(GOALS_FILE)).unwrap();
        assert!(raw.contains("français"));
        assert!(raw.contains("\n    \"Goal\""), "expected 2-space indentation: {}", raw);
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(LOGS_FILE), "{not json").unwrap();

        let mut store = JsonStore::open(tmp.path()).unwrap();
        assert!(store.logs().is_empty());

        let aside = tmp.path().join("logs.json.corrupt");
        assert_eq!(fs::read_to_string(&aside).unwrap(), "{not json");

        store.add_goal(Goal::new("Run", Category::Health, None).unwrap()).unwrap();
        store.add_log(LogEntry::new("Run", day(2), "")).unwrap();
        assert_eq!(
            fs::read_to_string(&aside).unwrap(),
            "{not json",
            "later saves must not touch the moved-aside file"
        );
    }

    #[test]
    fn test_null_chat_content_loads_and_survives_append() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(CHAT_FILE),
            r#"[
  {"role": "user", "content": "q1"},
  {"role": "assistant", "content": "a1"},
  {"role": "assistant", "content": null}
]"#,
        )
        .unwrap();

        let mut store = JsonStore::open(tmp.path()).unwrap();
        assert_eq!(store.chat_history().len(), 3);
        assert_eq!(store.chat_history()[2].content, "");

        store.append_chat(ChatMessage::user("q2")).unwrap();

        let reopened = JsonStore::open(tmp.path()).unwrap();
        let contents: Vec<&str> = reopened
            .chat_history()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["q1", "a1", "", "q2"]);
        assert!(!tmp.path().join("future_chat.json.corrupt").exists());
    }

    #[test]
    fn test_delete_goal_keeps_logs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        store.add_goal(Goal::new("Run", Category::Health, None).unwrap()).unwrap();
        store.add_goal(Goal::new("Save", Category::Finance, None).unwrap()).unwrap();
        store.add_log(LogEntry::new("Run", day(1), "")).unwrap();

        let removed = store.delete_goal(0).unwrap();
        assert_eq!(removed.name, "Run");
        assert_eq!(store.goals().len(), 1);
        assert_eq!(store.goals()[0].name, "Save");
        assert_eq!(store.logs().len(), 1, "logs must not cascade");
    }

    #[test]
    fn test_delete_goal_out_of_range() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        let err = store.delete_goal(3).unwrap_err();
        assert!(matches!(err, LifedashError::NotFound(_)));
    }

    #[test]
    fn test_add_log_requires_existing_goal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        let err = store.add_log(LogEntry::new("Ghost", day(1), "")).unwrap_err();
        assert!(matches!(err, LifedashError::Validation(_)));
        assert!(store.logs().is_empty());
    }

    #[test]
    fn test_clear_chat_writes_empty_array() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        store.append_chat(ChatMessage::user("hi")).unwrap();
        store.clear_chat().unwrap();

        assert!(store.chat_history().is_empty());
        let raw = fs::read_to_string(tmp.path().join(CHAT_FILE)).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[test]
    fn test_failed_save_leaves_memory_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(tmp.path()).unwrap();
        // A directory where the file should be makes the write fail.
        fs::create_dir(tmp.path().join(GOALS_FILE)).unwrap();

        let err = store
            .add_goal(Goal::new("Run", Category::Health, None).unwrap())
            .unwrap_err();
        assert!(matches!(err, LifedashError::Persistence { .. }));
        assert!(err.to_string().starts_with("Error saving data to"));
        assert!(store.goals().is_empty());
    }
}
