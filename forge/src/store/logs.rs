//! Append-only log sink, one JSONL file per project.
//!
//! Entry ids are monotonic per project and double as the stream cursor. The
//! next id for each project is cached in memory and lazily initialized by
//! scanning the existing file, so the sink survives process restarts without
//! a separate counter file.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::types::{LogEntry, LogLevel};
use crate::store::{StorePaths, now_rfc3339};

#[derive(Debug)]
pub struct LogSink {
    paths: StorePaths,
    next_ids: Mutex<HashMap<String, u64>>,
}

impl LogSink {
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            next_ids: Mutex::new(HashMap::new()),
        }
    }

    /// Append one entry and return it with its assigned id.
    pub fn append(
        &self,
        project_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        source: &str,
        context: Value,
        step_id: Option<u64>,
    ) -> Result<LogEntry> {
        let path = self.paths.logs_path(project_id);
        let parent = path
            .parent()
            .with_context(|| format!("log path missing parent {}", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;

        // Hold the counter lock across the write so ids and file order agree.
        let mut next_ids = self
            .next_ids
            .lock()
            .map_err(|_| anyhow::anyhow!("log sink counter lock poisoned"))?;
        let next_id = match next_ids.get(project_id) {
            Some(id) => *id,
            None => last_id_on_disk(&path)? + 1,
        };

        let entry = LogEntry {
            id: next_id,
            level,
            message: message.into(),
            source: source.to_string(),
            context,
            step_id,
            created_at: now_rfc3339(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append log entry {}", path.display()))?;

        next_ids.insert(project_id.to_string(), next_id + 1);
        Ok(entry)
    }

    /// All entries of a project in append order.
    pub fn list(&self, project_id: &str) -> Result<Vec<LogEntry>> {
        self.read_after(project_id, 0)
    }

    /// Entries with id strictly greater than `cursor`, in append order.
    pub fn read_after(&self, project_id: &str, cursor: u64) -> Result<Vec<LogEntry>> {
        let path = self.paths.logs_path(project_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read logs {}", path.display()))?;
        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(line)
                .with_context(|| format!("parse log entry in {}", path.display()))?;
            if entry.id > cursor {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

fn last_id_on_disk(path: &std::path::Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read logs {}", path.display()))?;
    let mut last = 0;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(line)
            .with_context(|| format!("parse log entry in {}", path.display()))?;
        last = last.max(entry.id);
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_monotonic_per_project() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = LogSink::new(StorePaths::new(temp.path()));

        let a = sink
            .append("p-1", LogLevel::Info, "first", "test", Value::Null, None)
            .expect("append");
        let b = sink
            .append("p-1", LogLevel::Info, "second", "test", Value::Null, None)
            .expect("append");
        let other = sink
            .append("p-2", LogLevel::Info, "other", "test", Value::Null, None)
            .expect("append");

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(other.id, 1);
    }

    #[test]
    fn counter_recovers_from_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths::new(temp.path());

        let sink = LogSink::new(paths.clone());
        sink.append("p-1", LogLevel::Info, "one", "test", Value::Null, None)
            .expect("append");
        sink.append("p-1", LogLevel::Info, "two", "test", Value::Null, None)
            .expect("append");
        drop(sink);

        // A fresh sink resumes after the highest id on disk.
        let sink = LogSink::new(paths);
        let entry = sink
            .append("p-1", LogLevel::Info, "three", "test", Value::Null, None)
            .expect("append");
        assert_eq!(entry.id, 3);
    }

    #[test]
    fn read_after_returns_only_newer_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = LogSink::new(StorePaths::new(temp.path()));

        for message in ["a", "b", "c"] {
            sink.append("p-1", LogLevel::Info, message, "test", Value::Null, None)
                .expect("append");
        }

        let newer = sink.read_after("p-1", 1).expect("read");
        assert_eq!(newer.len(), 2);
        assert_eq!(newer[0].message, "b");
        assert_eq!(newer[1].message, "c");

        assert!(sink.read_after("p-1", 3).expect("read").is_empty());
        assert!(sink.read_after("missing", 0).expect("read").is_empty());
    }

    #[test]
    fn entries_carry_context_and_step_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink = LogSink::new(StorePaths::new(temp.path()));

        sink.append(
            "p-1",
            LogLevel::Error,
            "step failed",
            "execution_engine",
            json!({"tool": "codegen_create"}),
            Some(4),
        )
        .expect("append");

        let entries = sink.list("p-1").expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].step_id, Some(4));
        assert_eq!(entries[0].context["tool"], "codegen_create");
    }
}
