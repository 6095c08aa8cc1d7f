//! File-backed persistence under the `.forge/` data root.
//!
//! Layout per project:
//!
//! ```text
//! .forge/
//!   config.toml
//!   projects/<project-id>/
//!     project.json     atomic document
//!     steps.json       atomic document, all steps of the project
//!     logs.jsonl       append-only, one entry per line
//!   output/<project-id>/   generated files
//!   archives/              packaged artifacts
//! ```
//!
//! Documents are replaced atomically (temp file + rename) so readers never
//! observe a partial write.

pub mod logs;
pub mod projects;
pub mod steps;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Resolved locations under one data root.
#[derive(Debug, Clone)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join("projects").join(project_id)
    }

    pub fn project_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("project.json")
    }

    pub fn steps_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("steps.json")
    }

    pub fn logs_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("logs.jsonl")
    }

    pub fn output_dir(&self, project_id: &str) -> PathBuf {
        self.root.join("output").join(project_id)
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }
}

/// Current wall-clock time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    // Rfc3339 formatting of a UTC timestamp cannot fail.
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Atomically write a JSON document (temp file + rename).
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("document path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &buf)
        .with_context(|| format!("write temp document {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace document {}", path.display()))?;
    Ok(())
}
