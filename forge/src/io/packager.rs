//! Packages a project's generated output into a downloadable artifact.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Turns a project's output directory into an artifact and reports its path.
pub trait Packager: Send + Sync {
    fn archive(&self, source_dir: &Path, project_name: &str) -> Result<PathBuf>;
}

/// Packager that snapshots the output tree into a directory under `archives/`.
///
/// A plain recursive copy keeps the artifact inspectable without extra
/// tooling. A compressing packager can replace this behind the same trait.
#[derive(Debug, Clone)]
pub struct DirPackager {
    archives_dir: PathBuf,
}

impl DirPackager {
    pub fn new(archives_dir: impl Into<PathBuf>) -> Self {
        Self {
            archives_dir: archives_dir.into(),
        }
    }
}

impl Packager for DirPackager {
    fn archive(&self, source_dir: &Path, project_name: &str) -> Result<PathBuf> {
        if !source_dir.is_dir() {
            return Err(anyhow!(
                "output directory missing: {}",
                source_dir.display()
            ));
        }
        let target = self.archives_dir.join(project_name);
        if target.exists() {
            fs::remove_dir_all(&target)
                .with_context(|| format!("clear stale archive {}", target.display()))?;
        }
        copy_dir(source_dir, &target)?;
        debug!(archive = %target.display(), "output packaged");
        Ok(target)
    }
}

fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)
        .with_context(|| format!("create archive directory {}", target.display()))?;
    let entries =
        fs::read_dir(source).with_context(|| format!("read directory {}", source.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", source.display()))?;
        let entry_path = entry.path();
        let target_path = target.join(entry.file_name());
        if entry_path.is_dir() {
            copy_dir(&entry_path, &target_path)?;
        } else {
            fs::copy(&entry_path, &target_path).with_context(|| {
                format!(
                    "copy {} to {}",
                    entry_path.display(),
                    target_path.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_copies_nested_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = temp.path().join("output");
        fs::create_dir_all(output.join("backend/app")).expect("mkdir");
        fs::write(output.join("backend/app/main.py"), "app = None\n").expect("write");
        fs::write(output.join("README.md"), "# app\n").expect("write");

        let packager = DirPackager::new(temp.path().join("archives"));
        let archive = packager.archive(&output, "todo-app").expect("archive");

        assert!(archive.ends_with("archives/todo-app"));
        assert!(archive.join("backend/app/main.py").is_file());
        assert!(archive.join("README.md").is_file());
    }

    #[test]
    fn archive_fails_when_output_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let packager = DirPackager::new(temp.path().join("archives"));
        assert!(
            packager
                .archive(&temp.path().join("missing"), "todo-app")
                .is_err()
        );
    }

    #[test]
    fn archive_replaces_previous_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = temp.path().join("output");
        fs::create_dir_all(&output).expect("mkdir");
        fs::write(output.join("old.txt"), "old").expect("write");

        let packager = DirPackager::new(temp.path().join("archives"));
        packager.archive(&output, "todo-app").expect("first");

        fs::remove_file(output.join("old.txt")).expect("remove");
        fs::write(output.join("new.txt"), "new").expect("write");
        let archive = packager.archive(&output, "todo-app").expect("second");

        assert!(archive.join("new.txt").is_file());
        assert!(!archive.join("old.txt").exists());
    }
}
