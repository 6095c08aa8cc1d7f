//! Writes generated files under a project's output directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Join `relative` under `root`, rejecting paths that would escape it.
///
/// Tool outputs name their file paths; those paths are data, not trusted
/// input, so absolute paths and `..` components are refused outright.
pub fn join_under(root: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(anyhow!("output path must be relative: {relative}"));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(anyhow!("output path must not contain '..': {relative}"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(anyhow!("output path must be relative: {relative}"));
            }
        }
    }
    Ok(root.join(candidate))
}

/// Write `contents` to `relative` under `root`, creating parent directories.
///
/// Overwrites an existing file. Returns the resolved absolute path.
pub fn write(root: &Path, relative: &str, contents: &str) -> Result<PathBuf> {
    let path = join_under(root, relative)?;
    let parent = path
        .parent()
        .with_context(|| format!("output path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    fs::write(&path, contents).with_context(|| format!("write output {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "output file written");
    Ok(path)
}
