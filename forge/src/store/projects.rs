//! Project document storage with forward-only status enforcement.

use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing::debug;
use uuid::Uuid;

use crate::core::status::project_transition_allowed;
use crate::core::types::{AppSpec, ProjectRecord, ProjectStatus};
use crate::store::{StorePaths, now_rfc3339, write_json_atomic};

/// Create a new project document in `Draft` from a validated spec.
pub fn create_project(paths: &StorePaths, spec: &AppSpec) -> Result<ProjectRecord> {
    spec.validate().map_err(|msg| anyhow!(msg))?;
    let now = now_rfc3339();
    let record = ProjectRecord {
        id: Uuid::new_v4().to_string(),
        name: spec.project_name.clone(),
        description: spec.description.clone(),
        features: spec.features.clone(),
        tech_stack: spec.tech_stack.clone(),
        styling: spec.styling.clone(),
        status: ProjectStatus::Draft,
        download_path: None,
        workflow_ref: None,
        created_at: now.clone(),
        updated_at: now,
    };
    write_json_atomic(&paths.project_path(&record.id), &record)?;
    debug!(project_id = %record.id, "project created");
    Ok(record)
}

/// Load a project document from disk.
pub fn load_project(paths: &StorePaths, project_id: &str) -> Result<ProjectRecord> {
    let path = paths.project_path(project_id);
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read project {}", path.display()))?;
    let record: ProjectRecord = serde_json::from_str(&contents)
        .with_context(|| format!("parse project {}", path.display()))?;
    Ok(record)
}

/// Apply `mutate` to the project document and write it back atomically.
///
/// Bumps `updated_at` on every call. Status changes must go through
/// [`set_status`]; this helper does not check transitions.
pub fn update_project(
    paths: &StorePaths,
    project_id: &str,
    mutate: impl FnOnce(&mut ProjectRecord),
) -> Result<ProjectRecord> {
    let mut record = load_project(paths, project_id)?;
    mutate(&mut record);
    record.updated_at = now_rfc3339();
    write_json_atomic(&paths.project_path(project_id), &record)?;
    Ok(record)
}

/// Move the project to `to`, rejecting transitions the lifecycle forbids.
pub fn set_status(
    paths: &StorePaths,
    project_id: &str,
    to: ProjectStatus,
) -> Result<ProjectRecord> {
    let record = load_project(paths, project_id)?;
    if !project_transition_allowed(record.status, to) {
        return Err(anyhow!(
            "project {} cannot move from {:?} to {:?}",
            project_id,
            record.status,
            to
        ));
    }
    update_project(paths, project_id, |record| record.status = to)
}

/// Set the project status without a transition check.
///
/// Last-resort path for run finalization failures, where leaving the project
/// in a non-terminal status would strand observers. Normal code uses
/// [`set_status`].
pub fn force_status(
    paths: &StorePaths,
    project_id: &str,
    to: ProjectStatus,
) -> Result<ProjectRecord> {
    update_project(paths, project_id, |record| record.status = to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> AppSpec {
        AppSpec {
            project_name: "todo-app".to_string(),
            description: "A todo list".to_string(),
            features: vec!["auth".to_string()],
            tech_stack: "React, FastAPI".to_string(),
            styling: "Tailwind CSS".to_string(),
        }
    }

    #[test]
    fn create_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths::new(temp.path());

        let created = create_project(&paths, &sample_spec()).expect("create");
        assert_eq!(created.status, ProjectStatus::Draft);
        assert!(created.download_path.is_none());

        let loaded = load_project(&paths, &created.id).expect("load");
        assert_eq!(loaded, created);
    }

    #[test]
    fn create_rejects_invalid_spec() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths::new(temp.path());
        let spec = AppSpec {
            features: Vec::new(),
            ..sample_spec()
        };
        assert!(create_project(&paths, &spec).is_err());
    }

    #[test]
    fn set_status_enforces_transitions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths::new(temp.path());
        let project = create_project(&paths, &sample_spec()).expect("create");

        let updated =
            set_status(&paths, &project.id, ProjectStatus::InProgress).expect("to in_progress");
        assert_eq!(updated.status, ProjectStatus::InProgress);

        // Moving back to Draft is never legal.
        let err = set_status(&paths, &project.id, ProjectStatus::Draft);
        assert!(err.is_err());
    }

    #[test]
    fn failed_project_can_be_retriggered() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths::new(temp.path());
        let project = create_project(&paths, &sample_spec()).expect("create");

        set_status(&paths, &project.id, ProjectStatus::InProgress).expect("in_progress");
        set_status(&paths, &project.id, ProjectStatus::Failed).expect("failed");
        let updated =
            set_status(&paths, &project.id, ProjectStatus::InProgress).expect("re-trigger");
        assert_eq!(updated.status, ProjectStatus::InProgress);
    }

    #[test]
    fn force_status_bypasses_transition_check() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = StorePaths::new(temp.path());
        let project = create_project(&paths, &sample_spec()).expect("create");

        let updated =
            force_status(&paths, &project.id, ProjectStatus::Failed).expect("force failed");
        assert_eq!(updated.status, ProjectStatus::Failed);
    }
}
