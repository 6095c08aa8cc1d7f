//! Step document storage.
//!
//! All steps of a project live in one `steps.json` document so plan
//! materialization is a single atomic write: either every planned step exists
//! or none does.

use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::status::step_transition_allowed;
use crate::core::types::{PlanStep, StepRecord, StepStatus};
use crate::store::{StorePaths, now_rfc3339, write_json_atomic};

/// Plan steps could not be persisted; the project must not start executing.
#[derive(Debug)]
pub struct StepPersistenceError {
    pub project_id: String,
    pub message: String,
}

impl std::fmt::Display for StepPersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to persist steps for project {}: {}",
            self.project_id, self.message
        )
    }
}

impl std::error::Error for StepPersistenceError {}

/// Materialize a plan as step records, all `Pending`, in one atomic write.
///
/// Ids and `sequence_order` are assigned 1..=N in plan order.
pub fn create_steps(
    paths: &StorePaths,
    project_id: &str,
    plan: &[PlanStep],
) -> Result<Vec<StepRecord>> {
    if plan.is_empty() {
        return Err(StepPersistenceError {
            project_id: project_id.to_string(),
            message: "plan contains no steps".to_string(),
        }
        .into());
    }
    let now = now_rfc3339();
    let records: Vec<StepRecord> = plan
        .iter()
        .enumerate()
        .map(|(index, step)| StepRecord {
            id: index as u64 + 1,
            sequence_order: index as u32 + 1,
            tool_name: step.tool.clone(),
            input_payload: step.input.clone(),
            output_payload: None,
            status: StepStatus::Pending,
            error: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        })
        .collect();
    write_json_atomic(&paths.steps_path(project_id), &records).map_err(|err| {
        anyhow::Error::new(StepPersistenceError {
            project_id: project_id.to_string(),
            message: format!("{err:#}"),
        })
    })?;
    debug!(project_id, count = records.len(), "steps created");
    Ok(records)
}

/// All steps of a project, ascending by `sequence_order`.
pub fn list_steps(paths: &StorePaths, project_id: &str) -> Result<Vec<StepRecord>> {
    let path = paths.steps_path(project_id);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read steps {}", path.display()))?;
    let mut records: Vec<StepRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("parse steps {}", path.display()))?;
    records.sort_by_key(|record| record.sequence_order);
    Ok(records)
}

/// Pending steps of a project, ascending by `sequence_order`.
pub fn list_pending(paths: &StorePaths, project_id: &str) -> Result<Vec<StepRecord>> {
    let records = list_steps(paths, project_id)?;
    Ok(records
        .into_iter()
        .filter(|record| record.status == StepStatus::Pending)
        .collect())
}

/// Update one step's status and payloads, enforcing forward-only transitions.
pub fn update_status(
    paths: &StorePaths,
    project_id: &str,
    step_id: u64,
    to: StepStatus,
    output_payload: Option<serde_json::Value>,
    error: Option<String>,
) -> Result<StepRecord> {
    let mut records = list_steps(paths, project_id)?;
    let record = records
        .iter_mut()
        .find(|record| record.id == step_id)
        .ok_or_else(|| anyhow!("step {} not found in project {}", step_id, project_id))?;
    if !step_transition_allowed(record.status, to) {
        return Err(anyhow!(
            "step {} cannot move from {:?} to {:?}",
            step_id,
            record.status,
            to
        ));
    }
    record.status = to;
    record.output_payload = output_payload;
    record.error = error;
    record.updated_at = now_rfc3339();
    let updated = record.clone();
    write_json_atomic(&paths.steps_path(project_id), &records)?;
    Ok(updated)
}
