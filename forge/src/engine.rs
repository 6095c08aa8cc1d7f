//! Step execution engine.
//!
//! Runs a project's pending steps strictly in sequence order, isolates step
//! failures, enforces per-step and overall time budgets, and derives the
//! project's terminal status from the outcome. One run owns its project; the
//! service layer guarantees no two runs execute the same project at once.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::core::budget::step_budget;
use crate::core::status::derive_run_status;
use crate::core::types::{
    LogLevel, ProjectStatus, StepError, StepErrorKind, StepRecord, StepStatus, ToolOutput,
};
use crate::io::file_writer;
use crate::io::packager::Packager;
use crate::metrics::Metrics;
use crate::store::logs::LogSink;
use crate::store::{StorePaths, projects, steps};
use crate::tools::{Tool, ToolRegistry};

const LOG_SOURCE: &str = "execution_engine";

/// Outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub project_id: String,
    pub steps_total: usize,
    pub steps_completed: usize,
    pub steps_failed: usize,
    pub files_written: u64,
    pub status: ProjectStatus,
    pub deadline_hit: bool,
}

pub struct ExecutionEngine {
    paths: StorePaths,
    logs: Arc<LogSink>,
    registry: ToolRegistry,
    packager: Arc<dyn Packager>,
    metrics: Arc<Metrics>,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(
        paths: StorePaths,
        logs: Arc<LogSink>,
        registry: ToolRegistry,
        packager: Arc<dyn Packager>,
        metrics: Arc<Metrics>,
        config: EngineConfig,
    ) -> Self {
        Self {
            paths,
            logs,
            registry,
            packager,
            metrics,
            config,
        }
    }

    /// Execute all steps that are pending when the run starts.
    ///
    /// Steps added to the project while the run is executing are not picked
    /// up; they wait for the next trigger. With no pending steps the run is a
    /// logged no-op and the project status is left untouched.
    #[instrument(skip(self))]
    pub async fn run(&self, project_id: &str) -> Result<RunSummary> {
        let pending = steps::list_pending(&self.paths, project_id)?;
        if pending.is_empty() {
            self.log(
                project_id,
                LogLevel::Info,
                "no pending steps to execute",
                Value::Null,
                None,
            );
            let project = projects::load_project(&self.paths, project_id)?;
            return Ok(RunSummary {
                project_id: project_id.to_string(),
                steps_total: 0,
                steps_completed: 0,
                steps_failed: 0,
                files_written: 0,
                status: project.status,
                deadline_hit: false,
            });
        }

        self.metrics.record_run_started();
        let project = projects::load_project(&self.paths, project_id)?;
        if project.status != ProjectStatus::InProgress {
            projects::set_status(&self.paths, project_id, ProjectStatus::InProgress)?;
        }
        self.log(
            project_id,
            LogLevel::Info,
            format!("run started with {} pending steps", pending.len()),
            json!({"steps": pending.len()}),
            None,
        );

        let deadline = Instant::now() + Duration::from_secs(self.config.overall_deadline_secs);
        let step_timeout = Duration::from_secs(self.config.step_timeout_secs);

        let mut final_statuses: Vec<StepStatus> = Vec::with_capacity(pending.len());
        let mut files_written: u64 = 0;
        let mut deadline_hit = false;

        for step in &pending {
            // Deadline is checked only at step boundaries; a running step is
            // bounded by its own budget.
            let Some(budget) =
                step_budget(deadline.into_std(), Instant::now().into_std(), step_timeout)
            else {
                deadline_hit = true;
                self.log(
                    project_id,
                    LogLevel::Warning,
                    "overall deadline exceeded, remaining steps stay pending",
                    json!({"remaining": pending.len() - final_statuses.len()}),
                    None,
                );
                break;
            };

            self.log(
                project_id,
                LogLevel::Info,
                format!("executing step {} ({})", step.sequence_order, step.tool_name),
                json!({"tool": step.tool_name}),
                Some(step.id),
            );
            self.mark_step(project_id, step.id, StepStatus::InProgress, None, None);

            match self.invoke_tool(step, budget).await {
                Ok(output) => {
                    self.metrics.record_step_executed();
                    let payload = serde_json::to_value(&output).unwrap_or(Value::Null);
                    self.mark_step(
                        project_id,
                        step.id,
                        StepStatus::Completed,
                        Some(payload),
                        None,
                    );
                    if self.write_output(project_id, step, &output) {
                        files_written += 1;
                        self.metrics.record_file_written();
                    }
                    final_statuses.push(StepStatus::Completed);
                }
                Err(step_error) => {
                    self.metrics.record_step_executed();
                    self.metrics.record_step_failed();
                    let message = truncate_message(
                        &step_error.to_string(),
                        self.config.error_truncate_bytes,
                    );
                    self.mark_step(
                        project_id,
                        step.id,
                        StepStatus::Failed,
                        None,
                        Some(message.clone()),
                    );
                    self.log(
                        project_id,
                        LogLevel::Error,
                        format!("step {} failed: {message}", step.sequence_order),
                        json!({"kind": step_error.kind.as_str(), "tool": step.tool_name}),
                        Some(step.id),
                    );
                    final_statuses.push(StepStatus::Failed);
                }
            }
        }

        // Steps never started because of the deadline count as not completed.
        final_statuses.resize(pending.len(), StepStatus::Pending);

        match self
            .finalize(project_id, &final_statuses, files_written)
            .await
        {
            Ok(status) => {
                let summary = RunSummary {
                    project_id: project_id.to_string(),
                    steps_total: pending.len(),
                    steps_completed: final_statuses
                        .iter()
                        .filter(|s| **s == StepStatus::Completed)
                        .count(),
                    steps_failed: final_statuses
                        .iter()
                        .filter(|s| **s == StepStatus::Failed)
                        .count(),
                    files_written,
                    status,
                    deadline_hit,
                };
                self.log(
                    project_id,
                    LogLevel::Info,
                    format!(
                        "run finished: {}/{} steps completed, {} files written, status {:?}",
                        summary.steps_completed, summary.steps_total, files_written, status
                    ),
                    json!({"files_written": files_written, "deadline_hit": deadline_hit}),
                    None,
                );
                Ok(summary)
            }
            Err(err) => {
                // Leaving the project non-terminal would strand stream
                // consumers, so the transition check is bypassed here.
                self.log(
                    project_id,
                    LogLevel::Critical,
                    format!("run finalization failed: {err:#}"),
                    Value::Null,
                    None,
                );
                projects::force_status(&self.paths, project_id, ProjectStatus::Failed)?;
                self.metrics.record_run_failed();
                Err(err)
            }
        }
    }

    /// Resolve and execute one step's tool within `budget`.
    async fn invoke_tool(
        &self,
        step: &StepRecord,
        budget: Duration,
    ) -> Result<ToolOutput, StepError> {
        let tool: Arc<dyn Tool> = self.registry.resolve(&step.tool_name).map_err(|err| {
            StepError::new(StepErrorKind::UnknownTool, err.to_string())
        })?;

        let input = step.input_payload.clone();
        let handle = tokio::spawn(async move { tool.execute(&input).await });
        let abort = handle.abort_handle();

        match tokio::time::timeout(budget, handle).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(tool_error))) => {
                Err(StepError::new(StepErrorKind::Tool, tool_error.message))
            }
            Ok(Err(join_error)) => Err(StepError::new(
                StepErrorKind::Internal,
                format!("tool task died: {join_error}"),
            )),
            Err(_) => {
                abort.abort();
                Err(StepError::new(
                    StepErrorKind::Timeout,
                    format!("tool exceeded budget of {}s", budget.as_secs()),
                ))
            }
        }
    }

    /// Write a completed step's file content under the project output
    /// directory. Returns whether a file landed on disk.
    ///
    /// A write failure does not fail the step; the step completed, the run
    /// just has one file fewer, which the completion rule accounts for.
    fn write_output(&self, project_id: &str, step: &StepRecord, output: &ToolOutput) -> bool {
        let (Some(file_path), Some(code)) = (&output.file_path, &output.code) else {
            return false;
        };
        let output_dir = self.paths.output_dir(project_id);
        match file_writer::write(&output_dir, file_path, code) {
            Ok(path) => {
                self.log(
                    project_id,
                    LogLevel::Info,
                    format!("wrote {file_path}"),
                    json!({"path": path.display().to_string()}),
                    Some(step.id),
                );
                true
            }
            Err(err) => {
                self.log(
                    project_id,
                    LogLevel::Warning,
                    format!("failed to write {file_path}: {err:#}"),
                    Value::Null,
                    Some(step.id),
                );
                false
            }
        }
    }

    /// Derive and persist the run's terminal status, packaging on completion.
    async fn finalize(
        &self,
        project_id: &str,
        final_statuses: &[StepStatus],
        files_written: u64,
    ) -> Result<ProjectStatus> {
        let status = derive_run_status(final_statuses, files_written);
        projects::set_status(&self.paths, project_id, status)
            .with_context(|| format!("persist terminal status for project {project_id}"))?;

        if status == ProjectStatus::Failed {
            self.metrics.record_run_failed();
            return Ok(ProjectStatus::Failed);
        }

        self.metrics.record_run_completed();
        let project = projects::load_project(&self.paths, project_id)?;
        let output_dir = self.paths.output_dir(project_id);
        let archive_name = format!("{}-{}", project.name, project_id);
        match self.packager.archive(&output_dir, &archive_name) {
            Ok(archive_path) => {
                let archive = archive_path.display().to_string();
                projects::update_project(&self.paths, project_id, |record| {
                    record.download_path = Some(archive.clone());
                })?;
                projects::set_status(&self.paths, project_id, ProjectStatus::Success)?;
                self.log(
                    project_id,
                    LogLevel::Info,
                    "output packaged for download",
                    json!({"download_path": archive}),
                    None,
                );
                Ok(ProjectStatus::Success)
            }
            Err(err) => {
                // Packaging is best-effort on top of a completed run.
                self.log(
                    project_id,
                    LogLevel::Error,
                    format!("packaging failed: {err:#}"),
                    Value::Null,
                    None,
                );
                Ok(ProjectStatus::Completed)
            }
        }
    }

    /// Persist a step transition, downgrading persistence failures to tracing.
    ///
    /// Mid-run persistence errors must not abort the run; the in-memory
    /// outcome still drives finalization.
    fn mark_step(
        &self,
        project_id: &str,
        step_id: u64,
        to: StepStatus,
        output_payload: Option<Value>,
        error: Option<String>,
    ) {
        if let Err(err) =
            steps::update_status(&self.paths, project_id, step_id, to, output_payload, error)
        {
            warn!(project_id, step_id, error = %format!("{err:#}"), "step persistence failed");
        }
    }

    /// Append to the project log sink, fire-and-forget.
    fn log(
        &self,
        project_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        context: Value,
        step_id: Option<u64>,
    ) {
        let message = message.into();
        info!(project_id, %message, "engine log");
        if let Err(err) =
            self.logs
                .append(project_id, level, message, LOG_SOURCE, context, step_id)
        {
            warn!(project_id, error = %format!("{err:#}"), "log sink append failed");
        }
    }
}

/// Truncate to at most `max_bytes`, respecting char boundaries.
fn truncate_message(message: &str, max_bytes: usize) -> String {
    if message.len() <= max_bytes {
        return message.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}[truncated]", &message[..end])
}
