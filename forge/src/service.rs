//! Generation service facade.
//!
//! Ties plan sourcing, step materialization, and engine runs together behind
//! the operations the server exposes. Runs execute on background tasks; the
//! start call returns as soon as the plan is persisted.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures::Stream;
use serde_json::{Value, json};

use crate::config::EngineConfig;
use crate::core::types::{AppSpec, LogEntry, LogLevel, ProjectRecord, ProjectStatus, StepRecord};
use crate::engine::ExecutionEngine;
use crate::planner::PlanSource;
use crate::store::logs::LogSink;
use crate::store::{StorePaths, projects, steps};
use crate::stream::{self, StreamEvent};
use crate::supervisor::spawn_supervised;

const LOG_SOURCE: &str = "service";

/// Response to a generation request: the run continues in the background.
#[derive(Debug, Clone)]
pub struct StartedGeneration {
    pub project_id: String,
    pub status: ProjectStatus,
    pub logs: Vec<LogEntry>,
}

pub struct GenerationService {
    paths: StorePaths,
    logs: Arc<LogSink>,
    plan_source: PlanSource,
    engine: Arc<ExecutionEngine>,
    config: EngineConfig,
    /// Projects with a run currently in flight. Steps live in one document
    /// per project, so a second concurrent run could clobber the first
    /// one's status writes; at most one run may own a project at a time.
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl GenerationService {
    pub fn new(
        paths: StorePaths,
        logs: Arc<LogSink>,
        plan_source: PlanSource,
        engine: Arc<ExecutionEngine>,
        config: EngineConfig,
    ) -> Self {
        Self {
            paths,
            logs,
            plan_source,
            engine,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Create a project from `spec`, materialize its plan, and start a run.
    ///
    /// Fails only when the spec is invalid or the plan cannot be persisted;
    /// in the latter case the project is left `Failed` with an error log, so
    /// execution can never start against half-written steps.
    pub async fn start_generation(&self, spec: &AppSpec) -> Result<StartedGeneration> {
        let project = projects::create_project(&self.paths, spec)?;
        let outcome = self.plan_source.generate_plan(spec).await?;

        match &outcome.fallback_reason {
            Some(reason) => self.log(
                &project.id,
                LogLevel::Warning,
                format!("using fallback plan: {reason}"),
                json!({"steps": outcome.steps.len()}),
            ),
            None => self.log(
                &project.id,
                LogLevel::Info,
                format!("planner produced {} steps", outcome.steps.len()),
                json!({"steps": outcome.steps.len()}),
            ),
        }

        if let Err(err) = steps::create_steps(&self.paths, &project.id, &outcome.steps) {
            self.log(
                &project.id,
                LogLevel::Error,
                format!("failed to persist plan: {err:#}"),
                Value::Null,
            );
            projects::set_status(&self.paths, &project.id, ProjectStatus::Failed)?;
            return Err(err);
        }

        projects::set_status(&self.paths, &project.id, ProjectStatus::InProgress)?;
        self.spawn_run(project.id.clone())?;

        Ok(StartedGeneration {
            project_id: project.id.clone(),
            status: ProjectStatus::InProgress,
            logs: self.logs.list(&project.id)?,
        })
    }

    /// Trigger execution of a project's pending steps.
    ///
    /// Returns whether a run was scheduled; with nothing pending, or with a
    /// run for the project already in flight, this is a no-op and no task is
    /// spawned. The run itself moves the project to `InProgress`.
    pub fn execute_pending(&self, project_id: &str) -> Result<bool> {
        let pending = steps::list_pending(&self.paths, project_id)?;
        if pending.is_empty() {
            return Ok(false);
        }
        self.spawn_run(project_id.to_string())
    }

    pub fn project(&self, project_id: &str) -> Result<ProjectRecord> {
        projects::load_project(&self.paths, project_id)
    }

    pub fn steps(&self, project_id: &str) -> Result<Vec<StepRecord>> {
        steps::list_steps(&self.paths, project_id)
    }

    pub fn logs(&self, project_id: &str) -> Result<Vec<LogEntry>> {
        self.logs.list(project_id)
    }

    /// Live event stream for a project, starting after `cursor`.
    pub fn stream_events(
        &self,
        project_id: &str,
        cursor: u64,
    ) -> impl Stream<Item = Result<StreamEvent>> + use<> {
        stream::stream_events(
            self.paths.clone(),
            Arc::clone(&self.logs),
            project_id.to_string(),
            cursor,
            Duration::from_millis(self.config.log_poll_interval_ms),
        )
    }

    /// Reserve `project_id` for a run and start it in the background.
    ///
    /// Returns `Ok(false)` without spawning when a run for the project is
    /// already in flight. The reservation is released when the run finishes,
    /// whatever its outcome.
    fn spawn_run(&self, project_id: String) -> Result<bool> {
        {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| anyhow!("in-flight run set lock poisoned"))?;
            if !in_flight.insert(project_id.clone()) {
                return Ok(false);
            }
        }
        let engine = Arc::clone(&self.engine);
        let in_flight = Arc::clone(&self.in_flight);
        spawn_supervised("engine_run", async move {
            let outcome = engine.run(&project_id).await.map(|_| ());
            match in_flight.lock() {
                Ok(mut set) => {
                    set.remove(&project_id);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(&project_id);
                }
            }
            outcome
        });
        Ok(true)
    }

    fn log(&self, project_id: &str, level: LogLevel, message: String, context: Value) {
        if let Err(err) = self
            .logs
            .append(project_id, level, message, LOG_SOURCE, context, None)
        {
            tracing::warn!(project_id, error = %format!("{err:#}"), "log sink append failed");
        }
    }
}
