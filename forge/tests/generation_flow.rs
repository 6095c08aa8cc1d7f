//! End-to-end generation flow through the service facade.

use std::sync::Arc;
use std::time::Duration;

use forge::config::EngineConfig;
use forge::core::types::{AppSpec, ProjectStatus, StepStatus};
use forge::engine::ExecutionEngine;
use forge::io::packager::DirPackager;
use forge::metrics::Metrics;
use forge::planner::{PlanSource, Planner};
use forge::service::GenerationService;
use forge::store::StorePaths;
use forge::store::logs::LogSink;
use forge::stream::StreamEvent;
use forge::test_support::{FailingPlanner, RecordingTool, ScriptedPlanner, SleepingTool};
use forge::tools::ToolRegistry;
use futures::StreamExt;

fn service_with_planner(root: &std::path::Path, planner: Arc<dyn Planner>) -> GenerationService {
    service_with_registry(root, planner, ToolRegistry::builtin())
}

fn service_with_registry(
    root: &std::path::Path,
    planner: Arc<dyn Planner>,
    registry: ToolRegistry,
) -> GenerationService {
    let paths = StorePaths::new(root);
    let logs = Arc::new(LogSink::new(paths.clone()));
    let config = EngineConfig {
        log_poll_interval_ms: 10,
        ..EngineConfig::default()
    };
    let engine = Arc::new(ExecutionEngine::new(
        paths.clone(),
        Arc::clone(&logs),
        registry.clone(),
        Arc::new(DirPackager::new(paths.archives_dir())),
        Arc::new(Metrics::default()),
        config.clone(),
    ));
    let plan_source = PlanSource::new(
        planner,
        registry.names().iter().map(|s| s.to_string()).collect(),
    );
    GenerationService::new(paths, logs, plan_source, engine, config)
}

fn sample_spec() -> AppSpec {
    AppSpec {
        project_name: "todo-app".to_string(),
        description: "A todo list with authentication".to_string(),
        features: vec!["auth".to_string(), "crud".to_string()],
        tech_stack: "Vue, Node.js, MongoDB".to_string(),
        styling: "Tailwind CSS".to_string(),
    }
}

async fn wait_for_terminal(service: &GenerationService, project_id: &str) -> ProjectStatus {
    let events: Vec<StreamEvent> = service
        .stream_events(project_id, 0)
        .map(|event| event.expect("stream event"))
        .collect()
        .await;
    match events.last().expect("at least one event") {
        StreamEvent::Status { status } => *status,
        other => panic!("stream ended without status event: {other:?}"),
    }
}

/// Verifies the full flow with an unavailable planner: fallback plan, step
/// execution, output files, packaging, and the terminal status event.
#[tokio::test]
async fn fallback_generation_reaches_success() {
    let temp = tempfile::tempdir().expect("tempdir");
    let service = service_with_planner(temp.path(), Arc::new(FailingPlanner));

    let started = service
        .start_generation(&sample_spec())
        .await
        .expect("start");
    assert_eq!(started.status, ProjectStatus::InProgress);
    assert!(
        started
            .logs
            .iter()
            .any(|entry| entry.message.contains("fallback plan"))
    );

    let status = wait_for_terminal(&service, &started.project_id).await;
    assert_eq!(status, ProjectStatus::Success);

    let steps = service.steps(&started.project_id).expect("steps");
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|step| step.status == StepStatus::Completed));

    let project = service.project(&started.project_id).expect("project");
    let download = project.download_path.expect("download path");
    // The Vue/Node recipe writes frontend/src/App.vue among others.
    assert!(
        std::path::Path::new(&download)
            .join("frontend/src/App.vue")
            .is_file()
    );
}

/// Verifies a valid planner response drives the run instead of the fallback.
#[tokio::test]
async fn planner_supplied_plan_is_executed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let response = r##"```json
[
  {"tool": "create_file", "input": {"path": "README.md", "content": "# todo-app\n"}}
]
```"##;
    let service = service_with_planner(temp.path(), Arc::new(ScriptedPlanner::new(response)));

    let started = service
        .start_generation(&sample_spec())
        .await
        .expect("start");
    assert!(
        started
            .logs
            .iter()
            .all(|entry| !entry.message.contains("fallback plan"))
    );

    let status = wait_for_terminal(&service, &started.project_id).await;
    assert_eq!(status, ProjectStatus::Success);

    let steps = service.steps(&started.project_id).expect("steps");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].tool_name, "create_file");
}

/// Verifies a plan naming an unregistered tool fails that step and the run,
/// and that re-triggering a project with nothing pending schedules no work.
#[tokio::test]
async fn unknown_tool_fails_run_and_retrigger_is_noop() {
    let temp = tempfile::tempdir().expect("tempdir");
    let response = r#"[{"tool": "deploy_app", "input": {}}]"#;
    let service = service_with_planner(temp.path(), Arc::new(ScriptedPlanner::new(response)));

    let started = service
        .start_generation(&sample_spec())
        .await
        .expect("start");
    let status = wait_for_terminal(&service, &started.project_id).await;
    assert_eq!(status, ProjectStatus::Failed);

    let steps = service.steps(&started.project_id).expect("steps");
    assert_eq!(steps[0].status, StepStatus::Failed);
    assert!(
        steps[0]
            .error
            .as_deref()
            .expect("error")
            .contains("unknown tool")
    );

    let scheduled = service
        .execute_pending(&started.project_id)
        .expect("execute");
    assert!(!scheduled);
}

/// Verifies a project accepts at most one run at a time: re-triggering while
/// a run is mid-step schedules nothing and no step executes twice.
#[tokio::test]
async fn retrigger_during_active_run_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut registry = ToolRegistry::default();
    registry.register(Arc::new(SleepingTool::new(
        "slow",
        Duration::from_millis(300),
        "slow.txt",
    )));
    let recorder = RecordingTool::new("record");
    registry.register(Arc::new(recorder.clone()));
    let response = r#"[
        {"tool": "slow", "input": {}},
        {"tool": "record", "input": {}}
    ]"#;
    let service = service_with_registry(
        temp.path(),
        Arc::new(ScriptedPlanner::new(response)),
        registry,
    );

    let started = service
        .start_generation(&sample_spec())
        .await
        .expect("start");

    // Wait until the run has picked up the first step.
    let mut picked_up = false;
    for _ in 0..200 {
        let steps = service.steps(&started.project_id).expect("steps");
        if steps[0].status != StepStatus::Pending {
            picked_up = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(picked_up, "run never started executing");

    let scheduled = service
        .execute_pending(&started.project_id)
        .expect("execute");
    assert!(!scheduled);

    let status = wait_for_terminal(&service, &started.project_id).await;
    assert_eq!(status, ProjectStatus::Success);
    let steps = service.steps(&started.project_id).expect("steps");
    assert!(steps.iter().all(|step| step.status == StepStatus::Completed));
    // A second concurrent run would have invoked the recorder again.
    assert_eq!(recorder.invocations().len(), 1);
}

/// Verifies the stream cursor resumes without replaying delivered entries.
#[tokio::test]
async fn stream_cursor_resumes_after_disconnect() {
    let temp = tempfile::tempdir().expect("tempdir");
    let service = service_with_planner(temp.path(), Arc::new(FailingPlanner));

    let started = service
        .start_generation(&sample_spec())
        .await
        .expect("start");
    let first_pass: Vec<StreamEvent> = service
        .stream_events(&started.project_id, 0)
        .map(|event| event.expect("stream event"))
        .collect()
        .await;

    let last_log_id = first_pass
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Log(entry) => Some(entry.id),
            StreamEvent::Status { .. } => None,
        })
        .max()
        .expect("log entries");

    // Resuming from the last delivered id yields only the status event.
    let second_pass: Vec<StreamEvent> = service
        .stream_events(&started.project_id, last_log_id)
        .map(|event| event.expect("stream event"))
        .collect()
        .await;
    assert_eq!(second_pass.len(), 1);
    assert!(matches!(second_pass[0], StreamEvent::Status { .. }));

    // Ids within a pass are strictly increasing.
    let mut previous = 0;
    for event in &first_pass {
        if let StreamEvent::Log(entry) = event {
            assert!(entry.id > previous);
            previous = entry.id;
        }
    }

    // Keep the tempdir alive until the background run has finished.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
