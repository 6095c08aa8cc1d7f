//! Server-Sent Events stream of a project's log entries.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;
use tracing::warn;

use forge::stream::StreamEvent;

use crate::routes::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Id of the last entry the client has seen; 0 streams from the start.
    #[serde(default)]
    cursor: u64,
}

/// SSE endpoint handler for `/projects/:id/events`.
///
/// Emits `log` events for entries after the cursor and a final `status`
/// event once the project reaches a terminal status, then closes.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    state
        .service
        .project(&id)
        .map_err(|_| ApiError::not_found(format!("project {id} not found")))?;
    let events = state.service.stream_events(&id, params.cursor);

    let stream = events.filter_map(|event| async move {
        match event {
            Ok(StreamEvent::Log(entry)) => {
                let json = serde_json::to_string(&entry).ok()?;
                Some(Ok(Event::default().event("log").data(json)))
            }
            Ok(status_event @ StreamEvent::Status { .. }) => {
                let json = serde_json::to_string(&status_event).ok()?;
                Some(Ok(Event::default().event("status").data(json)))
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "event stream failed");
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use forge::config::EngineConfig;
    use forge::core::types::AppSpec;
    use forge::engine::ExecutionEngine;
    use forge::io::packager::DirPackager;
    use forge::metrics::Metrics;
    use forge::planner::PlanSource;
    use forge::service::GenerationService;
    use forge::store::logs::LogSink;
    use forge::store::{StorePaths, projects};
    use forge::tools::ToolRegistry;

    use crate::planner::OllamaPlanner;

    fn app_state(root: &std::path::Path) -> AppState {
        let paths = StorePaths::new(root);
        let logs = Arc::new(LogSink::new(paths.clone()));
        let registry = ToolRegistry::builtin();
        let config = EngineConfig::default();
        let metrics = Arc::new(Metrics::default());
        let engine = Arc::new(ExecutionEngine::new(
            paths.clone(),
            Arc::clone(&logs),
            registry.clone(),
            Arc::new(DirPackager::new(paths.archives_dir())),
            Arc::clone(&metrics),
            config.clone(),
        ));
        let plan_source = PlanSource::new(
            Arc::new(OllamaPlanner::new("http://127.0.0.1:9", "unused")),
            registry.names().iter().map(|s| s.to_string()).collect(),
        );
        let service = Arc::new(GenerationService::new(
            paths,
            logs,
            plan_source,
            engine,
            config,
        ));
        AppState::new(service, metrics)
    }

    #[tokio::test]
    async fn unknown_project_is_rejected_before_streaming() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = app_state(temp.path());

        let result = events_handler(
            State(state),
            Path("missing".to_string()),
            Query(StreamParams { cursor: 0 }),
        )
        .await;

        let response = match result {
            Ok(_) => panic!("expected an error response"),
            Err(err) => err.into_response(),
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn existing_project_opens_a_stream() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = app_state(temp.path());
        let paths = StorePaths::new(temp.path());
        let spec = AppSpec {
            project_name: "app".to_string(),
            description: "desc".to_string(),
            features: vec!["a".to_string()],
            tech_stack: "React".to_string(),
            styling: String::new(),
        };
        let project = projects::create_project(&paths, &spec).expect("create");

        let result = events_handler(
            State(state),
            Path(project.id),
            Query(StreamParams { cursor: 0 }),
        )
        .await;
        assert!(result.is_ok());
    }
}
