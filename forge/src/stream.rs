//! Polling log stream with a terminal status event.
//!
//! Consumers resume with the id of the last entry they saw as the cursor.
//! Entry ids are monotonic, so each entry is delivered exactly once per
//! consumer. The stream ends with a single `Status` event once the project
//! reaches a terminal status, after a final drain so no entry logged during
//! finalization is lost.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::Stream;
use serde::Serialize;

use crate::core::types::{LogEntry, ProjectStatus};
use crate::store::logs::LogSink;
use crate::store::{StorePaths, projects};

/// One event on a project's live stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Log(LogEntry),
    Status { status: ProjectStatus },
}

/// Stream a project's log entries after `cursor`, ending with its terminal
/// status.
pub fn stream_events(
    paths: StorePaths,
    logs: Arc<LogSink>,
    project_id: String,
    cursor: u64,
    poll_interval: Duration,
) -> impl Stream<Item = Result<StreamEvent>> {
    async_stream::try_stream! {
        let mut cursor = cursor;
        loop {
            for entry in logs.read_after(&project_id, cursor)? {
                cursor = entry.id;
                yield StreamEvent::Log(entry);
            }

            let project = projects::load_project(&paths, &project_id)?;
            if project.status.is_terminal() {
                // Final drain: finalization may have appended entries after
                // the batch above was read.
                for entry in logs.read_after(&project_id, cursor)? {
                    yield StreamEvent::Log(entry);
                }
                yield StreamEvent::Status {
                    status: project.status,
                };
                break;
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}
