//! Shared types for projects, steps, plans, and log entries.
//!
//! These types define stable contracts between components and double as the
//! persisted schema, so field names must stay stable for external consumers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a single generation step.
///
/// Transitions are forward-only: `Pending -> InProgress -> {Completed, Failed}`.
/// `Completed` and `Failed` are terminal; no automatic retry ever moves a step
/// backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

/// Status of a project aggregate.
///
/// `Success` is distinct from `Completed`: it additionally means the packager
/// produced a downloadable artifact for the generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    InProgress,
    Completed,
    Success,
    Failed,
}

impl ProjectStatus {
    /// Terminal for observers: the log stream ends once this is reached.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProjectStatus::Completed | ProjectStatus::Success | ProjectStatus::Failed
        )
    }
}

/// Level of a log sink entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Natural-language application specification submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSpec {
    pub project_name: String,
    pub description: String,
    pub features: Vec<String>,
    /// Free-text tech stack descriptor, e.g. "Vue, Node.js, MongoDB".
    pub tech_stack: String,
    /// Styling preference, e.g. "Tailwind CSS".
    #[serde(default)]
    pub styling: String,
}

impl AppSpec {
    /// Reject specs that cannot produce a meaningful plan.
    pub fn validate(&self) -> Result<(), String> {
        if self.project_name.trim().is_empty() {
            return Err("project_name must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty".to_string());
        }
        if self.features.is_empty() {
            return Err("features must contain at least one entry".to_string());
        }
        Ok(())
    }
}

/// One planned unit of work: a tool name plus its tool-specific input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: String,
    pub input: Value,
}

/// Persisted record of a generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Unique within the owning project.
    pub id: u64,
    /// Execution order, ascending. Unique per project, not necessarily
    /// contiguous.
    pub sequence_order: u32,
    pub tool_name: String,
    pub input_payload: Value,
    /// Populated only on `Completed`.
    pub output_payload: Option<Value>,
    pub status: StepStatus,
    /// Populated only on `Failed`.
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted record of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub tech_stack: String,
    pub styling: String,
    pub status: ProjectStatus,
    /// Location of the packaged artifact, set only on `Success`.
    pub download_path: Option<String>,
    /// Opaque reference to an external coordination workflow, if any.
    pub workflow_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One entry in a project's append-only log sink.
///
/// `id` is monotonic per project and doubles as the stream cursor: ordering by
/// id equals ordering by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub level: LogLevel,
    pub message: String,
    /// Free-text origin tag, e.g. "execution_engine".
    pub source: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<u64>,
    pub created_at: String,
}

/// Why a step failed.
///
/// A tagged value rather than an error hierarchy, so the engine's per-step
/// handling is a plain match. The three externally meaningful cases are kept
/// distinct: a name the registry cannot resolve, a tool that ran out of time,
/// and a tool that ran and reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    UnknownTool,
    Timeout,
    Tool,
    /// The tool task itself died (panic or cancellation), as opposed to the
    /// tool returning a failure.
    Internal,
}

impl StepErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepErrorKind::UnknownTool => "unknown_tool",
            StepErrorKind::Timeout => "timeout",
            StepErrorKind::Tool => "tool",
            StepErrorKind::Internal => "internal",
        }
    }
}

/// Terminal failure of one step, recorded on the step row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub kind: StepErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(kind: StepErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Successful tool output envelope.
///
/// `file_path` and `code` drive the file-writer collaborator; everything else
/// a tool reports is carried opaquely in `details` and persisted as the step's
/// `output_payload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl ToolOutput {
    /// Whether this output carries writable file content.
    pub fn has_file_content(&self) -> bool {
        self.file_path.is_some() && self.code.is_some()
    }
}
