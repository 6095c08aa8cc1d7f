//! Test-only scripted planners and tools.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use crate::core::types::ToolOutput;
use crate::planner::Planner;
use crate::tools::{Tool, ToolError};

/// Planner that always returns the same raw text.
pub struct ScriptedPlanner {
    response: String,
}

impl ScriptedPlanner {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Planner that always fails, as an unreachable backend would.
pub struct FailingPlanner;

#[async_trait]
impl Planner for FailingPlanner {
    async fn plan(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("planner backend unreachable"))
    }
}

/// Tool that records every input it receives, in invocation order.
#[derive(Clone)]
pub struct RecordingTool {
    name: String,
    invocations: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn invocations(&self) -> Vec<Value> {
        self.invocations.lock().expect("invocations lock").clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(input.clone());
        Ok(ToolOutput {
            file_path: Some(format!("recorded-{}.txt", self.invocations().len())),
            code: Some("recorded".to_string()),
            details: serde_json::Map::new(),
        })
    }
}

/// Tool that returns a fixed output regardless of input.
pub struct StaticTool {
    name: String,
    output: ToolOutput,
    produces_file: bool,
}

impl StaticTool {
    /// A tool whose output carries writable file content.
    pub fn with_file(
        name: impl Into<String>,
        file_path: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            output: ToolOutput {
                file_path: Some(file_path.into()),
                code: Some(code.into()),
                details: serde_json::Map::new(),
            },
            produces_file: true,
        }
    }

    /// A tool that completes without producing a file.
    pub fn without_file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: ToolOutput::default(),
            produces_file: false,
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn produces_file(&self) -> bool {
        self.produces_file
    }

    async fn execute(&self, _input: &Value) -> Result<ToolOutput, ToolError> {
        Ok(self.output.clone())
    }
}

/// Tool that always fails with a fixed message.
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: &Value) -> Result<ToolOutput, ToolError> {
        Err(ToolError::new(self.message.clone()))
    }
}

/// Tool that never resolves, for timeout tests.
pub struct NeverTool {
    name: String,
}

impl NeverTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for NeverTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: &Value) -> Result<ToolOutput, ToolError> {
        std::future::pending::<()>().await;
        unreachable!("pending future never resolves")
    }
}

/// Tool that sleeps before producing a file, for deadline tests.
pub struct SleepingTool {
    name: String,
    delay: Duration,
    file_path: String,
}

impl SleepingTool {
    pub fn new(name: impl Into<String>, delay: Duration, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay,
            file_path: file_path.into(),
        }
    }
}

#[async_trait]
impl Tool for SleepingTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: &Value) -> Result<ToolOutput, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolOutput {
            file_path: Some(self.file_path.clone()),
            code: Some("slept".to_string()),
            details: serde_json::Map::new(),
        })
    }
}
