//! Tool abstraction and registry.
//!
//! The [`Tool`] trait decouples step execution from the concrete code
//! generators. Tests use scripted tools that return predetermined outputs
//! without touching templates.

pub mod codegen_create;
pub mod codegen_refactor;
pub mod create_file;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::types::ToolOutput;

/// A tool ran and reported failure.
#[derive(Debug)]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolError {}

/// A plan referenced a tool name the registry does not know.
#[derive(Debug)]
pub struct UnknownToolError {
    pub tool_name: String,
}

impl std::fmt::Display for UnknownToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown tool: {}", self.tool_name)
    }
}

impl std::error::Error for UnknownToolError {}

/// One executable unit of work a plan step can reference.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key, referenced by plan steps as `tool`.
    fn name(&self) -> &str;

    /// Whether successful output is expected to carry writable file content.
    ///
    /// Advisory metadata for plan construction and registry introspection;
    /// the engine counts the files it actually writes, not this declaration.
    fn produces_file(&self) -> bool {
        true
    }

    /// Execute against a tool-specific JSON input.
    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

/// Immutable name-to-tool mapping, shared across runs.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in code generation tools.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(codegen_create::CodegenCreate::new()));
        registry.register(Arc::new(codegen_refactor::CodegenRefactor::new()));
        registry.register(Arc::new(create_file::CreateFile));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, UnknownToolError> {
        self.tools.get(name).cloned().ok_or_else(|| UnknownToolError {
            tool_name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
