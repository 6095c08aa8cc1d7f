//! Passthrough tool for plans that carry literal file content.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::types::ToolOutput;
use crate::tools::{Tool, ToolError};

#[derive(Debug, Deserialize)]
struct CreateFileInput {
    path: String,
    content: String,
}

pub struct CreateFile;

#[async_trait]
impl Tool for CreateFile {
    fn name(&self) -> &str {
        "create_file"
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let input: CreateFileInput = serde_json::from_value(input.clone())
            .map_err(|err| ToolError::new(format!("invalid create_file input: {err}")))?;
        if input.path.trim().is_empty() {
            return Err(ToolError::new("create_file path is empty"));
        }
        Ok(ToolOutput {
            file_path: Some(input.path),
            code: Some(input.content),
            details: serde_json::Map::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passes_path_and_content_through() {
        let tool = CreateFile;
        let output = futures::executor::block_on(tool.execute(&json!({
            "path": "README.md",
            "content": "# app\n"
        })))
        .expect("execute");
        assert_eq!(output.file_path.as_deref(), Some("README.md"));
        assert_eq!(output.code.as_deref(), Some("# app\n"));
    }

    #[test]
    fn empty_path_is_rejected() {
        let tool = CreateFile;
        let err = futures::executor::block_on(tool.execute(&json!({
            "path": "",
            "content": "x"
        })))
        .expect_err("empty path");
        assert!(err.message.contains("path is empty"));
    }
}
