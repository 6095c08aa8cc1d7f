//! Rule-based refactoring tool for previously generated files.
//!
//! Applies deterministic local rewrites keyed off the instruction text. No
//! model call is involved, so the same input always yields the same output.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::types::ToolOutput;
use crate::store::now_rfc3339;
use crate::tools::{Tool, ToolError};

/// Input contract for `codegen_refactor`.
#[derive(Debug, Deserialize)]
struct RefactorInput {
    file_path: String,
    code: String,
    instructions: String,
}

/// Styling class rewrites applied when the instructions ask for a framework
/// migration.
const TAILWIND_TO_BOOTSTRAP: &[(&str, &str)] = &[
    ("mx-auto max-w-2xl p-6", "container py-4"),
    ("text-2xl font-bold", "h3 fw-bold"),
    ("mt-4 space-y-2", "mt-3 list-group"),
    ("rounded border p-3 shadow-sm", "list-group-item"),
    ("rounded border p-3", "list-group-item"),
];

const BOOTSTRAP_TO_TAILWIND: &[(&str, &str)] = &[
    ("container py-4", "mx-auto max-w-2xl p-6"),
    ("h3 fw-bold", "text-2xl font-bold"),
    ("mt-3 list-group", "mt-4 space-y-2"),
    ("list-group-item", "rounded border p-3 shadow-sm"),
];

pub struct CodegenRefactor;

impl CodegenRefactor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CodegenRefactor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CodegenRefactor {
    fn name(&self) -> &str {
        "codegen_refactor"
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let input: RefactorInput = serde_json::from_value(input.clone())
            .map_err(|err| ToolError::new(format!("invalid codegen_refactor input: {err}")))?;
        if input.code.trim().is_empty() {
            return Err(ToolError::new("refactor input code is empty"));
        }

        let mut code = input.code.clone();
        let wants = |keyword: &str| {
            input
                .instructions
                .to_lowercase()
                .contains(&keyword.to_lowercase())
        };

        let mut applied = Vec::new();
        if wants("bootstrap") {
            code = substitute(&code, TAILWIND_TO_BOOTSTRAP);
            applied.push("styling:bootstrap");
        } else if wants("tailwind") {
            code = substitute(&code, BOOTSTRAP_TO_TAILWIND);
            applied.push("styling:tailwind");
        }
        if wants("error handling") {
            code = wrap_error_handling(&code, &input.file_path);
            applied.push("error_handling");
        }
        if wants("documentation") || wants("docstring") {
            code = add_doc_header(&code, &input.file_path);
            applied.push("documentation");
        }

        let header = refactor_header(&input.file_path, &input.instructions);
        let code = format!("{header}{code}");

        debug!(file_path = %input.file_path, rules = ?applied, "refactor applied");
        let mut details = serde_json::Map::new();
        details.insert(
            "applied_rules".to_string(),
            Value::Array(
                applied
                    .into_iter()
                    .map(|rule| Value::String(rule.to_string()))
                    .collect(),
            ),
        );
        Ok(ToolOutput {
            file_path: Some(input.file_path),
            code: Some(code),
            details,
        })
    }
}

fn substitute(code: &str, rules: &[(&str, &str)]) -> String {
    let mut out = code.to_string();
    for (from, to) in rules {
        out = out.replace(from, to);
    }
    out
}

fn comment_prefix(file_path: &str) -> &'static str {
    if file_path.ends_with(".py") || file_path.ends_with(".txt") {
        "#"
    } else {
        "//"
    }
}

fn refactor_header(file_path: &str, instructions: &str) -> String {
    let prefix = comment_prefix(file_path);
    format!(
        "{prefix} Refactored on {}: {}\n",
        now_rfc3339(),
        instructions.trim()
    )
}

fn wrap_error_handling(code: &str, file_path: &str) -> String {
    if file_path.ends_with(".py") {
        let indented = code
            .lines()
            .map(|line| {
                if line.is_empty() {
                    line.to_string()
                } else {
                    format!("    {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "try:\n{indented}\nexcept Exception as exc:\n    raise RuntimeError(f\"unhandled error: {{exc}}\") from exc\n"
        )
    } else {
        format!("try {{\n{code}\n}} catch (err) {{\n  console.error(\"unhandled error\", err);\n  throw err;\n}}\n")
    }
}

fn add_doc_header(code: &str, file_path: &str) -> String {
    if file_path.ends_with(".py") {
        format!("\"\"\"Module documentation.\n\nSee project README for usage.\n\"\"\"\n\n{code}")
    } else {
        format!("/**\n * Module documentation.\n * See project README for usage.\n */\n{code}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(input: Value) -> Result<ToolOutput, ToolError> {
        let tool = CodegenRefactor::new();
        futures::executor::block_on(tool.execute(&input))
    }

    #[test]
    fn bootstrap_migration_rewrites_classes() {
        let output = run(json!({
            "file_path": "frontend/src/App.jsx",
            "code": "<div className=\"mx-auto max-w-2xl p-6\">hi</div>",
            "instructions": "Migrate styling to Bootstrap"
        }))
        .expect("execute");

        let code = output.code.expect("code");
        assert!(code.contains("container py-4"));
        assert!(!code.contains("max-w-2xl"));
        assert!(code.starts_with("// Refactored on "));
        assert_eq!(output.details["applied_rules"][0], "styling:bootstrap");
    }

    #[test]
    fn python_error_handling_uses_try_except() {
        let output = run(json!({
            "file_path": "backend/app/main.py",
            "code": "value = compute()",
            "instructions": "add error handling"
        }))
        .expect("execute");

        let code = output.code.expect("code");
        assert!(code.starts_with("# Refactored on "));
        assert!(code.contains("try:"));
        assert!(code.contains("except Exception as exc:"));
        assert!(code.contains("    value = compute()"));
    }

    #[test]
    fn unmatched_instructions_still_prepend_header() {
        let output = run(json!({
            "file_path": "frontend/src/App.jsx",
            "code": "export default 1;",
            "instructions": "rename things"
        }))
        .expect("execute");

        let code = output.code.expect("code");
        assert!(code.contains("rename things"));
        assert!(code.contains("export default 1;"));
        assert_eq!(output.details["applied_rules"], json!([]));
    }

    #[test]
    fn empty_code_is_rejected() {
        let err = run(json!({
            "file_path": "a.py",
            "code": "  ",
            "instructions": "docs"
        }))
        .expect_err("empty code");
        assert!(err.message.contains("empty"));
    }
}
