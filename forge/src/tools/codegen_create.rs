//! Template-driven code generation tool.

use async_trait::async_trait;
use minijinja::{Environment, context};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::types::ToolOutput;
use crate::tools::{Tool, ToolError};

const TEMPLATES: &[(&str, &str)] = &[
    (
        "sqlalchemy-model",
        include_str!("../../templates/codegen/sqlalchemy-model.j2"),
    ),
    (
        "fastapi-route",
        include_str!("../../templates/codegen/fastapi-route.j2"),
    ),
    (
        "react-component",
        include_str!("../../templates/codegen/react-component.j2"),
    ),
    (
        "vue-component",
        include_str!("../../templates/codegen/vue-component.j2"),
    ),
    (
        "mongoose-model",
        include_str!("../../templates/codegen/mongoose-model.j2"),
    ),
    (
        "express-route",
        include_str!("../../templates/codegen/express-route.j2"),
    ),
    (
        "django-model",
        include_str!("../../templates/codegen/django-model.j2"),
    ),
    (
        "django-rest-route",
        include_str!("../../templates/codegen/django-rest-route.j2"),
    ),
    (
        "next-page",
        include_str!("../../templates/codegen/next-page.j2"),
    ),
    (
        "next-api-route",
        include_str!("../../templates/codegen/next-api-route.j2"),
    ),
    (
        "package-json",
        include_str!("../../templates/codegen/package-json.j2"),
    ),
    (
        "requirements-txt",
        include_str!("../../templates/codegen/requirements-txt.j2"),
    ),
];

/// Input contract for `codegen_create`.
#[derive(Debug, Deserialize)]
struct CreateInput {
    template: String,
    file_path: String,
    #[serde(default)]
    variables: Variables,
}

#[derive(Debug, Default, Deserialize)]
struct Variables {
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    tech_stack: String,
    #[serde(default)]
    styling: String,
}

/// Generates a source file from one of the embedded templates.
pub struct CodegenCreate {
    env: Environment<'static>,
}

impl CodegenCreate {
    pub fn new() -> Self {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .expect("embedded codegen template should be valid");
        }
        Self { env }
    }

    pub fn template_names() -> Vec<&'static str> {
        TEMPLATES.iter().map(|(name, _)| *name).collect()
    }
}

impl Default for CodegenCreate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CodegenCreate {
    fn name(&self) -> &str {
        "codegen_create"
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let input: CreateInput = serde_json::from_value(input.clone())
            .map_err(|err| ToolError::new(format!("invalid codegen_create input: {err}")))?;

        let template = self
            .env
            .get_template(&input.template)
            .map_err(|_| ToolError::new(format!("unknown template: {}", input.template)))?;
        let code = template
            .render(context! {
                project_name => input.variables.project_name,
                description => input.variables.description,
                features => input.variables.features,
                tech_stack => input.variables.tech_stack,
                styling => input.variables.styling,
            })
            .map_err(|err| {
                ToolError::new(format!("render template {}: {err}", input.template))
            })?;

        debug!(template = %input.template, file_path = %input.file_path, "code generated");
        let mut details = serde_json::Map::new();
        details.insert("template".to_string(), Value::String(input.template));
        Ok(ToolOutput {
            file_path: Some(input.file_path),
            code: Some(tidy(&code)),
            details,
        })
    }
}

/// Collapse the blank lines template conditionals leave behind.
fn tidy(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut blank_run = 0;
    for line in code.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim_start_matches('\n').to_string()
}
