//! Plan generation: model-backed planner with a deterministic fallback.
//!
//! The [`Planner`] trait decouples plan sourcing from the model backend.
//! Raw planner text is validated against an embedded JSON Schema before any
//! step is materialized; a plan that fails validation is not repaired, the
//! whole source falls back to the stack-keyed table in [`fallback`].

pub mod fallback;

use std::sync::Arc;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use jsonschema::validator_for;
use minijinja::{Environment, context};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::types::{AppSpec, PlanStep};

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");
const PROMPT_TEMPLATE: &str = include_str!("../../templates/plan_prompt.md");

/// Produces raw plan text for a prompt. Implementations call a model backend.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, prompt: &str) -> Result<String>;
}

/// Planner output could not be turned into a valid plan.
#[derive(Debug)]
pub struct PlanFormatError {
    pub message: String,
}

impl std::fmt::Display for PlanFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plan format error: {}", self.message)
    }
}

impl std::error::Error for PlanFormatError {}

/// Outcome of plan generation, recording whether the fallback produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub steps: Vec<PlanStep>,
    /// Why the planner's output was discarded, when the fallback was used.
    pub fallback_reason: Option<String>,
}

/// Generates plans, preferring the configured planner and falling back to the
/// deterministic table on any planner or format failure.
pub struct PlanSource {
    planner: Arc<dyn Planner>,
    tool_names: Vec<String>,
}

impl PlanSource {
    pub fn new(planner: Arc<dyn Planner>, tool_names: Vec<String>) -> Self {
        Self {
            planner,
            tool_names,
        }
    }

    /// Generate a plan for `spec`. Never fails: the fallback table covers any
    /// spec that validates.
    pub async fn generate_plan(&self, spec: &AppSpec) -> Result<PlanOutcome> {
        spec.validate().map_err(|msg| anyhow!(msg))?;
        let prompt = render_prompt(spec, &self.tool_names)?;

        match self.planner.plan(&prompt).await {
            Ok(raw) => match parse_plan(&raw) {
                Ok(steps) => {
                    debug!(steps = steps.len(), "planner produced a valid plan");
                    Ok(PlanOutcome {
                        steps,
                        fallback_reason: None,
                    })
                }
                Err(err) => {
                    warn!(error = %err, "planner output rejected, using fallback plan");
                    Ok(PlanOutcome {
                        steps: fallback::fallback_plan(spec),
                        fallback_reason: Some(format!("{err:#}")),
                    })
                }
            },
            Err(err) => {
                warn!(error = %err, "planner unavailable, using fallback plan");
                Ok(PlanOutcome {
                    steps: fallback::fallback_plan(spec),
                    fallback_reason: Some(format!("planner unavailable: {err:#}")),
                })
            }
        }
    }
}

fn render_prompt(spec: &AppSpec, tool_names: &[String]) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("plan_prompt", PROMPT_TEMPLATE)
        .context("plan prompt template should be valid")?;
    let template = env.get_template("plan_prompt")?;
    let rendered = template.render(context! {
        project_name => spec.project_name,
        description => spec.description,
        features => spec.features,
        tech_stack => spec.tech_stack,
        styling => (!spec.styling.trim().is_empty()).then_some(spec.styling.as_str()),
        tools => tool_names,
    })?;
    Ok(rendered)
}

/// Parse and validate raw planner text into plan steps.
///
/// Tolerates a markdown code fence around the JSON, since models add one
/// despite instructions. Everything else must validate against the schema.
pub fn parse_plan(raw: &str) -> Result<Vec<PlanStep>> {
    let stripped = strip_code_fence(raw);
    let value: Value = serde_json::from_str(stripped.trim()).map_err(|err| {
        anyhow::Error::new(PlanFormatError {
            message: format!("not valid JSON: {err}"),
        })
    })?;
    validate_schema(&value)?;
    let steps: Vec<PlanStep> = serde_json::from_value(value).map_err(|err| {
        anyhow::Error::new(PlanFormatError {
            message: format!("deserialize plan: {err}"),
        })
    })?;
    Ok(steps)
}

fn strip_code_fence(raw: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("fence regex is valid")
    });
    match FENCE_RE.captures(raw) {
        Some(caps) => caps.get(1).map_or(raw, |m| m.as_str()),
        None => raw,
    }
}

fn validate_schema(plan: &Value) -> Result<()> {
    let schema_value: Value =
        serde_json::from_str(PLAN_SCHEMA).context("embedded plan schema should parse")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid plan schema: {err}"))?;
    if !compiled.is_valid(plan) {
        let messages = compiled
            .iter_errors(plan)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow::Error::new(PlanFormatError {
            message: format!("schema validation failed: {}", messages.join("; ")),
        }));
    }
    Ok(())
}
