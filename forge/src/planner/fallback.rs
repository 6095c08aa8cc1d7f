//! Deterministic fallback plans keyed off the declared tech stack.
//!
//! Used whenever the model planner is unavailable or produces output that
//! fails validation. The same spec always yields the same plan.

use serde_json::{Value, json};

use crate::core::types::{AppSpec, PlanStep};

/// Build the fallback plan for `spec`.
///
/// Stack matching is substring-based on the free-text `tech_stack`. Three
/// recipes exist; anything unrecognized gets the FastAPI + React default.
pub fn fallback_plan(spec: &AppSpec) -> Vec<PlanStep> {
    let stack = spec.tech_stack.as_str();
    let recipe: &[(&str, &str)] = if stack.contains("Vue") && stack.contains("Node") {
        &[
            ("mongoose-model", "backend/models/User.js"),
            ("express-route", "backend/routes/api.js"),
            ("vue-component", "frontend/src/App.vue"),
        ]
    } else if stack.contains("Next.js") && stack.contains("Django") {
        &[
            ("django-model", "backend/app/models.py"),
            ("django-rest-route", "backend/app/urls.py"),
            ("next-page", "frontend/pages/index.jsx"),
        ]
    } else {
        &[
            ("sqlalchemy-model", "backend/app/models.py"),
            ("fastapi-route", "backend/app/routers/api.py"),
            ("react-component", "frontend/src/App.jsx"),
        ]
    };

    recipe
        .iter()
        .map(|(template, file_path)| PlanStep {
            tool: "codegen_create".to_string(),
            input: json!({
                "template": template,
                "file_path": file_path,
                "variables": variables(spec),
            }),
        })
        .collect()
}

fn variables(spec: &AppSpec) -> Value {
    json!({
        "project_name": spec.project_name,
        "description": spec.description,
        "features": spec.features,
        "tech_stack": spec.tech_stack,
        "styling": spec.styling,
    })
}
