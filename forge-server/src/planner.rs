//! Ollama-backed planner.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use forge::planner::Planner;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Planner that calls a local Ollama instance's generate endpoint.
#[derive(Debug, Clone)]
pub struct OllamaPlanner {
    base_url: String,
    model: String,
}

impl OllamaPlanner {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn request(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response: GenerateResponse = ureq::post(&url)
            .send_json(&body)
            .with_context(|| format!("call planner at {url}"))?
            .body_mut()
            .read_json()
            .context("parse planner response")?;
        debug!(bytes = response.response.len(), "planner responded");
        Ok(response.response)
    }
}

#[async_trait]
impl Planner for OllamaPlanner {
    async fn plan(&self, prompt: &str) -> Result<String> {
        // ureq is blocking; keep it off the async runtime.
        let planner = self.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || planner.request(&prompt))
            .await
            .map_err(|err| anyhow!("planner task died: {err}"))?
    }
}
