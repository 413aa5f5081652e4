use std::sync::Arc;

use serde::Deserialize;

use super::{AgentError, ModelSettings, invoke};
use crate::inference::{GenerationParams, InferenceService};
use crate::prompts;

#[derive(Deserialize)]
struct Summary {
    #[serde(alias = "findings")]
    summary: String,
}

/// Condenses retrieved reference excerpts into one summary for the drafter.
pub struct ExcerptSummarizer {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl ExcerptSummarizer {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, true),
            inference,
        }
    }

    /// Summarize `excerpts`, each already rendered with its metadata.
    /// No excerpts means no call and an empty summary.
    pub async fn summarize(&self, excerpts: &[String]) -> Result<String, AgentError> {
        if excerpts.is_empty() {
            return Ok(String::new());
        }
        let reply: Summary = invoke(
            self.inference.as_ref(),
            "summarizer",
            prompts::SUMMARIZER,
            excerpts.join("\n\n"),
            &self.params,
        )
        .await?;
        Ok(reply.summary.trim().to_string())
    }
}
