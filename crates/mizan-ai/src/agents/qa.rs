//! Query-answering agents: section identification, planning, and the final answer.

use std::sync::Arc;

use mizan_core::{ExecutionPlan, RelevantSections, SectionVocabulary, StepOutput};
use serde::Deserialize;
use serde_json::json;

use super::{AgentError, ModelSettings, invoke};
use crate::inference::{GenerationParams, InferenceService};
use crate::prompts;

/// Maps a free-text query to the sections of a vocabulary that bear on it.
///
/// The response is returned as given; checking it against the vocabulary
/// is the caller's job.
pub struct SectionIdentifier {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl SectionIdentifier {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, true),
            inference,
        }
    }

    pub async fn identify(
        &self,
        query: &str,
        vocabulary: &SectionVocabulary,
    ) -> Result<RelevantSections, AgentError> {
        let user = format!(
            "Question: {query}\n\nAvailable Sections:\n{:#}\n",
            vocabulary.to_json()
        );
        invoke(
            self.inference.as_ref(),
            "section_identifier",
            prompts::SECTION_IDENTIFIER,
            user,
            &self.params,
        )
        .await
    }
}

/// Builds an execution plan over the four diagnostic agents.
pub struct Planner {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl Planner {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, true),
            inference,
        }
    }

    pub async fn plan(
        &self,
        query: &str,
        relevant: &RelevantSections,
    ) -> Result<ExecutionPlan, AgentError> {
        let parts = serde_json::to_value(relevant).unwrap_or_default();
        let user = format!("Query: {query}\n\nRelevant Parts:\n{parts:#}\n");
        invoke(
            self.inference.as_ref(),
            "planner",
            prompts::PLANNER,
            user,
            &self.params,
        )
        .await
    }
}

#[derive(Deserialize)]
struct FinalAnswer {
    final_answer: String,
}

/// Synthesizes step outputs into one narrative answer.
pub struct AnswerAggregator {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl AnswerAggregator {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, true),
            inference,
        }
    }

    pub async fn aggregate(
        &self,
        query: &str,
        strategy: &str,
        outputs: &[StepOutput],
    ) -> Result<String, AgentError> {
        let input = json!({
            "query": query,
            "aggregation_strategy": strategy,
            "step_outputs": outputs,
        });
        let answer: FinalAnswer = invoke(
            self.inference.as_ref(),
            "aggregator",
            prompts::AGGREGATOR,
            format!("{input:#}"),
            &self.params,
        )
        .await?;
        Ok(answer.final_answer)
    }
}
