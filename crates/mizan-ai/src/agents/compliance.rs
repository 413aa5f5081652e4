use std::sync::Arc;

use mizan_core::ComplianceVerdict;

use super::{AgentError, ModelSettings, context_or_none, invoke};
use crate::inference::{GenerationParams, InferenceService};
use crate::prompts;

/// Three-way Shariah compliance classification of one rule.
pub struct ComplianceClassifier {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl ComplianceClassifier {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.compliance_model, true),
            inference,
        }
    }

    /// Classify `text` against the standards summary in `context`, which may be empty.
    pub async fn evaluate(&self, text: &str, context: &str) -> Result<ComplianceVerdict, AgentError> {
        let user = format!(
            "Rule Text:\n{text}\n\nShariah Standards Summary:\n{}\n",
            context_or_none(context)
        );
        invoke(
            self.inference.as_ref(),
            "compliance",
            prompts::COMPLIANCE,
            user,
            &self.params,
        )
        .await
    }
}
