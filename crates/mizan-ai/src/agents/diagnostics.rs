//! The four diagnostic agents fanned out for every problematic field.

use std::sync::Arc;

use async_trait::async_trait;
use mizan_core::{
    AmbiguityVerdict, Capability, ConflictVerdict, DiagnosticVerdict, GapVerdict, RiskVerdict,
};

use super::{AgentError, ModelSettings, context_or_none, invoke};
use crate::inference::{GenerationParams, InferenceService};
use crate::prompts;

/// A stateless diagnostic capability: `(text, context) -> verdict`.
///
/// Implementations are reentrant; any number of concurrent calls is safe.
#[async_trait]
pub trait DiagnosticAgent: Send + Sync {
    fn capability(&self) -> Capability;

    /// Analyze `text`. `context` may be empty; the agent still answers.
    async fn evaluate(&self, text: &str, context: &str) -> Result<DiagnosticVerdict, AgentError>;
}

/// Ambiguity, gap, conflict and risk agents, in that order.
pub fn diagnostic_agents(
    inference: Arc<dyn InferenceService>,
    models: &ModelSettings,
) -> Vec<Arc<dyn DiagnosticAgent>> {
    vec![
        Arc::new(AmbiguityDetector::new(inference.clone(), models)),
        Arc::new(GapDetector::new(inference.clone(), models)),
        Arc::new(ConflictDetector::new(inference.clone(), models)),
        Arc::new(RiskAssessor::new(inference, models)),
    ]
}

/// Message for the rule-versus-standards agents. The field's context stands
/// in for the Shariah standards summary; no FAS summary is available.
fn standards_message(text: &str, context: &str) -> String {
    format!(
        "Rule Text:\n{text}\n\nFAS Summary:\n(none provided)\n\nShariah Standards Summary:\n{}\n",
        context_or_none(context)
    )
}

pub struct AmbiguityDetector {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl AmbiguityDetector {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, true),
            inference,
        }
    }
}

#[async_trait]
impl DiagnosticAgent for AmbiguityDetector {
    fn capability(&self) -> Capability {
        Capability::Ambiguity
    }

    async fn evaluate(&self, text: &str, context: &str) -> Result<DiagnosticVerdict, AgentError> {
        let verdict: AmbiguityVerdict = invoke(
            self.inference.as_ref(),
            "ambiguity",
            prompts::AMBIGUITY,
            standards_message(text, context),
            &self.params,
        )
        .await?;
        Ok(DiagnosticVerdict::Ambiguity(verdict))
    }
}

pub struct GapDetector {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl GapDetector {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, true),
            inference,
        }
    }
}

#[async_trait]
impl DiagnosticAgent for GapDetector {
    fn capability(&self) -> Capability {
        Capability::Gap
    }

    async fn evaluate(&self, text: &str, context: &str) -> Result<DiagnosticVerdict, AgentError> {
        let verdict: GapVerdict = invoke(
            self.inference.as_ref(),
            "gap",
            prompts::GAP,
            standards_message(text, context),
            &self.params,
        )
        .await?;
        Ok(DiagnosticVerdict::Gap(verdict))
    }
}

/// Requests plain text and relies on the parser for structure.
pub struct ConflictDetector {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl ConflictDetector {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, false),
            inference,
        }
    }
}

#[async_trait]
impl DiagnosticAgent for ConflictDetector {
    fn capability(&self) -> Capability {
        Capability::Conflict
    }

    async fn evaluate(&self, text: &str, context: &str) -> Result<DiagnosticVerdict, AgentError> {
        let verdict: ConflictVerdict = invoke(
            self.inference.as_ref(),
            "conflict",
            prompts::CONFLICT,
            standards_message(text, context),
            &self.params,
        )
        .await?;
        Ok(DiagnosticVerdict::Conflict(verdict))
    }
}

/// Requests plain text and relies on the parser for structure.
pub struct RiskAssessor {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl RiskAssessor {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.default_model, false),
            inference,
        }
    }
}

#[async_trait]
impl DiagnosticAgent for RiskAssessor {
    fn capability(&self) -> Capability {
        Capability::Risk
    }

    /// `text` is the product or policy description; `context` the known risks.
    async fn evaluate(&self, text: &str, context: &str) -> Result<DiagnosticVerdict, AgentError> {
        let user = format!(
            "Product Description:\n{text}\n\nKnown Risks:\n{}\n",
            context_or_none(context)
        );
        let verdict: RiskVerdict = invoke(
            self.inference.as_ref(),
            "risk",
            prompts::RISK,
            user,
            &self.params,
        )
        .await?;
        Ok(DiagnosticVerdict::Risk(verdict))
    }
}
