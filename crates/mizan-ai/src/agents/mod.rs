//! Capability agents: one inference call each, parsed into a typed verdict.

mod compliance;
mod diagnostics;
mod drafter;
mod qa;
mod summarizer;

pub use compliance::ComplianceClassifier;
pub use diagnostics::{
    AmbiguityDetector, ConflictDetector, DiagnosticAgent, GapDetector, RiskAssessor,
    diagnostic_agents,
};
pub use drafter::RevisionDrafter;
pub use qa::{AnswerAggregator, Planner, SectionIdentifier};
pub use summarizer::ExcerptSummarizer;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::inference::{ChatMessage, GenerationParams, InferenceError, InferenceService};
use crate::parse::{ParseOutcome, parse_verdict};

/// Why an agent produced no verdict.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The service call itself failed: timeout, auth, rate limit, transport.
    #[error("inference unavailable: {0}")]
    InferenceUnavailable(#[from] InferenceError),

    /// The response could not be coerced into the verdict shape, even
    /// after the repair pass.
    #[error("{agent} response could not be parsed (repairs tried: {attempted_repairs:?})")]
    VerdictParse {
        agent: &'static str,
        raw: String,
        attempted_repairs: Vec<&'static str>,
    },
}

impl AgentError {
    /// Stable error taxonomy label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InferenceUnavailable(_) => "InferenceUnavailableError",
            Self::VerdictParse { .. } => "VerdictParseError",
        }
    }

    /// Only service failures are worth retrying; a bad parse is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InferenceUnavailable(_))
    }
}

/// Model choice and sampling temperature for each agent family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Diagnostics and query-answering agents.
    pub default_model: String,
    pub compliance_model: String,
    pub drafting_model: String,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            default_model: "gpt-3.5-turbo".into(),
            compliance_model: "gpt-4.1-mini".into(),
            drafting_model: "gpt-4.1-mini".into(),
            temperature: 0.2,
        }
    }
}

impl ModelSettings {
    pub(crate) fn params(&self, model: &str, json_mode: bool) -> GenerationParams {
        GenerationParams {
            model: model.to_string(),
            temperature: self.temperature,
            json_mode,
        }
    }
}

/// Supporting context as shown to the model; empty context is stated, not omitted.
pub(crate) fn context_or_none(context: &str) -> &str {
    if context.trim().is_empty() {
        "(none provided)"
    } else {
        context
    }
}

/// Send `system` + `user` and parse the reply as `T`.
pub(crate) async fn invoke<T: DeserializeOwned>(
    inference: &dyn InferenceService,
    agent: &'static str,
    system: &str,
    user: String,
    params: &GenerationParams,
) -> Result<T, AgentError> {
    let messages = [ChatMessage::system(system), ChatMessage::user(user)];
    let raw = inference.complete(&messages, params).await?;
    match parse_verdict::<T>(&raw) {
        ParseOutcome::Parsed { value, repairs } => {
            if !repairs.is_empty() {
                debug!(agent, ?repairs, "parsed after lenient repair");
            }
            Ok(value)
        }
        ParseOutcome::ParseFailed {
            raw_text,
            attempted_repairs,
        } => Err(AgentError::VerdictParse {
            agent,
            raw: raw_text,
            attempted_repairs,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_labels() {
        let e = AgentError::InferenceUnavailable(InferenceError::EmptyResponse);
        assert_eq!(e.label(), "InferenceUnavailableError");
        assert!(e.is_retryable());

        let e = AgentError::VerdictParse {
            agent: "gap",
            raw: "nope".into(),
            attempted_repairs: vec![],
        };
        assert_eq!(e.label(), "VerdictParseError");
        assert!(!e.is_retryable());
    }

    #[test]
    fn default_models() {
        let m = ModelSettings::default();
        assert_eq!(m.compliance_model, "gpt-4.1-mini");
        assert_eq!(m.default_model, "gpt-3.5-turbo");
        let p = m.params(&m.drafting_model, true);
        assert!(p.json_mode);
        assert_eq!(p.temperature, 0.2);
    }

    #[test]
    fn empty_context_is_stated() {
        assert_eq!(context_or_none("  "), "(none provided)");
        assert_eq!(context_or_none("SS 3"), "SS 3");
    }
}
