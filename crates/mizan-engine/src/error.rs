use mizan_ai::AgentError;
use mizan_core::DocumentError;
use thiserror::Error;

/// A failure that aborts the current request.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid regulation document: {0}")]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The planner or section identifier stepped outside the closed vocabulary.
    #[error("plan validation failed: {reason}")]
    PlanValidation { reason: String },
}

impl EngineError {
    /// Stable error taxonomy label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document(_) => "InvalidInput",
            Self::Agent(e) => e.label(),
            Self::PlanValidation { .. } => "PlanValidationError",
        }
    }

    /// Caller input errors, as opposed to core-internal failures.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Document(_))
    }

    pub fn is_inference_unavailable(&self) -> bool {
        matches!(self, Self::Agent(AgentError::InferenceUnavailable(_)))
    }

    pub(crate) fn plan(reason: impl Into<String>) -> Self {
        Self::PlanValidation {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_ai::InferenceError;

    #[test]
    fn labels() {
        assert_eq!(EngineError::plan("x").label(), "PlanValidationError");
        assert_eq!(
            EngineError::from(DocumentError::Empty).label(),
            "InvalidInput"
        );
        assert!(EngineError::from(DocumentError::Empty).is_input_error());
        let e = EngineError::from(AgentError::InferenceUnavailable(InferenceError::EmptyResponse));
        assert_eq!(e.label(), "InferenceUnavailableError");
        assert!(e.is_inference_unavailable());
        let e = EngineError::from(AgentError::InferenceUnavailable(InferenceError::Unauthorized {
            status: 401,
        }));
        assert!(e.is_inference_unavailable());
        assert!(!e.is_input_error());
    }
}
