//! Inference layer: OpenAI-compatible client, verdict parsing, and the capability agents.

pub mod agents;
pub mod embedder;
pub mod inference;
pub mod parse;
pub mod prompts;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use agents::{
    AgentError, AnswerAggregator, ComplianceClassifier, DiagnosticAgent, ExcerptSummarizer,
    ModelSettings, Planner, RevisionDrafter, SectionIdentifier, diagnostic_agents,
};
pub use embedder::Embedder;
pub use inference::{ChatMessage, GenerationParams, InferenceError, InferenceService, OpenAiClient};
pub use parse::{ParseOutcome, parse_verdict};
