//! Core types for Mizan: regulation documents, verdicts, reports and query plans.

pub mod capability;
pub mod document;
pub mod plan;
pub mod report;
pub mod verdict;

pub use capability::{Capability, DIAGNOSTICS};
pub use document::{
    Category, DocumentError, Field, FieldGroup, RegulationDocument, Section, SectionVocabulary,
};
pub use plan::{ExecutionPlan, PlanStep, RelevantSections, StepOutput};
pub use report::{
    AgentFailure, AgentReport, FieldBundle, FieldReportBundle, FinalReview, Severity, merge,
};
pub use verdict::{
    AmbiguityVerdict, ComplianceStatus, ComplianceVerdict, ConflictVerdict, DiagnosticVerdict,
    GapVerdict, RevisionProposal, RiskVerdict,
};
