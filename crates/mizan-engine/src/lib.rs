//! Orchestration core: compliance scan, diagnostic dispatch, revision drafting, query answering.

mod advisor;
mod config;
mod dispatcher;
mod error;
mod qa;
mod retrieval;
mod review;
mod revision;
mod scanner;

pub use advisor::{Advisor, HealthReport, HealthStatus, ServiceHealth, ServiceState};
pub use config::EngineConfig;
pub use dispatcher::Propagator;
pub use error::EngineError;
pub use qa::{AnalysisProcess, QueryAnswer, QueryPipeline};
pub use retrieval::Retriever;
pub use review::{ReviewOutcome, review_document};
pub use revision::{
    DraftedCategory, DraftedSection, DraftingOutcome, RevisionPipeline, draft_document,
};
pub use scanner::{ProblematicField, ScanFailure, ScanReport, Scanner};
