//! Draft review workflow: decompose, scan, propagate, merge.

use mizan_core::{AgentFailure, FinalReview, RegulationDocument, merge};
use serde::Serialize;
use tracing::info;

use crate::dispatcher::Propagator;
use crate::scanner::{ScanFailure, Scanner};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub final_review_report: FinalReview,
    /// Diagnostic tasks that produced no verdict.
    pub degraded: Vec<AgentFailure>,
    pub scan_failures: Vec<ScanFailure>,
    pub fields_scanned: usize,
    pub fields_flagged: usize,
}

pub async fn review_document(
    scanner: &Scanner,
    propagator: &Propagator,
    document: &RegulationDocument,
) -> ReviewOutcome {
    let fields = document.decompose();
    info!(fields = fields.len(), "review workflow started");

    let scan = scanner.scan(&fields).await;
    let bundle = propagator.propagate(&scan.problematic).await;
    let final_review_report = merge(&bundle);

    let outcome = ReviewOutcome {
        degraded: bundle.failures(),
        scan_failures: scan.failures,
        fields_scanned: scan.scanned,
        fields_flagged: scan.problematic.len(),
        final_review_report,
    };
    info!(
        flagged = outcome.fields_flagged,
        verdicts = outcome.final_review_report.total(),
        degraded = outcome.degraded.len(),
        "review workflow complete"
    );
    outcome
}
