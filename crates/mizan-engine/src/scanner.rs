//! Compliance scan: classify every field, keep the ones that are not compliant.

use mizan_ai::{AgentError, ComplianceClassifier};
use mizan_core::{ComplianceStatus, ComplianceVerdict, Field};
use serde::Serialize;
use tracing::{debug, info, warn};

/// A field whose verdict is not `compliant`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblematicField {
    pub field: Field,
    pub verdict: ComplianceVerdict,
}

impl ProblematicField {
    pub fn location(&self) -> &str {
        &self.field.location
    }

    pub fn status(&self) -> ComplianceStatus {
        self.verdict.compliance_status
    }

    pub fn justification(&self) -> &str {
        &self.verdict.justification
    }
}

/// A field whose classification failed after the retry policy ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub location: String,
    /// Error taxonomy label.
    pub error: String,
    pub message: String,
}

impl ScanFailure {
    pub fn new(location: &str, err: &AgentError) -> Self {
        Self {
            location: location.to_string(),
            error: err.label().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub problematic: Vec<ProblematicField>,
    pub failures: Vec<ScanFailure>,
    pub scanned: usize,
}

/// Classifies fields one at a time.
///
/// A classifier call that fails with `InferenceUnavailableError` is retried
/// once; `VerdictParseError` is not retried. A field that still fails is
/// recorded as a [`ScanFailure`] and the scan moves on.
pub struct Scanner {
    classifier: ComplianceClassifier,
}

impl Scanner {
    pub fn new(classifier: ComplianceClassifier) -> Self {
        Self { classifier }
    }

    /// Classify one field under the retry-once policy.
    pub async fn classify(&self, field: &Field) -> Result<ComplianceVerdict, AgentError> {
        match self.classifier.evaluate(&field.text, "").await {
            Err(e) if e.is_retryable() => {
                warn!(location = %field.location, error = e.label(), "classification failed, retrying once");
                self.classifier.evaluate(&field.text, "").await
            }
            other => other,
        }
    }

    /// Classify every field in order and keep the non-compliant ones.
    pub async fn scan(&self, fields: &[Field]) -> ScanReport {
        let mut report = ScanReport {
            scanned: fields.len(),
            ..Default::default()
        };

        for field in fields {
            match self.classify(field).await {
                Ok(verdict) => {
                    debug!(location = %field.location, status = %verdict.compliance_status, "field classified");
                    if !verdict.compliance_status.is_compliant() {
                        report.problematic.push(ProblematicField {
                            field: field.clone(),
                            verdict,
                        });
                    }
                }
                Err(e) => {
                    warn!(location = %field.location, error = e.label(), message = %e, "field not classified");
                    report.failures.push(ScanFailure::new(&field.location, &e));
                }
            }
        }

        info!(
            scanned = report.scanned,
            flagged = report.problematic.len(),
            failed = report.failures.len(),
            "compliance scan complete"
        );
        report
    }
}
