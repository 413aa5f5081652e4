//! Agent reports, per-field bundles, and the merged final review.

use serde::Serialize;

use crate::capability::Capability;
use crate::verdict::DiagnosticVerdict;

/// Severity of one agent report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// The severity table, keyed by the producing capability.
    ///
    /// | capability | rule |
    /// |---|---|
    /// | ambiguity | `ambiguous` → high, else low |
    /// | gap | `has_gaps` → high, else low |
    /// | conflict | `conflict` → high, else low |
    /// | risk | highest item severity (High / Medium / Low); no risks → low |
    pub fn derive(verdict: &DiagnosticVerdict) -> Self {
        match verdict {
            DiagnosticVerdict::Ambiguity(v) => Self::flag(v.ambiguous),
            DiagnosticVerdict::Gap(v) => Self::flag(v.has_gaps),
            DiagnosticVerdict::Conflict(v) => Self::flag(v.conflict),
            DiagnosticVerdict::Risk(v) => v
                .risks
                .iter()
                .map(|r| Self::from_label(&r.severity))
                .max()
                .unwrap_or(Self::Low),
        }
    }

    fn flag(flagged: bool) -> Self {
        if flagged { Self::High } else { Self::Low }
    }

    /// Case-insensitive `high` / `medium` / `low`; anything else is low.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Self::High,
            "medium" | "moderate" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// One diagnostic agent's verdict on one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReport {
    pub agent_name: String,
    pub field_location: String,
    pub analysis_result: DiagnosticVerdict,
    pub severity: Severity,
}

impl AgentReport {
    /// Build a report, deriving the agent name and severity from the verdict.
    pub fn new(field_location: impl Into<String>, verdict: DiagnosticVerdict) -> Self {
        Self {
            agent_name: verdict.capability().agent_name().to_string(),
            field_location: field_location.into(),
            severity: Severity::derive(&verdict),
            analysis_result: verdict,
        }
    }

    pub fn capability(&self) -> Capability {
        self.analysis_result.capability()
    }
}

/// A diagnostic task that produced no verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentFailure {
    pub agent_name: String,
    pub field_location: String,
    pub capability: Capability,
    /// Error taxonomy label, e.g. `InferenceUnavailableError`.
    pub error: String,
    pub message: String,
}

/// All diagnostic outcomes for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldBundle {
    pub location: String,
    pub reports: Vec<AgentReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AgentFailure>,
}

impl FieldBundle {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when at least one dispatched capability failed.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of dispatched tasks that resolved, either way.
    pub fn resolved(&self) -> usize {
        self.reports.len() + self.failures.len()
    }
}

/// Field location → bundle, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldReportBundle {
    fields: Vec<FieldBundle>,
}

impl FieldReportBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed field bundle. A bundle for an existing location
    /// is folded into it.
    pub fn insert(&mut self, bundle: FieldBundle) {
        match self.fields.iter_mut().find(|b| b.location == bundle.location) {
            Some(existing) => {
                existing.reports.extend(bundle.reports);
                existing.failures.extend(bundle.failures);
            }
            None => self.fields.push(bundle),
        }
    }

    pub fn get(&self, location: &str) -> Option<&FieldBundle> {
        self.fields.iter().find(|b| b.location == location)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBundle> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn report_count(&self) -> usize {
        self.fields.iter().map(|b| b.reports.len()).sum()
    }

    /// Every failure across all fields, in field order.
    pub fn failures(&self) -> Vec<AgentFailure> {
        self.fields
            .iter()
            .flat_map(|b| b.failures.iter().cloned())
            .collect()
    }
}

impl FromIterator<FieldBundle> for FieldReportBundle {
    fn from_iter<I: IntoIterator<Item = FieldBundle>>(iter: I) -> Self {
        let mut bundle = Self::new();
        for b in iter {
            bundle.insert(b);
        }
        bundle
    }
}

/// Verdicts regrouped by diagnostic category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalReview {
    #[serde(rename = "Ambiguity")]
    pub ambiguity: Vec<DiagnosticVerdict>,
    #[serde(rename = "Gap")]
    pub gap: Vec<DiagnosticVerdict>,
    #[serde(rename = "Conflict")]
    pub conflict: Vec<DiagnosticVerdict>,
    #[serde(rename = "Risk")]
    pub risk: Vec<DiagnosticVerdict>,
}

impl FinalReview {
    /// The bucket for a diagnostic capability; `None` for compliance/revision.
    pub fn bucket(&self, capability: Capability) -> Option<&[DiagnosticVerdict]> {
        match capability {
            Capability::Ambiguity => Some(&self.ambiguity),
            Capability::Gap => Some(&self.gap),
            Capability::Conflict => Some(&self.conflict),
            Capability::Risk => Some(&self.risk),
            Capability::Compliance | Capability::Revision => None,
        }
    }

    pub fn total(&self) -> usize {
        self.ambiguity.len() + self.gap.len() + self.conflict.len() + self.risk.len()
    }

    fn push(&mut self, verdict: DiagnosticVerdict) {
        match verdict {
            DiagnosticVerdict::Ambiguity(_) => self.ambiguity.push(verdict),
            DiagnosticVerdict::Gap(_) => self.gap.push(verdict),
            DiagnosticVerdict::Conflict(_) => self.conflict.push(verdict),
            DiagnosticVerdict::Risk(_) => self.risk.push(verdict),
        }
    }
}

/// Regroup every report's verdict into its capability's bucket.
///
/// Failures carry no verdict and are not merged.
pub fn merge(bundle: &FieldReportBundle) -> FinalReview {
    let mut review = FinalReview::default();
    for field in bundle.iter() {
        for report in &field.reports {
            review.push(report.analysis_result.clone());
        }
    }
    review
}
