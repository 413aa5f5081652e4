//! Structured verdicts produced by the capability agents.
//!
//! Wire field names follow the JSON the agents are prompted to emit. Rust
//! field names describe the content; aliases accept common variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::capability::Capability;

/// Three-way Shariah compliance judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplianceStatus {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::PartiallyCompliant => "partially_compliant",
            Self::NonCompliant => "non_compliant",
        }
    }

    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    /// Accepts `non_compliant`, `Non-Compliant`, `non compliant`, etc.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match norm.as_str() {
            "compliant" | "fully_compliant" => Ok(Self::Compliant),
            "partially_compliant" | "partial" => Ok(Self::PartiallyCompliant),
            "non_compliant" | "noncompliant" | "not_compliant" => Ok(Self::NonCompliant),
            _ => Err(format!("unknown compliance status: {s:?}")),
        }
    }
}

impl Serialize for ComplianceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComplianceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compliance Classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub compliance_status: ComplianceStatus,
    #[serde(default)]
    pub justification: String,
    #[serde(default, alias = "references")]
    pub referenced_clauses: Vec<String>,
}

// ── Diagnostic verdicts ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousElement {
    #[serde(rename = "text", alias = "problem_span", default)]
    pub problem_span: String,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "required_clarification", alias = "needed_clarification", default)]
    pub needed_clarification: String,
}

/// Ambiguity Detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityVerdict {
    pub ambiguous: bool,
    #[serde(default)]
    pub ambiguous_elements: Vec<AmbiguousElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingElement {
    #[serde(rename = "requirement", alias = "missing_requirement", default)]
    pub missing_requirement: String,
    #[serde(default)]
    pub importance: String,
    #[serde(default)]
    pub recommendation: String,
}

/// Gap Detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapVerdict {
    pub has_gaps: bool,
    #[serde(default)]
    pub missing_elements: Vec<MissingElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictingElement {
    #[serde(rename = "bank_element", alias = "element", default)]
    pub element: String,
    /// Violation of the accounting standard (FAS).
    #[serde(rename = "fas_conflict", alias = "standard_a_violation", default)]
    pub standard_a_violation: String,
    /// Violation of the Shariah standard (SS).
    #[serde(rename = "ss_conflict", alias = "standard_b_violation", default)]
    pub standard_b_violation: String,
}

/// Conflict Detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictVerdict {
    pub conflict: bool,
    #[serde(default)]
    pub conflicting_elements: Vec<ConflictingElement>,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub references: Vec<String>,
}

fn default_risk_severity() -> String {
    "Medium".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    #[serde(rename = "risk_name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "risk_type", alias = "category", default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "shariah_implication", alias = "implication", default)]
    pub implication: String,
    #[serde(rename = "mitigation_strategy", alias = "mitigation", default)]
    pub mitigation: String,
    /// `High`, `Medium` or `Low`; defaults to `Medium` when omitted.
    #[serde(default = "default_risk_severity")]
    pub severity: String,
    #[serde(
        rename = "fas_reference",
        alias = "reference",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,
}

/// Risk Assessor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub risks: Vec<RiskItem>,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "fas_compliance_status", alias = "compliance_status", default)]
    pub compliance_status: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A verdict from one of the four diagnostic capabilities.
///
/// Serializes as the bare verdict object so report buckets carry the same
/// shape the agents emit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiagnosticVerdict {
    Ambiguity(AmbiguityVerdict),
    Gap(GapVerdict),
    Conflict(ConflictVerdict),
    Risk(RiskVerdict),
}

impl DiagnosticVerdict {
    /// The capability that produced this verdict.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Ambiguity(_) => Capability::Ambiguity,
            Self::Gap(_) => Capability::Gap,
            Self::Conflict(_) => Capability::Conflict,
            Self::Risk(_) => Capability::Risk,
        }
    }
}

/// Revision Drafter output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionProposal {
    #[serde(rename = "proposed_update", alias = "proposed_text", default)]
    pub proposed_text: String,
    #[serde(default)]
    pub rationale: String,
}

impl RevisionProposal {
    /// True for the "no compliant alternative" outcome: an empty proposal
    /// whose rationale explains why nothing can be derived.
    pub fn is_no_alternative(&self) -> bool {
        self.proposed_text.trim().is_empty()
    }
}
