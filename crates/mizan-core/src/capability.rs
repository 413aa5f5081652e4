use std::fmt;

use serde::{Deserialize, Serialize};

/// An analysis capability backed by the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Compliance,
    Ambiguity,
    Gap,
    Conflict,
    Risk,
    Revision,
}

/// The four diagnostic capabilities fanned out per problematic field.
pub const DIAGNOSTICS: [Capability; 4] = [
    Capability::Ambiguity,
    Capability::Gap,
    Capability::Conflict,
    Capability::Risk,
];

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliance => "compliance",
            Self::Ambiguity => "ambiguity",
            Self::Gap => "gap",
            Self::Conflict => "conflict",
            Self::Risk => "risk",
            Self::Revision => "revision",
        }
    }

    /// Display name used in agent reports.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Compliance => "Shariah Compliance Agent",
            Self::Ambiguity => "Ambiguity Detection Agent",
            Self::Gap => "Gap Detection Agent",
            Self::Conflict => "Conflict Detection Agent",
            Self::Risk => "Risk Analysis Agent",
            Self::Revision => "Update Advisor Agent",
        }
    }

    /// Report bucket for diagnostic capabilities.
    pub fn category(&self) -> Option<&'static str> {
        match self {
            Self::Ambiguity => Some("Ambiguity"),
            Self::Gap => Some("Gap"),
            Self::Conflict => Some("Conflict"),
            Self::Risk => Some("Risk"),
            Self::Compliance | Self::Revision => None,
        }
    }

    /// Agent name the query planner may use for this capability.
    pub fn plan_name(&self) -> Option<&'static str> {
        match self {
            Self::Ambiguity => Some("AmbiguityDetectionAgent"),
            Self::Gap => Some("GapDetectionAgent"),
            Self::Conflict => Some("ConflictDetectionAgent"),
            Self::Risk => Some("RiskDetectionAgent"),
            Self::Compliance | Self::Revision => None,
        }
    }

    /// Resolve a planner agent name. Only the four diagnostic names (and the
    /// two risk aliases) are accepted; matching ignores ASCII case.
    pub fn from_plan_name(name: &str) -> Option<Self> {
        let name = name.trim();
        DIAGNOSTICS
            .into_iter()
            .find(|c| c.plan_name().is_some_and(|p| p.eq_ignore_ascii_case(name)))
            .or_else(|| {
                ["RiskAssessmentAgent", "RiskAnalysisAgent"]
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(name))
                    .then_some(Self::Risk)
            })
    }

    pub fn is_diagnostic(&self) -> bool {
        self.category().is_some()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
