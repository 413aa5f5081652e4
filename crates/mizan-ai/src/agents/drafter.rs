use std::sync::Arc;

use mizan_core::RevisionProposal;
use serde_json::json;

use super::{AgentError, ModelSettings, invoke};
use crate::inference::{GenerationParams, InferenceService};
use crate::prompts;

/// Drafts compliant replacement text for a non-compliant clause.
pub struct RevisionDrafter {
    inference: Arc<dyn InferenceService>,
    params: GenerationParams,
}

impl RevisionDrafter {
    pub fn new(inference: Arc<dyn InferenceService>, models: &ModelSettings) -> Self {
        Self {
            params: models.params(&models.drafting_model, true),
            inference,
        }
    }

    /// Propose a revision of `text`.
    ///
    /// An empty `proposed_text` with an explanatory rationale is a valid
    /// outcome (see [`RevisionProposal::is_no_alternative`]), not an error.
    pub async fn propose(
        &self,
        text: &str,
        issue_summary: &str,
        domain: &str,
        excerpts: &[String],
    ) -> Result<RevisionProposal, AgentError> {
        let input = json!({
            "non_compliant_text": text,
            "issue_summary": issue_summary,
            "context_type": domain,
            "ss_documents": excerpts,
        });
        invoke(
            self.inference.as_ref(),
            "revision",
            prompts::REVISION,
            format!("{input:#}"),
            &self.params,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Reply, ScriptedInference};

    #[tokio::test]
    async fn proposal_for_fixed_penalty() {
        let inference = Arc::new(ScriptedInference::new().when(
            prompts::REVISION,
            Reply::json(json!({
                "proposed_update": "A late-payment charity undertaking replaces the penalty; amounts go to charity and never to the bank.",
                "rationale": "SS 3: late payment penalties may not accrue to the institution."
            })),
        ));
        let drafter = RevisionDrafter::new(inference.clone(), &ModelSettings::default());
        let proposal = drafter
            .propose(
                "A fixed penalty of 2% increases the debt.",
                "Penalty accruing to the bank is riba.",
                "Liquidity Rules & Funding",
                &["SS 3 clause 2/1".to_string()],
            )
            .await
            .unwrap();
        assert!(!proposal.proposed_text.is_empty());
        assert!(!proposal.is_no_alternative());

        let user = &inference.calls()[0].user;
        let sent: serde_json::Value = serde_json::from_str(user).unwrap();
        assert_eq!(sent["context_type"], "Liquidity Rules & Funding");
        assert_eq!(sent["ss_documents"][0], "SS 3 clause 2/1");
    }

    #[tokio::test]
    async fn no_alternative_is_not_an_error() {
        let inference = ScriptedInference::new().when(
            prompts::REVISION,
            Reply::json(json!({
                "proposed_update": "",
                "rationale": "No compliant alternative possible because the excerpts do not cover it."
            })),
        );
        let drafter = RevisionDrafter::new(Arc::new(inference), &ModelSettings::default());
        let proposal = drafter.propose("x", "y", "Accounting Standards", &[]).await.unwrap();
        assert!(proposal.is_no_alternative());
        assert!(proposal.rationale.starts_with("No compliant alternative"));
    }
}
