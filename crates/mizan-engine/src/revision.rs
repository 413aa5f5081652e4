//! Revision drafting for non-compliant fields, and the drafting workflow.

use std::sync::Arc;

use mizan_ai::{AgentError, ExcerptSummarizer, RevisionDrafter};
use mizan_core::{ComplianceStatus, Field, RegulationDocument, RevisionProposal};
use mizan_store::MetadataFilter;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::retrieval::Retriever;
use crate::scanner::Scanner;

/// Retrieves supporting excerpts and drafts a compliant replacement.
pub struct RevisionPipeline {
    drafter: RevisionDrafter,
    retriever: Option<Arc<Retriever>>,
    summarizer: Option<ExcerptSummarizer>,
}

impl RevisionPipeline {
    pub fn new(drafter: RevisionDrafter, retriever: Option<Arc<Retriever>>) -> Self {
        Self {
            drafter,
            retriever,
            summarizer: None,
        }
    }

    /// Condense retrieved excerpts into one summary before drafting.
    pub fn with_summarizer(mut self, summarizer: ExcerptSummarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Reference context for `text`: the summary of the retrieved excerpts,
    /// or the raw excerpts when there is no summarizer or it fails.
    /// Retrieval problems degrade to none.
    pub async fn excerpts(&self, text: &str) -> Vec<String> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        let docs = match retriever.retrieve(text, &MetadataFilter::default()).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = e.label(), message = %e, "retrieval failed, drafting without excerpts");
                return Vec::new();
            }
        };
        let Some(summarizer) = self.summarizer.as_ref().filter(|_| !docs.is_empty()) else {
            return docs.into_iter().map(|d| d.text).collect();
        };

        let blocks: Vec<String> = docs
            .iter()
            .enumerate()
            .map(|(i, d)| d.excerpt_block(i + 1))
            .collect();
        match summarizer.summarize(&blocks).await {
            Ok(summary) if !summary.is_empty() => {
                debug!(excerpts = docs.len(), "excerpts summarized");
                vec![summary]
            }
            Ok(_) => docs.into_iter().map(|d| d.text).collect(),
            Err(e) => {
                warn!(error = e.label(), message = %e, "summary failed, drafting from raw excerpts");
                docs.into_iter().map(|d| d.text).collect()
            }
        }
    }

    /// Draft a revision of `field`. The section name is the domain label
    /// handed to the drafter (e.g. "Liquidity Rules & Funding").
    pub async fn propose_revision(
        &self,
        field: &Field,
        justification: &str,
    ) -> Result<RevisionProposal, AgentError> {
        let excerpts = self.excerpts(&field.text).await;
        let proposal = self
            .drafter
            .propose(&field.text, justification, &field.section, &excerpts)
            .await?;
        if proposal.is_no_alternative() {
            info!(location = %field.location, "no compliant alternative proposed");
        }
        Ok(proposal)
    }
}

// ── Drafting workflow ──

/// One section of the drafting response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftedSection {
    pub section: String,
    pub original_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_status: Option<ComplianceStatus>,
    pub compliance_justification: String,
    pub referenced_clauses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_rationale: Option<String>,
    /// Error taxonomy label and message when a stage failed for this section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DraftedSection {
    fn from_field(field: &Field) -> Self {
        Self {
            section: field.section.clone(),
            original_text: field.text.clone(),
            compliance_status: None,
            compliance_justification: String::new(),
            referenced_clauses: Vec::new(),
            proposed_update: None,
            update_rationale: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftedCategory {
    pub category: String,
    pub sections: Vec<DraftedSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftingOutcome {
    pub processed_regulations: Vec<DraftedCategory>,
}

impl DraftingOutcome {
    pub fn sections(&self) -> impl Iterator<Item = &DraftedSection> {
        self.processed_regulations.iter().flat_map(|c| c.sections.iter())
    }
}

/// Classify every field; draft revisions for `non_compliant` ones only.
///
/// Category and section order follow the document.
pub async fn draft_document(
    scanner: &Scanner,
    pipeline: &RevisionPipeline,
    document: &RegulationDocument,
) -> DraftingOutcome {
    let groups = document.decompose_grouped();
    info!(categories = groups.len(), sections = document.section_count(), "drafting workflow started");

    let mut outcome = DraftingOutcome::default();
    let mut revised = 0usize;
    for group in groups {
        let mut sections = Vec::with_capacity(group.fields.len());
        for field in &group.fields {
            let mut entry = DraftedSection::from_field(field);
            match scanner.classify(field).await {
                Ok(verdict) => {
                    entry.compliance_status = Some(verdict.compliance_status);
                    entry.compliance_justification = verdict.justification.clone();
                    entry.referenced_clauses = verdict.referenced_clauses.clone();

                    if verdict.compliance_status == ComplianceStatus::NonCompliant {
                        match pipeline.propose_revision(field, &verdict.justification).await {
                            Ok(proposal) => {
                                revised += 1;
                                entry.proposed_update = Some(proposal.proposed_text);
                                entry.update_rationale = Some(proposal.rationale);
                            }
                            Err(e) => {
                                warn!(location = %field.location, error = e.label(), "revision failed");
                                entry.error = Some(format!("{}: {e}", e.label()));
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(location = %field.location, error = e.label(), "classification failed");
                    entry.error = Some(format!("{}: {e}", e.label()));
                }
            }
            sections.push(entry);
        }
        outcome.processed_regulations.push(DraftedCategory {
            category: group.category,
            sections,
        });
    }

    info!(revised, "drafting workflow complete");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_ai::mock::{Reply, ScriptedInference};
    use mizan_ai::{ComplianceClassifier, ModelSettings, prompts};
    use mizan_store::mock::StaticIndex;
    use serde_json::json;

    fn compliance(s: &str) -> Reply {
        Reply::json(json!({"compliance_status": s, "justification": format!("{s} because"), "referenced_clauses": ["SS 3"]}))
    }

    fn revision() -> Reply {
        Reply::json(json!({
            "proposed_update": "Late payment amounts are donated to charity under the customer's undertaking.",
            "rationale": "SS 3 prohibits penalties accruing to the bank."
        }))
    }

    fn setup(
        inference: ScriptedInference,
        index: Option<StaticIndex>,
    ) -> (Arc<ScriptedInference>, Scanner, RevisionPipeline) {
        let inference = Arc::new(inference);
        let models = ModelSettings::default();
        let scanner = Scanner::new(ComplianceClassifier::new(inference.clone(), &models));
        let retriever = index.map(|i| Arc::new(Retriever::new(inference.clone(), Arc::new(i), 5)));
        let pipeline = RevisionPipeline::new(RevisionDrafter::new(inference.clone(), &models), retriever);
        (inference, scanner, pipeline)
    }

    fn summarizing(inference: ScriptedInference, index: StaticIndex) -> (Arc<ScriptedInference>, RevisionPipeline) {
        let inference = Arc::new(inference);
        let models = ModelSettings::default();
        let retriever = Arc::new(Retriever::new(inference.clone(), Arc::new(index), 5));
        let pipeline = RevisionPipeline::new(RevisionDrafter::new(inference.clone(), &models), Some(retriever))
            .with_summarizer(ExcerptSummarizer::new(inference.clone(), &models));
        (inference, pipeline)
    }

    fn document() -> RegulationDocument {
        RegulationDocument::from_value(&json!([{
            "External Regulation": [
                {"Liquidity Rules & Funding": "A fixed penalty of 2% per month increases the outstanding debt."},
                {"Accounting Standards": "Profit is recognised proportionally over the financing term."}
            ],
            "Internal Rulebook": [
                {"Financial Policies": "Returns are shared at management discretion."}
            ]
        }]))
        .unwrap()
    }

    fn scripted() -> ScriptedInference {
        ScriptedInference::new()
            .when_user(prompts::COMPLIANCE, "fixed penalty", compliance("non_compliant"))
            .when_user(prompts::COMPLIANCE, "recognised proportionally", compliance("compliant"))
            .when(prompts::COMPLIANCE, compliance("partially_compliant"))
            .when(prompts::REVISION, revision())
    }

    #[tokio::test]
    async fn only_non_compliant_fields_are_revised() {
        let (inference, scanner, pipeline) = setup(scripted(), Some(StaticIndex::new(&["SS 3 excerpt"])));
        let outcome = draft_document(&scanner, &pipeline, &document()).await;

        assert_eq!(outcome.processed_regulations.len(), 2);
        let sections: Vec<&DraftedSection> = outcome.sections().collect();
        assert_eq!(sections.len(), 3);

        assert_eq!(sections[0].section, "Liquidity Rules & Funding");
        assert_eq!(sections[0].compliance_status, Some(ComplianceStatus::NonCompliant));
        assert!(sections[0].proposed_update.as_deref().is_some_and(|p| !p.is_empty()));

        assert!(sections[1].proposed_update.is_none());
        // Partially compliant is a borderline case: no rewrite.
        assert_eq!(sections[2].compliance_status, Some(ComplianceStatus::PartiallyCompliant));
        assert!(sections[2].proposed_update.is_none());

        assert_eq!(inference.calls_for(prompts::REVISION), 1);
        let revision_call = inference
            .calls()
            .into_iter()
            .find(|c| c.system == prompts::REVISION)
            .unwrap();
        let sent: serde_json::Value = serde_json::from_str(&revision_call.user).unwrap();
        assert_eq!(sent["ss_documents"][0], "SS 3 excerpt");
        assert_eq!(sent["context_type"], "Liquidity Rules & Funding");
    }

    #[tokio::test]
    async fn retrieval_outage_degrades_to_empty_excerpts() {
        let (inference, scanner, pipeline) = setup(scripted(), Some(StaticIndex::offline()));
        let outcome = draft_document(&scanner, &pipeline, &document()).await;
        let first = outcome.sections().next().unwrap();
        assert!(first.proposed_update.is_some());
        assert!(first.error.is_none());

        let revision_call = inference
            .calls()
            .into_iter()
            .find(|c| c.system == prompts::REVISION)
            .unwrap();
        let sent: serde_json::Value = serde_json::from_str(&revision_call.user).unwrap();
        assert_eq!(sent["ss_documents"], json!([]));
    }

    #[tokio::test]
    async fn classification_failure_is_annotated() {
        let inference = ScriptedInference::new()
            .when_user(prompts::COMPLIANCE, "fixed penalty", Reply::text("not json"))
            .when(prompts::COMPLIANCE, compliance("compliant"));
        let (_, scanner, pipeline) = setup(inference, None);
        let outcome = draft_document(&scanner, &pipeline, &document()).await;
        let first = outcome.sections().next().unwrap();
        assert!(first.compliance_status.is_none());
        assert!(first.error.as_deref().is_some_and(|e| e.starts_with("VerdictParseError")));
        let json = serde_json::to_value(first).unwrap();
        assert!(json.get("proposed_update").is_none());
    }

    #[tokio::test]
    async fn propose_revision_passes_justification() {
        let (inference, _, pipeline) = setup(scripted(), None);
        let field = document().decompose().remove(0);
        let proposal = pipeline
            .propose_revision(&field, "penalty is riba")
            .await
            .unwrap();
        assert!(!proposal.is_no_alternative());
        let sent: serde_json::Value = serde_json::from_str(&inference.calls()[0].user).unwrap();
        assert_eq!(sent["issue_summary"], "penalty is riba");
    }

    #[tokio::test]
    async fn summary_replaces_raw_excerpts() {
        let (inference, pipeline) = summarizing(
            scripted().when(
                prompts::SUMMARIZER,
                Reply::json(json!({"summary": "SS 3: late payment amounts must go to charity."})),
            ),
            StaticIndex::new(&["SS 3 clause 2/1", "SS 3 clause 2/2"]),
        );
        let field = document().decompose().remove(0);
        pipeline.propose_revision(&field, "penalty is riba").await.unwrap();

        let summary_call = inference
            .calls()
            .into_iter()
            .find(|c| c.system == prompts::SUMMARIZER)
            .unwrap();
        assert!(summary_call.user.starts_with("Document 1 ("));
        assert!(summary_call.user.contains("SS 3 clause 2/2"));

        let revision_call = inference
            .calls()
            .into_iter()
            .find(|c| c.system == prompts::REVISION)
            .unwrap();
        let sent: serde_json::Value = serde_json::from_str(&revision_call.user).unwrap();
        assert_eq!(sent["ss_documents"], json!(["SS 3: late payment amounts must go to charity."]));
    }

    #[tokio::test]
    async fn failed_summary_falls_back_to_raw_excerpts() {
        let (inference, pipeline) = summarizing(
            scripted().when(prompts::SUMMARIZER, Reply::unavailable()),
            StaticIndex::new(&["SS 3 clause 2/1"]),
        );
        assert_eq!(pipeline.excerpts("fixed penalty").await, vec!["SS 3 clause 2/1"]);
        assert_eq!(inference.calls_for(prompts::SUMMARIZER), 1);
    }

    #[tokio::test]
    async fn no_excerpts_means_no_summary_call() {
        let (inference, pipeline) = summarizing(scripted(), StaticIndex::new(&[]));
        assert!(pipeline.excerpts("fixed penalty").await.is_empty());
        assert_eq!(inference.calls_for(prompts::SUMMARIZER), 0);
    }
}
