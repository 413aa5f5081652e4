//! The advisor: one explicitly constructed context holding every pipeline.
//!
//! Built once at process start and shared behind an `Arc` by request
//! handlers. [`Advisor::shutdown`] marks the end of its lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mizan_ai::{
    AnswerAggregator, ComplianceClassifier, ExcerptSummarizer, InferenceService, Planner,
    RevisionDrafter, SectionIdentifier, diagnostic_agents,
};
use mizan_core::{Field, RegulationDocument, RevisionProposal};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::dispatcher::Propagator;
use crate::error::EngineError;
use crate::qa::{QueryAnswer, QueryPipeline};
use crate::retrieval::Retriever;
use crate::review::{ReviewOutcome, review_document};
use crate::revision::{DraftingOutcome, RevisionPipeline, draft_document};
use crate::scanner::Scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Available,
    Unavailable,
}

impl ServiceState {
    fn from_ok(ok: bool) -> Self {
        if ok { Self::Available } else { Self::Unavailable }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub review: ServiceState,
    pub drafting: ServiceState,
    pub qa_transform: ServiceState,
    pub retrieval: ServiceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub services: ServiceHealth,
    pub checked_at: DateTime<Utc>,
}

pub struct Advisor {
    config: EngineConfig,
    inference: Arc<dyn InferenceService>,
    scanner: Scanner,
    propagator: Propagator,
    revision: RevisionPipeline,
    query: QueryPipeline,
    retriever: Option<Arc<Retriever>>,
    reference: Option<RegulationDocument>,
}

impl Advisor {
    /// An advisor with no retrieval service and no reference document.
    pub fn new(config: EngineConfig, inference: Arc<dyn InferenceService>) -> Self {
        let models = &config.models;
        let scanner = Scanner::new(ComplianceClassifier::new(inference.clone(), models));
        let propagator = Propagator::new(
            diagnostic_agents(inference.clone(), models),
            config.pool_size(),
        );
        let revision = RevisionPipeline::new(RevisionDrafter::new(inference.clone(), models), None);
        let query = QueryPipeline::new(
            SectionIdentifier::new(inference.clone(), models),
            Planner::new(inference.clone(), models),
            AnswerAggregator::new(inference.clone(), models),
            diagnostic_agents(inference.clone(), models),
        );
        info!(
            pool = config.pool_size(),
            compliance_model = %models.compliance_model,
            "advisor constructed"
        );
        Self {
            config,
            inference,
            scanner,
            propagator,
            revision,
            query,
            retriever: None,
            reference: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        let retriever = Arc::new(match &self.config.retrieval_namespace {
            Some(ns) => retriever.with_namespace(ns.clone()),
            None => retriever,
        });
        let models = &self.config.models;
        let revision = RevisionPipeline::new(
            RevisionDrafter::new(self.inference.clone(), models),
            Some(retriever.clone()),
        );
        self.revision = if self.config.summarize_excerpts {
            revision.with_summarizer(ExcerptSummarizer::new(self.inference.clone(), models))
        } else {
            revision
        };
        self.retriever = Some(retriever);
        self
    }

    /// Document whose sections answer queries that carry none of their own.
    pub fn with_reference_document(mut self, document: RegulationDocument) -> Self {
        info!(sections = document.section_count(), "reference document loaded");
        self.reference = Some(document);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// Scan, fan out the flagged fields, and merge their verdicts.
    pub async fn review(&self, document: &RegulationDocument) -> ReviewOutcome {
        review_document(&self.scanner, &self.propagator, document).await
    }

    /// Classify every section and draft revisions for the non-compliant ones.
    pub async fn draft(&self, document: &RegulationDocument) -> DraftingOutcome {
        draft_document(&self.scanner, &self.revision, document).await
    }

    pub async fn answer(
        &self,
        query: &str,
        document: Option<&RegulationDocument>,
    ) -> Result<QueryAnswer, EngineError> {
        self.query
            .answer(query, document.or(self.reference.as_ref()))
            .await
    }

    pub async fn propose_revision(
        &self,
        field: &Field,
        justification: &str,
    ) -> Result<RevisionProposal, EngineError> {
        Ok(self.revision.propose_revision(field, justification).await?)
    }

    pub async fn health(&self) -> HealthReport {
        let inference_ok = match self.inference.health().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "inference service unreachable");
                false
            }
        };
        let retrieval_ok = match &self.retriever {
            Some(r) => match r.health().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = e.label(), message = %e, "retrieval service unreachable");
                    false
                }
            },
            None => false,
        };

        let available = ServiceState::from_ok(inference_ok);
        HealthReport {
            status: if inference_ok {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            services: ServiceHealth {
                review: available,
                drafting: available,
                qa_transform: available,
                retrieval: ServiceState::from_ok(retrieval_ok),
            },
            checked_at: Utc::now(),
        }
    }

    pub fn shutdown(&self) {
        info!("advisor shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_ai::mock::{Reply, ScriptedInference};
    use mizan_ai::prompts;
    use mizan_core::ComplianceStatus;
    use mizan_store::mock::StaticIndex;
    use serde_json::json;

    const PENALTY: &str =
        "In case of late payment, a fixed penalty of 2% per month is added to the outstanding debt.";
    const PRICING: &str = "The Murabaha sale price, cost, and profit margin are fixed and disclosed \
                           to the customer before signing, and do not change for late payment.";

    fn compliance(status: &str) -> Reply {
        Reply::json(json!({
            "compliance_status": status,
            "justification": format!("{status}: see SS 8"),
            "referenced_clauses": ["SS 8"]
        }))
    }

    fn scripted() -> ScriptedInference {
        ScriptedInference::new()
            .when_user(prompts::COMPLIANCE, "fixed penalty", compliance("non_compliant"))
            .when(prompts::COMPLIANCE, compliance("compliant"))
            .when(prompts::AMBIGUITY, Reply::json(json!({"ambiguous": false})))
            .when(prompts::GAP, Reply::json(json!({"has_gaps": true})))
            .when(prompts::CONFLICT, Reply::json(json!({"conflict": true})))
            .when(prompts::RISK, Reply::json(json!({"risks": [{"risk_name": "Riba", "severity": "High"}]})))
            .when(
                prompts::REVISION,
                Reply::json(json!({
                    "proposed_update": "A late-paying customer undertakes to donate an agreed amount to charity.",
                    "rationale": "Penalties may not accrue to the institution."
                })),
            )
    }

    fn advisor(inference: ScriptedInference) -> (Arc<ScriptedInference>, Advisor) {
        let inference = Arc::new(inference);
        (inference.clone(), Advisor::new(EngineConfig::default(), inference))
    }

    fn document(text: &str) -> RegulationDocument {
        RegulationDocument::from_value(&json!({
            "External Regulation": [{"Liquidity Rules & Funding": text}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn penalty_clause_is_flagged_and_revised() {
        let (_, advisor) = advisor(scripted());
        let outcome = advisor.draft(&document(PENALTY)).await;
        let section = outcome.sections().next().unwrap();
        assert_eq!(section.compliance_status, Some(ComplianceStatus::NonCompliant));
        assert!(section.proposed_update.as_deref().is_some_and(|p| !p.is_empty()));
    }

    #[tokio::test]
    async fn compliant_pricing_terms_are_never_dispatched() {
        let (inference, advisor) = advisor(scripted());
        let outcome = advisor.review(&document(PRICING)).await;
        assert_eq!(outcome.fields_flagged, 0);
        assert_eq!(outcome.final_review_report.total(), 0);
        assert_eq!(inference.calls().len(), 1);
        assert_eq!(inference.calls_for(prompts::COMPLIANCE), 1);
    }

    #[tokio::test]
    async fn quote_repaired_verdict_is_used() {
        let (_, advisor) = advisor(
            ScriptedInference::new().when(
                prompts::COMPLIANCE,
                Reply::text(
                    "{'compliance_status': 'non_compliant', 'justification': 'penalty accrues to the bank', 'referenced_clauses': ['SS 3']}",
                ),
            ),
        );
        let outcome = advisor.draft(&document(PENALTY)).await;
        let section = outcome.sections().next().unwrap();
        assert_eq!(section.compliance_status, Some(ComplianceStatus::NonCompliant));
        assert_eq!(section.compliance_justification, "penalty accrues to the bank");
        assert_eq!(section.referenced_clauses, vec!["SS 3"]);
    }

    #[tokio::test]
    async fn review_merges_all_four_capabilities() {
        let (_, advisor) = advisor(scripted());
        let outcome = advisor.review(&document(PENALTY)).await;
        let review = &outcome.final_review_report;
        assert_eq!(review.ambiguity.len(), 1);
        assert_eq!(review.gap.len(), 1);
        assert_eq!(review.conflict.len(), 1);
        assert_eq!(review.risk.len(), 1);
        assert!(outcome.degraded.is_empty());
    }

    #[tokio::test]
    async fn queries_fall_back_to_reference_document() {
        let inference = ScriptedInference::new()
            .when(
                prompts::SECTION_IDENTIFIER,
                Reply::json(json!({"External Regulation": ["Liquidity Rules & Funding"]})),
            )
            .when(
                prompts::PLANNER,
                Reply::json(json!({
                    "steps": [{"agent": "GapDetectionAgent", "input_sections": ["Liquidity Rules & Funding"], "reason": "coverage"}],
                    "final_aggregation_strategy": "gaps only"
                })),
            )
            .when(prompts::GAP, Reply::json(json!({"has_gaps": true})))
            .when(prompts::AGGREGATOR, Reply::json(json!({"final_answer": "Gaps found."})));
        let (inference, advisor) = advisor(inference);
        let advisor = advisor.with_reference_document(document(PENALTY));
        let answer = advisor.answer("liquidity gaps?", None).await.unwrap();
        assert_eq!(answer.final_answer, "Gaps found.");
        assert_eq!(inference.calls_for(prompts::GAP), 1);
    }

    #[tokio::test]
    async fn health_reports_each_service() {
        let (_, advisor) = advisor(ScriptedInference::new());
        let report = advisor.health().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.services.review, ServiceState::Available);
        assert_eq!(report.services.retrieval, ServiceState::Unavailable);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"]["qa_transform"], "available");
    }

    #[tokio::test]
    async fn unreachable_inference_is_degraded() {
        let inference = Arc::new(ScriptedInference::new().unhealthy());
        let advisor = Advisor::new(EngineConfig::default(), inference.clone()).with_retriever(
            Retriever::new(inference, Arc::new(StaticIndex::new(&["x"])), 5),
        );
        let report = advisor.health().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.services.drafting, ServiceState::Unavailable);
        assert_eq!(report.services.retrieval, ServiceState::Available);
    }

    #[tokio::test]
    async fn drafting_uses_configured_retriever() {
        let inference = Arc::new(scripted());
        let index = Arc::new(StaticIndex::new(&["SS 3 clause 5/1"]));
        let advisor = Advisor::new(EngineConfig::default(), inference.clone())
            .with_retriever(Retriever::new(inference.clone(), index.clone(), 3));
        assert!(advisor.has_retriever());
        advisor.draft(&document(PENALTY)).await;
        assert_eq!(index.requests().len(), 1);
        assert_eq!(index.requests()[0].top_k, 3);
        assert_eq!(inference.calls_for(prompts::SUMMARIZER), 1);
    }

    #[tokio::test]
    async fn raw_excerpts_when_summaries_are_off() {
        let inference = Arc::new(scripted());
        let index = Arc::new(StaticIndex::new(&["SS 3 clause 5/1"]));
        let config = EngineConfig::default().with_summarized_excerpts(false);
        let advisor = Advisor::new(config, inference.clone())
            .with_retriever(Retriever::new(inference.clone(), index, 3));
        advisor.draft(&document(PENALTY)).await;
        assert_eq!(inference.calls_for(prompts::SUMMARIZER), 0);
        let revision_call = inference
            .calls()
            .into_iter()
            .find(|c| c.system == prompts::REVISION)
            .unwrap();
        let sent: serde_json::Value = serde_json::from_str(&revision_call.user).unwrap();
        assert_eq!(sent["ss_documents"], json!(["SS 3 clause 5/1"]));
    }
}
