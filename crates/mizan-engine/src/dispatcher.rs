//! Fan-out of problematic fields to the diagnostic agents, and fan-in of
//! their verdicts into per-field bundles.
//!
//! Every (field, agent) pair runs as its own task. A shared semaphore caps
//! the number of calls in flight. Each task resolves to a report or a
//! failure; one failing or panicking task never cancels its siblings.

use std::sync::Arc;

use futures::future::join_all;
use mizan_ai::{AgentError, DiagnosticAgent};
use mizan_core::{AgentFailure, AgentReport, DiagnosticVerdict, FieldBundle, FieldReportBundle};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::scanner::ProblematicField;

/// Why a dispatched task produced no verdict.
struct TaskFailure {
    label: String,
    message: String,
}

impl From<AgentError> for TaskFailure {
    fn from(e: AgentError) -> Self {
        Self {
            label: e.label().to_string(),
            message: e.to_string(),
        }
    }
}

impl From<JoinError> for TaskFailure {
    fn from(e: JoinError) -> Self {
        let label = if e.is_panic() { "TaskPanicked" } else { "TaskCancelled" };
        Self {
            label: label.to_string(),
            message: e.to_string(),
        }
    }
}

pub struct Propagator {
    agents: Vec<Arc<dyn DiagnosticAgent>>,
    pool: Arc<Semaphore>,
}

impl Propagator {
    /// `max_in_flight` bounds concurrent agent calls across all fields.
    pub fn new(agents: Vec<Arc<dyn DiagnosticAgent>>, max_in_flight: usize) -> Self {
        Self {
            agents,
            pool: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Run every agent on every field.
    ///
    /// The bundle lists fields in input order; within a field, reports
    /// follow agent order. Fields are dispatched concurrently.
    pub async fn propagate(&self, fields: &[ProblematicField]) -> FieldReportBundle {
        info!(fields = fields.len(), agents = self.agents.len(), "dispatching diagnostics");
        let bundles = join_all(fields.iter().map(|f| self.dispatch_field(f))).await;
        let bundle: FieldReportBundle = bundles.into_iter().collect();
        info!(
            fields = bundle.len(),
            reports = bundle.report_count(),
            failures = bundle.failures().len(),
            "diagnostics complete"
        );
        bundle
    }

    /// Fan out one field to all agents and wait for every task to resolve.
    async fn dispatch_field(&self, field: &ProblematicField) -> FieldBundle {
        let tasks = self.agents.iter().map(|agent| {
            let capability = agent.capability();
            let agent = Arc::clone(agent);
            let pool = Arc::clone(&self.pool);
            let text = field.field.text.clone();
            let context = field.verdict.justification.clone();
            let handle = tokio::spawn(async move {
                // Held for the duration of the call, released on every exit path.
                let _permit = pool.acquire_owned().await.map_err(|e| TaskFailure {
                    label: "WorkerPoolClosed".to_string(),
                    message: e.to_string(),
                })?;
                agent
                    .evaluate(&text, &context)
                    .await
                    .map_err(TaskFailure::from)
            });
            async move {
                let outcome: Result<DiagnosticVerdict, TaskFailure> = match handle.await {
                    Ok(result) => result,
                    Err(join_err) => Err(join_err.into()),
                };
                (capability, outcome)
            }
        });

        let mut bundle = FieldBundle::new(field.location());
        for (capability, outcome) in join_all(tasks).await {
            match outcome {
                Ok(verdict) => {
                    debug!(location = %field.location(), %capability, "diagnostic complete");
                    bundle
                        .reports
                        .push(AgentReport::new(field.location(), verdict));
                }
                Err(failure) => {
                    warn!(
                        location = %field.location(),
                        %capability,
                        error = %failure.label,
                        message = %failure.message,
                        "diagnostic failed"
                    );
                    bundle.failures.push(AgentFailure {
                        agent_name: capability.agent_name().to_string(),
                        field_location: field.location().to_string(),
                        capability,
                        error: failure.label,
                        message: failure.message,
                    });
                }
            }
        }
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_ai::mock::{Reply, ScriptedInference};
    use mizan_ai::{ModelSettings, diagnostic_agents, prompts};
    use mizan_core::{Capability, ComplianceStatus, ComplianceVerdict, Field, merge};
    use serde_json::json;
    use std::time::Duration;

    fn problematic(location: &str, text: &str) -> ProblematicField {
        ProblematicField {
            field: Field {
                location: location.to_string(),
                category: "External Regulation".into(),
                section: location.to_string(),
                text: text.to_string(),
            },
            verdict: ComplianceVerdict {
                compliance_status: ComplianceStatus::NonCompliant,
                justification: "penalty accrues to the bank".into(),
                referenced_clauses: vec![],
            },
        }
    }

    fn scripted() -> ScriptedInference {
        ScriptedInference::new()
            .when(prompts::AMBIGUITY, Reply::json(json!({"ambiguous": true, "ambiguous_elements": []})))
            .when(prompts::GAP, Reply::json(json!({"has_gaps": false, "missing_elements": []})))
            .when(prompts::CONFLICT, Reply::json(json!({"conflict": true, "conflicting_elements": [], "justification": "riba", "references": []})))
            .when(prompts::RISK, Reply::json(json!({"risks": [{"risk_name": "Riba", "severity": "High"}], "summary": "", "fas_compliance_status": "Non-Compliant", "recommendations": []})))
    }

    fn propagator(inference: ScriptedInference, pool: usize) -> (Arc<ScriptedInference>, Propagator) {
        let inference = Arc::new(inference);
        let agents = diagnostic_agents(inference.clone(), &ModelSettings::default());
        (inference, Propagator::new(agents, pool))
    }

    #[tokio::test]
    async fn four_reports_per_field() {
        let (inference, p) = propagator(scripted(), 4);
        let fields = vec![problematic("A > x", "rule x"), problematic("A > y", "rule y")];
        let bundle = p.propagate(&fields).await;

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.report_count(), 8);
        let x = bundle.get("A > x").unwrap();
        assert!(!x.is_degraded());
        let names: Vec<&str> = x.reports.iter().map(|r| r.agent_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Ambiguity Detection Agent",
                "Gap Detection Agent",
                "Conflict Detection Agent",
                "Risk Analysis Agent"
            ]
        );
        assert_eq!(x.reports[0].severity, mizan_core::Severity::High);
        assert_eq!(x.reports[1].severity, mizan_core::Severity::Low);
        assert_eq!(x.reports[3].severity, mizan_core::Severity::High);
        assert_eq!(inference.calls().len(), 8);
    }

    #[tokio::test]
    async fn justification_is_the_context() {
        let (inference, p) = propagator(scripted(), 4);
        p.propagate(&[problematic("A > x", "rule x")]).await;
        for call in inference.calls() {
            assert!(call.user.contains("rule x"));
            assert!(call.user.contains("penalty accrues to the bank"));
        }
    }

    #[tokio::test]
    async fn one_failing_agent_degrades_only_its_slot() {
        let inference = ScriptedInference::new()
            .when(prompts::RISK, Reply::unavailable())
            .when(prompts::AMBIGUITY, Reply::json(json!({"ambiguous": false})))
            .when(prompts::GAP, Reply::json(json!({"has_gaps": true})))
            .when(prompts::CONFLICT, Reply::json(json!({"conflict": false})));
        let (_, p) = propagator(inference, 4);
        let bundle = p.propagate(&[problematic("A > x", "rule x")]).await;

        let x = bundle.get("A > x").unwrap();
        assert!(x.is_degraded());
        assert_eq!(x.reports.len(), 3);
        assert_eq!(x.failures.len(), 1);
        assert_eq!(x.failures[0].capability, Capability::Risk);
        assert_eq!(x.failures[0].error, "InferenceUnavailableError");

        let review = merge(&bundle);
        assert_eq!(review.total(), 3);
        assert_eq!(review.ambiguity.len(), 1);
        assert_eq!(review.gap.len(), 1);
        assert_eq!(review.conflict.len(), 1);
        assert!(review.risk.is_empty());
    }

    #[tokio::test]
    async fn panicking_agent_is_recorded_not_propagated() {
        let inference = scripted_with_panic();
        let (_, p) = propagator(inference, 2);
        let bundle = p.propagate(&[problematic("A > x", "rule x")]).await;
        let x = bundle.get("A > x").unwrap();
        assert_eq!(x.reports.len(), 3);
        assert_eq!(x.failures[0].error, "TaskPanicked");
        assert_eq!(x.failures[0].capability, Capability::Gap);
    }

    fn scripted_with_panic() -> ScriptedInference {
        ScriptedInference::new()
            .when(prompts::GAP, Reply::Panic)
            .when(prompts::AMBIGUITY, Reply::json(json!({"ambiguous": false})))
            .when(prompts::CONFLICT, Reply::json(json!({"conflict": false})))
            .when(prompts::RISK, Reply::json(json!({"risks": []})))
    }

    #[tokio::test]
    async fn pool_bounds_calls_in_flight() {
        let delay = Duration::from_millis(20);
        let inference = ScriptedInference::new()
            .when(prompts::AMBIGUITY, Reply::json(json!({"ambiguous": false})).delayed(delay))
            .when(prompts::GAP, Reply::json(json!({"has_gaps": false})).delayed(delay))
            .when(prompts::CONFLICT, Reply::json(json!({"conflict": false})).delayed(delay))
            .when(prompts::RISK, Reply::json(json!({"risks": []})).delayed(delay));
        let (inference, p) = propagator(inference, 2);
        let fields: Vec<_> = (0..3)
            .map(|i| problematic(&format!("A > {i}"), "rule"))
            .collect();
        let bundle = p.propagate(&fields).await;

        assert_eq!(bundle.report_count(), 12);
        assert!(inference.max_in_flight() <= 2);
        assert!(inference.max_in_flight() >= 1);
    }

    #[tokio::test]
    async fn no_fields_no_calls() {
        let (inference, p) = propagator(scripted(), 4);
        let bundle = p.propagate(&[]).await;
        assert!(bundle.is_empty());
        assert!(inference.calls().is_empty());
        assert_eq!(merge(&bundle).total(), 0);
    }
}
