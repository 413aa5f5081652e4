//! Query answering: identify sections, plan, execute steps, aggregate.
//!
//! Stages run strictly in sequence. Plan steps run in plan order and each
//! step's sections in listed order, since the planner's ordering carries
//! meaning ("check conflicts before gaps").

use std::sync::Arc;

use mizan_ai::{AnswerAggregator, DiagnosticAgent, Planner, SectionIdentifier};
use mizan_core::{
    Capability, ExecutionPlan, PlanStep, RegulationDocument, RelevantSections, SectionVocabulary,
    StepOutput,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisProcess {
    pub relevant_sections: RelevantSections,
    pub execution_plan: ExecutionPlan,
    pub agent_outputs: Vec<StepOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub query: String,
    pub analysis_process: AnalysisProcess,
    pub final_answer: String,
}

pub struct QueryPipeline {
    identifier: SectionIdentifier,
    planner: Planner,
    aggregator: AnswerAggregator,
    agents: Vec<Arc<dyn DiagnosticAgent>>,
}

impl QueryPipeline {
    pub fn new(
        identifier: SectionIdentifier,
        planner: Planner,
        aggregator: AnswerAggregator,
        agents: Vec<Arc<dyn DiagnosticAgent>>,
    ) -> Self {
        Self {
            identifier,
            planner,
            aggregator,
            agents,
        }
    }

    /// Answer `query` against `document`, or against the built-in section
    /// vocabulary when there is none. Without a document no section has
    /// text, so steps record notes instead of calling agents.
    pub async fn answer(
        &self,
        query: &str,
        document: Option<&RegulationDocument>,
    ) -> Result<QueryAnswer, EngineError> {
        let vocabulary = match document {
            Some(doc) => doc.vocabulary(),
            None => SectionVocabulary::builtin(),
        };
        info!(sections = vocabulary.iter().map(|(_, s)| s.len()).sum::<usize>(), "query workflow started");

        let relevant = self.identifier.identify(query, &vocabulary).await?;
        validate_sections(&relevant, &vocabulary)?;
        debug!(sections = ?relevant.qualified_names(), "relevant sections identified");

        let plan = self.planner.plan(query, &relevant).await?;
        let bound = self.bind(&plan, &vocabulary)?;
        debug!(steps = plan.steps.len(), "plan validated");

        let mut outputs = Vec::with_capacity(bound.len());
        for (i, (step, agent)) in bound.into_iter().enumerate() {
            outputs.push(run_step(i + 1, step, agent.as_ref(), document).await);
        }

        let final_answer = self
            .aggregator
            .aggregate(query, &plan.final_aggregation_strategy, &outputs)
            .await?;
        info!(steps = outputs.len(), "query workflow complete");

        Ok(QueryAnswer {
            query: query.to_string(),
            analysis_process: AnalysisProcess {
                relevant_sections: relevant,
                execution_plan: plan,
                agent_outputs: outputs,
            },
            final_answer,
        })
    }

    /// Resolve every step to a diagnostic agent and check its sections.
    fn bind<'p>(
        &self,
        plan: &'p ExecutionPlan,
        vocabulary: &SectionVocabulary,
    ) -> Result<Vec<(&'p PlanStep, Arc<dyn DiagnosticAgent>)>, EngineError> {
        plan.steps
            .iter()
            .enumerate()
            .map(|(i, step)| -> Result<_, EngineError> {
                let capability = Capability::from_plan_name(&step.agent).ok_or_else(|| {
                    EngineError::plan(format!("step {}: unknown agent '{}'", i + 1, step.agent))
                })?;
                if let Some(section) = step.input_sections.iter().find(|s| !vocabulary.contains(s)) {
                    return Err(EngineError::plan(format!(
                        "step {}: section '{section}' is not a known section",
                        i + 1
                    )));
                }
                if let Some((j, section)) = step
                    .input_sections
                    .iter()
                    .enumerate()
                    .find(|&(j, s)| step.input_sections[..j].contains(s))
                {
                    return Err(EngineError::plan(format!(
                        "step {}: section '{section}' is listed twice (position {})",
                        i + 1,
                        j + 1
                    )));
                }
                let agent = self
                    .agents
                    .iter()
                    .find(|a| a.capability() == capability)
                    .cloned()
                    .ok_or_else(|| {
                        EngineError::plan(format!("step {}: no {capability} agent available", i + 1))
                    })?;
                Ok((step, agent))
            })
            .collect()
    }
}

fn validate_sections(
    relevant: &RelevantSections,
    vocabulary: &SectionVocabulary,
) -> Result<(), EngineError> {
    for (category, sections) in relevant.iter() {
        if let Some(section) = sections.iter().find(|s| !vocabulary.contains_in(category, s)) {
            return Err(EngineError::plan(format!(
                "section '{category} > {section}' is not a known section"
            )));
        }
    }
    Ok(())
}

async fn run_step(
    number: usize,
    step: &PlanStep,
    agent: &dyn DiagnosticAgent,
    document: Option<&RegulationDocument>,
) -> StepOutput {
    let mut output = Map::new();
    for section in &step.input_sections {
        let Some(text) = document.and_then(|d| d.section_text(section)) else {
            output.insert(
                section.clone(),
                json!({"note": "no text available for this section"}),
            );
            continue;
        };
        let value = match agent.evaluate(text, &step.reason).await {
            Ok(verdict) => serde_json::to_value(&verdict).unwrap_or_default(),
            Err(e) => {
                warn!(step = number, section = %section, error = e.label(), "plan step failed");
                json!({"error": e.label(), "message": e.to_string()})
            }
        };
        output.insert(section.clone(), value);
    }
    StepOutput {
        step: number,
        agent: step.agent.clone(),
        input_sections: step.input_sections.clone(),
        output: Value::Object(output),
    }
}
