//! Terminal cards for review, drafting, and query results.

use mizan_core::{DiagnosticVerdict, Field};
use mizan_engine::{DraftingOutcome, HealthReport, QueryAnswer, ReviewOutcome};

const MAX_TEXT: usize = 96;

// ── Public API ──

pub fn print_fields(fields: &[Field]) {
    println!("=== {} fields ===", fields.len());
    println!();
    for field in fields {
        println!("  {:<48} {}", field.location, clip(&field.text));
    }
}

pub fn print_review(outcome: &ReviewOutcome) {
    println!("=== Review ===");
    println!("  {:<26} {}", "fields scanned", outcome.fields_scanned);
    println!("  {:<26} {}", "fields flagged", outcome.fields_flagged);
    println!();

    let review = &outcome.final_review_report;
    print_bucket("Ambiguity", &review.ambiguity);
    print_bucket("Gap", &review.gap);
    print_bucket("Conflict", &review.conflict);
    print_bucket("Risk", &review.risk);

    if !outcome.degraded.is_empty() {
        println!("Degraded");
        for f in &outcome.degraded {
            println!("  {:<26} {} ({})", f.field_location, f.agent_name, f.error);
        }
        println!();
    }
    if !outcome.scan_failures.is_empty() {
        println!("Not classified");
        for f in &outcome.scan_failures {
            println!("  {:<26} {}", f.location, f.error);
        }
    }
}

pub fn print_drafting(outcome: &DraftingOutcome) {
    for category in &outcome.processed_regulations {
        println!("=== {} ===", category.category);
        println!();
        for s in &category.sections {
            println!("{}", s.section);
            let status = s
                .compliance_status
                .map(|c| c.as_str())
                .unwrap_or("unclassified");
            println!("  {:<26} {}", "status", status);
            if !s.compliance_justification.is_empty() {
                println!("  {:<26} {}", "justification", clip(&s.compliance_justification));
            }
            if !s.referenced_clauses.is_empty() {
                println!("  {:<26} {}", "references", s.referenced_clauses.join(", "));
            }
            if let Some(update) = &s.proposed_update {
                println!("  {:<26} {}", "proposed update", update);
            }
            if let Some(rationale) = &s.update_rationale {
                println!("  {:<26} {}", "rationale", clip(rationale));
            }
            if let Some(error) = &s.error {
                println!("  {:<26} {}", "error", error);
            }
            println!();
        }
    }
}

pub fn print_answer(answer: &QueryAnswer) {
    let process = &answer.analysis_process;
    println!("=== {} ===", answer.query);
    println!();
    println!("Relevant sections");
    for name in process.relevant_sections.qualified_names() {
        println!("  {name}");
    }
    println!();
    println!("Plan");
    for step in &process.execution_plan.steps {
        println!(
            "  {:<26} {} ({})",
            step.agent,
            step.input_sections.join(", "),
            step.reason
        );
    }
    println!();
    println!("{}", answer.final_answer);
}

pub fn print_health(report: &HealthReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

// ── Rendering ──

fn print_bucket(header: &str, verdicts: &[DiagnosticVerdict]) {
    if verdicts.is_empty() {
        return;
    }
    println!("{header} ({})", verdicts.len());
    for v in verdicts {
        println!("  {}", verdict_line(v));
    }
    println!();
}

/// One-line summary of a verdict.
fn verdict_line(verdict: &DiagnosticVerdict) -> String {
    match verdict {
        DiagnosticVerdict::Ambiguity(v) => match v.ambiguous_elements.first() {
            Some(e) if v.ambiguous => format!("ambiguous: {}", clip(&e.problem_span)),
            _ => flag("ambiguous", v.ambiguous),
        },
        DiagnosticVerdict::Gap(v) => match v.missing_elements.first() {
            Some(e) if v.has_gaps => format!("missing: {}", clip(&e.missing_requirement)),
            _ => flag("gaps", v.has_gaps),
        },
        DiagnosticVerdict::Conflict(v) if v.conflict && !v.justification.is_empty() => {
            format!("conflict: {}", clip(&v.justification))
        }
        DiagnosticVerdict::Conflict(v) => flag("conflict", v.conflict),
        DiagnosticVerdict::Risk(v) => {
            if v.risks.is_empty() {
                "no risks".to_string()
            } else {
                v.risks
                    .iter()
                    .map(|r| format!("{} [{}]", r.name, r.severity))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
    }
}

fn flag(what: &str, on: bool) -> String {
    format!("{what}: {}", if on { "yes" } else { "no" })
}

/// First line of `text`, cut at `MAX_TEXT` characters.
fn clip(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= MAX_TEXT {
        line.to_string()
    } else {
        let cut: String = line.chars().take(MAX_TEXT - 1).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mizan_core::{AmbiguityVerdict, GapVerdict, RiskVerdict};

    #[test]
    fn clip_keeps_short_text() {
        assert_eq!(clip("  Profit is fixed.  "), "Profit is fixed.");
        assert_eq!(clip("first\nsecond"), "first");
    }

    #[test]
    fn clip_cuts_on_char_boundaries() {
        let long = "ب".repeat(200);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_TEXT);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn verdict_lines() {
        let amb = DiagnosticVerdict::Ambiguity(AmbiguityVerdict {
            ambiguous: false,
            ambiguous_elements: vec![],
        });
        assert_eq!(verdict_line(&amb), "ambiguous: no");

        let gap = DiagnosticVerdict::Gap(GapVerdict {
            has_gaps: true,
            missing_elements: vec![],
        });
        assert_eq!(verdict_line(&gap), "gaps: yes");

        let risk = DiagnosticVerdict::Risk(RiskVerdict {
            risks: vec![],
            summary: String::new(),
            compliance_status: String::new(),
            recommendations: vec![],
        });
        assert_eq!(verdict_line(&risk), "no risks");
    }
}
