//! Result rendering shared by the batch CLI and the interactive shell

use colored::Colorize;

use crate::errors::RagError;
use crate::rag::{PopulationReport, QueryOutcome};

const RULE_WIDTH: usize = 50;

/// Print a query outcome in human-readable form
pub fn print_outcome(outcome: &QueryOutcome, with_scores: bool) {
    let rule = "=".repeat(RULE_WIDTH);

    match &outcome.answer {
        None => {
            println!("{}", "No relevant documents found".yellow());
        }
        Some(answer) => {
            println!("{}", rule.cyan());
            println!("{}", "ANSWER:".bold().cyan());
            println!("{}", rule.cyan());
            println!("{}", answer.text);

            if !answer.sources.is_empty() {
                println!("\n{}", rule.cyan());
                println!("{}", "SOURCES:".bold().cyan());
                println!("{}", rule.cyan());
                for (i, source) in answer.sources.iter().enumerate() {
                    if with_scores {
                        println!(
                            "{}. {} (page {}, score {:.4})",
                            i + 1,
                            source.source_id,
                            source.page_index,
                            source.score
                        );
                    } else {
                        println!("{}. {} (page {})", i + 1, source.source_id, source.page_index);
                    }
                }
            }
            println!("\n{}", format!("model: {}", answer.model).dimmed());
        }
    }
}

/// Print a query outcome as JSON for machine consumption
pub fn print_outcome_json(outcome: &QueryOutcome) -> crate::errors::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

/// Print a query failure with its error kind; synthesis failures say
/// whether the retry budget was exhausted
pub fn print_query_error(err: &RagError) {
    match err {
        RagError::Synthesis {
            retries_exhausted: true,
            ..
        } => println!("{} {} {}", "Error:".red(), err, "(retries exhausted)".yellow()),
        _ => println!("{} {}", "Error:".red(), err),
    }
}

/// Print a population report: documents, chunks, failures with detail
pub fn print_population_report(report: &PopulationReport) {
    let summary = format!(
        "{} documents processed, {} chunks indexed, {} failures",
        report.documents_processed,
        report.chunks_indexed,
        report.failures.len()
    );
    if report.failures.is_empty() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
        for failure in &report.failures {
            println!("  {} {}: {}", "✗".red(), failure.source_id, failure.reason);
        }
    }
    println!("index now holds {} entries", report.index_count);
}
