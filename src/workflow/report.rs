//! Rendering grading results

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::logging::format_message;

use super::context::{GradingContext, GradingStats, SubmissionOutcome, SubmissionResult};

#[derive(Serialize)]
struct JsonReport<'a> {
    ca_threshold: f64,
    stats: &'a GradingStats,
    submissions: &'a [SubmissionResult],
}

/// Renders the batch as pretty-printed JSON
pub fn render_json(context: &GradingContext) -> Result<String> {
    let report = JsonReport {
        ca_threshold: context.config.ca_threshold,
        stats: &context.stats,
        submissions: &context.results,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Renders the batch as a text table, coloured when stdout is a terminal
pub fn render_text(context: &GradingContext) -> String {
    let mut lines = Vec::new();

    for result in &context.results {
        let who = if result.submission.student_name.is_empty() {
            result.submission.student_id.clone()
        } else {
            format!(
                "{} {}",
                result.submission.student_id, result.submission.student_name
            )
        };

        match &result.outcome {
            SubmissionOutcome::Graded(report) => {
                let score = format!("{}/{}", report.passed, report.total);
                let colored_score = if report.passed == report.total {
                    score.green().bold().to_string()
                } else {
                    score.yellow().bold().to_string()
                };
                lines.push(format!(
                    "{who}: {}",
                    format_message(&score, &colored_score)
                ));

                for outcome in &report.outcomes {
                    let mark = if outcome.passed { "O" } else { "X" };
                    let colored_mark = if outcome.passed {
                        mark.green().to_string()
                    } else {
                        mark.red().to_string()
                    };
                    lines.push(format!(
                        "  [{}] {} {}",
                        format_message(mark, &colored_mark),
                        outcome.id,
                        outcome.title
                    ));
                }

                if let Some(source) = &report.data_source {
                    lines.push(format!("  data: {} ({})", source.source, source.summary));
                }
            }
            SubmissionOutcome::Ungradable { reason } => {
                let message = format!("{who}: ungradable ({reason})");
                let colored_message = format!("{who}: {}", format!("ungradable ({reason})").red());
                lines.push(format_message(&message, &colored_message));
            }
        }
    }

    lines.push(format!(
        "{} found, {} graded, {} ungradable",
        context.stats.submissions_found,
        context.stats.submissions_graded,
        context.stats.submissions_ungradable
    ));

    lines.join("\n")
}
