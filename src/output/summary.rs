use std::fmt::Write;

use crate::triage::{Diagnosis, EvidenceList, TriageReport};

use super::styling::{bright, bright_green, bright_red, bright_yellow, category, cyan, dim};

const PREVIEW_LINES: usize = 30;

pub const UNAVAILABLE_NOTICE: &str = "The inference API is currently unavailable. \
                                      Raw error logs have been provided above for manual review.";

/// Prints a human-readable triage report to stdout.
///
/// Sections:
/// - Overview: job, failure category, failing step, analysis time
/// - Evidence: the first lines of the evidence, headline highlighted
/// - Diagnosis: model analysis, the unavailable notice, or re-trigger advice
pub fn print_report(report: &TriageReport) {
    println!("{}", render_report(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_report(report: &TriageReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let step = if report.record.category_message.is_empty() {
        "unknown".to_string()
    } else {
        report.record.category_message.clone()
    };
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Job:"),
        cyan(&report.job),
        dim("Category:"),
        category(report.category),
        dim("Failing step:"),
        bright_yellow(step),
        dim("Analyzed at:"),
        dim(report.analyzed_at.format("%Y-%m-%d %H:%M UTC"))
    );

    add_section_header(&mut output, "🧾", "Evidence");
    render_evidence(&mut output, &report.record.evidence);

    if let Some(diagnosis) = &report.diagnosis {
        output.push('\n');
        render_diagnosis(&mut output, diagnosis);
    }

    output
}

fn render_evidence(output: &mut String, evidence: &EvidenceList) {
    if evidence.is_empty() {
        let _ = writeln!(output, "  {}", dim("No evidence collected."));
        return;
    }

    for (idx, line) in evidence.lines().iter().take(PREVIEW_LINES).enumerate() {
        if idx == 0 {
            let _ = writeln!(output, "  {}", bright(line));
        } else {
            let _ = writeln!(output, "  {}", dim(line));
        }
    }
    if evidence.len() > PREVIEW_LINES {
        let _ = writeln!(
            output,
            "  {}",
            dim(format!("... and {} more lines", evidence.len() - PREVIEW_LINES))
        );
    }
}

fn render_diagnosis(output: &mut String, diagnosis: &Diagnosis) {
    match diagnosis {
        Diagnosis::Analyzed(text) => {
            add_section_header(output, "⏩", "Implications to understand (AI generated)");
            let _ = writeln!(output, "{}", bright_green(text.trim()));
        }
        Diagnosis::Unavailable(reason) => {
            add_section_header(output, "⚠️", "Analysis Unavailable");
            let _ = writeln!(output, "  {}", bright_red(UNAVAILABLE_NOTICE));
            let _ = writeln!(output, "  {}", dim(reason));
        }
        Diagnosis::Skipped(advice) => {
            add_section_header(output, "🔁", "Re-trigger Suggested");
            let _ = writeln!(output, "  {}", bright_yellow(advice));
        }
    }
}
