use std::collections::HashMap;
use std::fmt::Write;

use comfy_table::Cell;
use serde::Serialize;

use super::styling::{bright, bright_yellow, dim};
use super::tables::{category_cell, color_coded_share_cell, create_table, cyan_header};
use crate::triage::CategoryTag;

pub const NO_JOBS_MESSAGE: &str = "No job messages found in the selected period.";

/// Failure counts per category over a set of job runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FailureBreakdown {
    pub total_jobs: usize,
    pub total_failures: usize,
    pub counts: HashMap<CategoryTag, usize>,
}

impl FailureBreakdown {
    pub fn record(&mut self, tag: CategoryTag) {
        *self.counts.entry(tag).or_insert(0) += 1;
        self.total_failures += 1;
    }

    /// Categories by count descending, ties by label.
    pub fn sorted(&self) -> Vec<(CategoryTag, usize)> {
        sorted_counts(&self.counts)
    }
}

fn sorted_counts(counts: &HashMap<CategoryTag, usize>) -> Vec<(CategoryTag, usize)> {
    let mut entries: Vec<(CategoryTag, usize)> =
        counts.iter().map(|(tag, count)| (*tag, *count)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));
    entries
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Chat-friendly markdown summary of failure types.
pub fn render_failure_breakdown(
    counts: &HashMap<CategoryTag, usize>,
    total_jobs: usize,
    total_failures: usize,
) -> String {
    if total_jobs == 0 {
        return NO_JOBS_MESSAGE.to_string();
    }

    let mut lines = vec![
        format!("• **Total Jobs:** {total_jobs}"),
        format!(
            "• **Failures:** {total_failures} _({:.0}% failure rate)_",
            percentage(total_failures, total_jobs)
        ),
        String::new(),
        ":construction: **Breakdown by type:**".to_string(),
    ];
    for (tag, count) in sorted_counts(counts) {
        lines.push(format!(
            "• **{tag}** — {count} _({:.0}% )_",
            percentage(count, total_failures)
        ));
    }
    lines.join("\n")
}

/// Terminal rendering of the same breakdown.
pub fn render_breakdown_table(breakdown: &FailureBreakdown) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{} {}", bright("🚧"), bright("Failure Breakdown").underlined());

    if breakdown.total_jobs == 0 {
        let _ = writeln!(output, "  {}", dim(NO_JOBS_MESSAGE));
        return output;
    }

    let failure_rate = percentage(breakdown.total_failures, breakdown.total_jobs);
    let _ = writeln!(
        output,
        "  {} {}\n  {} {} ({} failure rate)\n",
        dim("Total jobs:"),
        breakdown.total_jobs,
        dim("Failures:"),
        breakdown.total_failures,
        bright_yellow(format!("{failure_rate:.0}%"))
    );

    let mut table = create_table();
    table.set_header(cyan_header(&["Category", "Failures", "Share"]));
    for (tag, count) in breakdown.sorted() {
        table.add_row(vec![
            category_cell(tag),
            Cell::new(count),
            color_coded_share_cell(percentage(count, breakdown.total_failures)),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}
