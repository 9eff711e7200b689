mod breakdown;
mod progress;
mod styling;
mod summary;
mod tables;

pub use breakdown::{render_breakdown_table, render_failure_breakdown, FailureBreakdown};
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_report;

/// Prints the `citriage` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🩺 citriage"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI failure triage")
    );
}
