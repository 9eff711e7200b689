use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Spinner on stderr for a fixed sequence of phases.
pub struct PhaseProgress {
    pb: ProgressBar,
    current: usize,
    total: usize,
}

impl PhaseProgress {
    pub fn start(total: usize, label: &str) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow(format!("Phase 1/{total}: {label}")).to_string());
        Self {
            pb,
            current: 1,
            total,
        }
    }

    /// Marks the running phase done and starts the next one.
    pub fn advance(self, done: &str, next: &str) -> Self {
        self.finish_current(done);
        let current = self.current + 1;
        let pb = create_spinner(
            bright_yellow(format!("Phase {current}/{}: {next}", self.total)).to_string(),
        );
        Self {
            pb,
            current,
            total: self.total,
        }
    }

    pub fn finish(self, done: &str) {
        self.finish_current(done);
        eprintln!();
    }

    fn finish_current(&self, done: &str) {
        self.pb.finish_with_message(
            bright_green(format!("Phase {}/{}: {done} ✓", self.current, self.total)).to_string(),
        );
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
