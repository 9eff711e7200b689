use std::io::Write;
use std::process::{Command, Stdio};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Result, TriageError};

const ERROR_KEYWORDS: [&str; 5] = ["error", "failure", "exception", "fatal", "panic"];

/// Drops everything up to and including the first `|` of a log line.
fn strip_column_prefix(line: &str) -> &str {
    line.split_once('|').map_or(line, |(_, rest)| rest)
}

fn has_error_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Every log line mentioning an error keyword, in log order.
pub fn error_lines(log: &str) -> Vec<String> {
    log.lines()
        .map(strip_column_prefix)
        .filter(|line| has_error_keyword(line))
        .map(str::to_string)
        .collect()
}

/// Produces frequency-ranked error signatures as `"<count> <message>"`.
pub trait LineClusterer: Send + Sync {
    fn rank(&self, log: &str) -> Vec<String>;
}

/// Counts identical error lines, emitting them in first-seen order.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrequencyClusterer;

impl LineClusterer for FrequencyClusterer {
    fn rank(&self, log: &str) -> Vec<String> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();

        for line in log.lines().map(strip_column_prefix).map(str::trim) {
            if !line.is_empty() && has_error_keyword(line) {
                *counts.entry(line).or_insert(0) += 1;
            }
        }

        counts
            .into_iter()
            .map(|(message, count)| format!("{count} {message}"))
            .collect()
    }
}

/// Pipes the log through an external clustering program such as `logmine`.
///
/// The program's emission order is kept as-is, so ties between equally
/// frequent patterns are broken however the program orders them.
#[derive(Debug, Clone)]
pub struct CommandClusterer {
    program: String,
    args: Vec<String>,
}

impl CommandClusterer {
    /// Builds a clusterer from a whitespace-separated command line.
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TriageError::Config("cluster command is empty".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn run(&self, input: String) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TriageError::Artifact("cluster command has no stdin".into()))?;
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        if let Ok(Err(e)) = writer.join() {
            debug!("Cluster command closed stdin early: {e}");
        }

        if !output.status.success() {
            return Err(TriageError::Artifact(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl LineClusterer for CommandClusterer {
    fn rank(&self, log: &str) -> Vec<String> {
        let input: String = log
            .lines()
            .map(strip_column_prefix)
            .flat_map(|line| [line, "\n"])
            .collect();

        match self.run(input) {
            Ok(stdout) => stdout
                .lines()
                .map(str::trim)
                .filter(|line| has_error_keyword(line))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!("Cluster command {} failed: {e}", self.program);
                Vec::new()
            }
        }
    }
}
