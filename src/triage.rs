use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered diagnostic payload for one triage result.
///
/// The first line is conventionally the headline. Lines are only ever
/// appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceList(Vec<String>);

impl EvidenceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    pub fn headline(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins the evidence with newlines, silently cut at `max_chars` characters.
    pub fn render(&self, max_chars: usize) -> String {
        truncate_chars(&self.0.join("\n"), max_chars)
    }
}

impl<S: Into<String>> FromIterator<S> for EvidenceList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for EvidenceList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Closed set of failure-type labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryTag {
    Provision,
    Deprovision,
    #[serde(rename = "Must Gather")]
    MustGather,
    Changepoint,
    #[serde(rename = "Cerberus/health")]
    CerberusHealth,
    #[serde(rename = "Node Readiness")]
    NodeReadiness,
    Workload,
    Upgrade,
    Maintenance,
    Install,
    #[serde(rename = "Prow Other")]
    ProwOther,
    Unknown,
}

impl CategoryTag {
    pub fn label(self) -> &'static str {
        match self {
            Self::Provision => "Provision",
            Self::Deprovision => "Deprovision",
            Self::MustGather => "Must Gather",
            Self::Changepoint => "Changepoint",
            Self::CerberusHealth => "Cerberus/health",
            Self::NodeReadiness => "Node Readiness",
            Self::Workload => "Workload",
            Self::Upgrade => "Upgrade",
            Self::Maintenance => "Maintenance",
            Self::Install => "Install",
            Self::ProwOther => "Prow Other",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one orchestration run over a job's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub evidence: EvidenceList,
    pub category_message: String,
    /// Evidence came from unranked free-text extraction and should be
    /// re-filtered by the model before summarization.
    pub requires_llm_filter: bool,
    /// Infrastructure-level failure; deep analysis is skipped and a re-run
    /// is suggested instead.
    pub is_maintenance_issue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Diagnosis {
    /// Model-written root-cause analysis.
    Analyzed(String),
    /// Inference failed even after retries; carries the last error.
    Unavailable(String),
    /// Analysis deliberately not attempted, with the advice shown instead.
    Skipped(String),
}

/// Everything the CLI reports for one job.
#[derive(Debug, Serialize, Deserialize)]
pub struct TriageReport {
    pub job: String,
    pub analyzed_at: DateTime<Utc>,
    pub category: CategoryTag,
    pub record: FailureRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
}
