use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::junit;

static REDACTED_URL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"X+-X+").expect("valid redaction pattern"));

/// Replaces the masked build identifier found in changepoint build URLs.
pub const CANONICAL_URL_TOKEN: &str = "ocp-qe-perfscale";

const CHANGEPOINT_MARKER: &str = "-- changepoint";

/// How a changepoint document is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Flat list of changepoint records.
    Json,
    /// Junit report whose failure texts carry changepoint rows.
    Junit,
    /// Plain text carrying changepoint rows.
    Text,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Self::Json),
            Some("xml") => Some(Self::Junit),
            Some("txt" | "log") => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangepointDocument {
    pub name: String,
    pub format: DocumentFormat,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChangepointRecord {
    #[serde(default)]
    is_changepoint: bool,
    #[serde(rename = "buildUrl", default = "default_build_url")]
    build_url: String,
    #[serde(default)]
    metrics: IndexMap<String, MetricChange>,
}

#[derive(Debug, Deserialize)]
struct MetricChange {
    #[serde(default)]
    percentage_change: f64,
    #[serde(default)]
    labels: Value,
}

fn default_build_url() -> String {
    "N/A".to_string()
}

/// Substitutes the first redacted token of a build URL.
pub fn deobfuscate_url(url: &str) -> String {
    REDACTED_URL_TOKEN
        .replace(url.trim(), CANONICAL_URL_TOKEN)
        .into_owned()
}

fn label_text(labels: &Value) -> String {
    match labels {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Regression summaries from a JSON changepoint document.
pub fn json_changepoints(document: &str) -> Vec<String> {
    let records: Vec<ChangepointRecord> = match serde_json::from_str(document) {
        Ok(records) => records,
        Err(e) => {
            warn!("Failed to parse changepoint JSON: {e}");
            return Vec::new();
        }
    };

    records
        .iter()
        .filter(|record| record.is_changepoint)
        .flat_map(|record| {
            let url = deobfuscate_url(&record.build_url);
            record
                .metrics
                .iter()
                .filter(|(_, change)| change.percentage_change != 0.0)
                .map(move |(metric, change)| {
                    format!(
                        "--- Test Case: {} {metric} regression detection --- {} % changepoint --- {url} ---",
                        label_text(&change.labels),
                        change.percentage_change
                    )
                })
        })
        .collect()
}

fn is_zero_change(percentage: &str) -> bool {
    percentage
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .is_ok_and(|value| value == 0.0)
}

/// Changepoint rows from pipe-delimited text.
///
/// A row carries the `-- changepoint` marker; its percentage is the
/// second-to-last column and its build URL the fifth. The percentage is
/// reported as written. Rows whose value reads as zero are dropped.
pub fn text_changepoints(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.contains(CHANGEPOINT_MARKER))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 5 {
                return None;
            }
            let percentage = parts[parts.len() - 2].trim();
            if is_zero_change(percentage) {
                return None;
            }
            Some(format!(
                "{percentage} % changepoint --- {}",
                deobfuscate_url(parts[4])
            ))
        })
        .collect()
}

fn junit_changepoints(xml: &str) -> Vec<String> {
    match junit::failing_cases(xml) {
        Ok(cases) => cases
            .iter()
            .flat_map(|case| {
                text_changepoints(&case.failure_text)
                    .into_iter()
                    .map(move |entry| format!("--- Test Case: {} --- {entry}", case.name))
            })
            .collect(),
        Err(e) => {
            warn!("Failed to parse changepoint junit report: {e}");
            Vec::new()
        }
    }
}

pub fn document_changepoints(document: &ChangepointDocument) -> Vec<String> {
    match document.format {
        DocumentFormat::Json => json_changepoints(&document.content),
        DocumentFormat::Junit => junit_changepoints(&document.content),
        DocumentFormat::Text => text_changepoints(&document.content),
    }
}

/// Changepoints of the first document that reports any.
pub fn summarize(documents: &[ChangepointDocument]) -> Vec<String> {
    for document in documents {
        let changepoints = document_changepoints(document);
        if !changepoints.is_empty() {
            debug!(
                "Found {} changepoints in {}",
                changepoints.len(),
                document.name
            );
            return changepoints;
        }
    }
    Vec::new()
}
