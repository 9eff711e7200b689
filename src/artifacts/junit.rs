use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Result, TriageError};

static TEST_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s(.+?)\s+container").expect("valid test name pattern"));

const PHASE_KEYWORDS: [&str; 3] = ["pre", "post", "test"];

#[derive(Debug, Deserialize)]
struct TestSuites {
    #[serde(rename = "testsuite", default)]
    suites: Vec<TestSuite>,
}

#[derive(Debug, Deserialize)]
struct TestSuite {
    #[serde(rename = "@failures", default)]
    failures: u32,
    #[serde(rename = "testcase", default)]
    cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
struct TestCase {
    #[serde(rename = "@name")]
    name: String,
    failure: Option<Failure>,
}

#[derive(Debug, Deserialize)]
struct Failure {
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

/// A test case that carries a failure payload inside a failing suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailingCase {
    pub name: String,
    pub failure_text: String,
}

/// The step that failed, as reported by the operator test report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub phase: Option<String>,
    pub test_name: Option<String>,
    pub failure_message: Option<String>,
}

/// Failing cases of a junit document, in document order.
///
/// Accepts either a `<testsuites>` root or a bare `<testsuite>` root. Suites
/// reporting no failures are skipped entirely.
pub fn failing_cases(xml: &str) -> Result<Vec<FailingCase>> {
    let wrapped: TestSuites = quick_xml::de::from_str(xml)
        .map_err(|e| TriageError::Artifact(format!("invalid junit document: {e}")))?;

    let suites = if wrapped.suites.is_empty() {
        let single: TestSuite = quick_xml::de::from_str(xml)
            .map_err(|e| TriageError::Artifact(format!("invalid junit document: {e}")))?;
        vec![single]
    } else {
        wrapped.suites
    };

    Ok(suites
        .into_iter()
        .filter(|suite| suite.failures > 0)
        .flat_map(|suite| suite.cases)
        .filter_map(|case| {
            case.failure.map(|failure| FailingCase {
                name: case.name,
                failure_text: failure.text.unwrap_or_default(),
            })
        })
        .collect())
}

pub fn extract_phase(case_name: &str) -> Option<&'static str> {
    PHASE_KEYWORDS
        .into_iter()
        .find(|keyword| case_name.contains(&format!("{keyword} phase")))
}

pub fn extract_test_name(case_name: &str) -> Option<String> {
    TEST_NAME
        .captures(case_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Summarizes the first failing step of an operator test report.
///
/// Scanning stops as soon as phase, name and message are all known. The
/// failure message is only taken from a case seen once a phase is known, and
/// empty failure bodies do not count.
/// Returns `None` when the document cannot be parsed.
pub fn summarize(xml: &str) -> Option<StepSummary> {
    let cases = match failing_cases(xml) {
        Ok(cases) => cases,
        Err(e) => {
            warn!("Error parsing junit_operator.xml file: {e}");
            return None;
        }
    };

    let mut summary = StepSummary::default();
    for case in cases {
        if summary.phase.is_none() {
            summary.phase = extract_phase(&case.name).map(str::to_string);
        }
        if summary.failure_message.is_none()
            && summary.phase.is_some()
            && !case.failure_text.is_empty()
        {
            summary.failure_message = Some(case.failure_text.clone());
        }
        if summary.test_name.is_none() {
            summary.test_name = extract_test_name(&case.name);
        }
        if summary.phase.is_some() && summary.test_name.is_some() && summary.failure_message.is_some() {
            break;
        }
    }
    Some(summary)
}
