use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::bundle::ArtifactBundle;
use super::classifier::{categorize_step, MAINTENANCE_ISSUE};
use super::extraction::{error_lines, FrequencyClusterer, LineClusterer};
use super::{changepoint, junit, operators, reducer};
use crate::triage::{EvidenceList, FailureRecord};

const HEADLINE_MARKER: &str = "Logs for container test in pod ";

/// Colored level tag and timestamp prepended by the CI log collector, e.g.
/// `ESC[36mINFOESC[0m[2024-05-01T10:00:00Z] `.
static LOG_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\x1b\[[0-9;]*m\w*\x1b\[0m\[\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z\]\s*")
        .expect("valid log prefix pattern")
});

const MISSING_BUILD_LOG: &str =
    "Prow maintenance issue, couldn't even find the build-log.txt file";
const MISSING_HEADLINE: &str = "Couldn't identify the failure step, likely a maintenance issue";
const MISSING_COMPONENT_HEALTH: &str = "Somehow couldn't find clusteroperators.json file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Lines of build log kept when no better evidence exists.
    pub build_log_tail: usize,
    /// Distinct error signatures kept by the frequency reducer.
    pub top_n_errors: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            build_log_tail: 100,
            top_n_errors: 10,
        }
    }
}

/// Decides, per job, which artifacts supply the evidence for a failure.
pub struct Orchestrator {
    settings: AnalysisSettings,
    clusterer: Box<dyn LineClusterer>,
}

impl Orchestrator {
    pub fn new(settings: AnalysisSettings, clusterer: Box<dyn LineClusterer>) -> Self {
        Self {
            settings,
            clusterer,
        }
    }

    /// Builds the failure record for one job run.
    ///
    /// Sources are tried in order: build-log headline, test report (for the
    /// category), component health, changepoints, and finally frequency
    /// reduction of the raw log. Structured sources short-circuit the ones
    /// after them. This never fails: missing or malformed artifacts only move
    /// the analysis down the chain.
    pub fn analyze(&self, bundle: &ArtifactBundle, job_name: &str) -> FailureRecord {
        info!("Analyzing artifacts for job {job_name}");

        let Some(build_log) = bundle.build_log.as_deref() else {
            warn!("No build log for job {job_name}");
            return maintenance_record(MISSING_BUILD_LOG);
        };

        let Some(headline) = find_headline(build_log) else {
            warn!("No failing step found in build log for job {job_name}");
            return maintenance_record(MISSING_HEADLINE);
        };
        debug!("Headline: {headline}");

        let (category_message, step_summary) = match bundle.test_report.as_deref() {
            Some(report) => categorize_from_report(report, &headline),
            None => (String::new(), String::new()),
        };

        let Some(component_health) = bundle.component_health.as_deref() else {
            warn!("No component health document for job {job_name}, using build log tail");
            let tail = tail_lines(build_log, self.settings.build_log_tail).join("\n");
            let body = if step_summary.is_empty() {
                tail
            } else {
                format!("{step_summary}\n{tail}")
            };
            return record(
                [MISSING_COMPONENT_HEALTH.to_string(), headline, body],
                category_message,
                false,
            );
        };

        let conditions = operators::unhealthy_conditions(component_health);
        if !conditions.is_empty() {
            info!("Found {} unhealthy component conditions", conditions.len());
            return record(std::iter::once(headline).chain(conditions), category_message, false);
        }

        let changepoints = changepoint::summarize(&bundle.changepoints);
        if !changepoints.is_empty() {
            info!("Found {} changepoints", changepoints.len());
            return record(std::iter::once(headline).chain(changepoints), category_message, false);
        }

        let mut reduced = self.reduce_errors(build_log);
        if reduced.is_empty() {
            info!("No ranked errors, falling back to build log tail");
            reduced = tail_lines(build_log, self.settings.build_log_tail)
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        record(
            [headline, step_summary].into_iter().chain(reduced),
            category_message,
            true,
        )
    }

    fn reduce_errors(&self, build_log: &str) -> Vec<String> {
        let full = error_lines(build_log);
        let ranked = self.clusterer.rank(build_log);
        reducer::reduce(&full, &ranked, self.settings.top_n_errors)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(AnalysisSettings::default(), Box::new(FrequencyClusterer))
    }
}

fn record<I>(evidence: I, category_message: String, requires_llm_filter: bool) -> FailureRecord
where
    I: IntoIterator<Item = String>,
{
    FailureRecord {
        evidence: evidence.into_iter().collect(),
        category_message,
        requires_llm_filter,
        is_maintenance_issue: false,
    }
}

fn maintenance_record(line: &str) -> FailureRecord {
    let mut evidence = EvidenceList::new();
    evidence.push(line);
    FailureRecord {
        evidence,
        category_message: MAINTENANCE_ISSUE.to_string(),
        requires_llm_filter: false,
        is_maintenance_issue: true,
    }
}

fn strip_log_prefix(line: &str) -> &str {
    match LOG_PREFIX.find(line) {
        Some(prefix) => &line[prefix.end()..],
        None => line,
    }
}

/// First log line naming the failed test container, prefix stripped.
pub fn find_headline(build_log: &str) -> Option<String> {
    build_log
        .lines()
        .map(strip_log_prefix)
        .find(|line| line.contains(HEADLINE_MARKER))
        .map(|line| line.trim().to_string())
}

/// Category message and failure text derived from the operator test report.
fn categorize_from_report(report: &str, headline: &str) -> (String, String) {
    match junit::summarize(report) {
        Some(junit::StepSummary {
            phase: Some(phase),
            test_name: Some(name),
            failure_message,
        }) => (
            categorize_step(&name, &phase),
            failure_message.unwrap_or_default(),
        ),
        _ => (categorize_step(headline, "unknown"), String::new()),
    }
}

fn tail_lines(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::changepoint::{ChangepointDocument, DocumentFormat};

    const HEADLINE: &str = "Logs for container test in pod e2e-aws-ipi-install";

    const DEGRADED_ETCD: &str = r#"{"items": [{"metadata": {"name": "etcd"}, "status": {"conditions": [
        {"type": "Degraded", "status": "True", "reason": "MembersDown", "message": "1 of 3 members down"}
    ]}}]}"#;

    const HEALTHY: &str = r#"{"items": [{"metadata": {"name": "etcd"}, "status": {"conditions": [
        {"type": "Degraded", "status": "False", "reason": "AsExpected", "message": ""}
    ]}}]}"#;

    const CHANGEPOINTS: &str = r#"[{"is_changepoint": true, "buildUrl": "https://prow/1",
        "metrics": {"podReadyLatency": {"percentage_change": 20, "labels": "[Jira: x]"}}}]"#;

    const REPORT: &str = r#"<testsuites><testsuite failures="1">
        <testcase name="Run multi-stage test test phase - openshift-qe-node-density container test">
          <failure>workload exceeded thresholds</failure>
        </testcase>
    </testsuite></testsuites>"#;

    fn build_log(extra: &str) -> String {
        format!(
            "\x1b[36mINFO\x1b[0m[2024-05-01T10:00:00Z] Running step\n\
             \x1b[36mINFO\x1b[0m[2024-05-01T10:00:01Z] {HEADLINE}  \n\
             {extra}"
        )
    }

    fn bundle(log: Option<String>) -> ArtifactBundle {
        ArtifactBundle {
            build_log: log,
            ..ArtifactBundle::default()
        }
    }

    mod find_headline {
        use super::*;

        #[test]
        fn strips_colored_timestamp_prefix() {
            assert_eq!(find_headline(&build_log("")), Some(HEADLINE.to_string()));
        }

        #[test]
        fn matches_unprefixed_lines() {
            assert_eq!(
                find_headline("noise\nLogs for container test in pod abc\n"),
                Some("Logs for container test in pod abc".to_string())
            );
        }

        #[test]
        fn is_case_sensitive() {
            assert_eq!(find_headline("logs for container test in pod abc"), None);
        }
    }

    #[test]
    fn test_missing_build_log_is_maintenance() {
        let record = Orchestrator::default().analyze(&ArtifactBundle::default(), "job");

        assert!(record.is_maintenance_issue);
        assert!(!record.requires_llm_filter);
        assert_eq!(record.evidence.lines(), [MISSING_BUILD_LOG]);
        assert_eq!(record.category_message, MAINTENANCE_ISSUE);
    }

    #[test]
    fn test_missing_headline_is_maintenance() {
        let record = Orchestrator::default().analyze(&bundle(Some("boring\n".into())), "job");

        assert!(record.is_maintenance_issue);
        assert_eq!(record.evidence.lines(), [MISSING_HEADLINE]);
    }

    #[test]
    fn test_missing_component_health_uses_tail() {
        let log = build_log("line a\nline b\nline c\n");
        let orchestrator = Orchestrator::new(
            AnalysisSettings {
                build_log_tail: 2,
                top_n_errors: 10,
            },
            Box::new(FrequencyClusterer),
        );

        let record = orchestrator.analyze(&bundle(Some(log)), "job");

        assert!(!record.is_maintenance_issue);
        assert!(!record.requires_llm_filter);
        assert_eq!(
            record.evidence.lines(),
            [MISSING_COMPONENT_HEALTH, HEADLINE, "line b\nline c"]
        );
        assert_eq!(record.category_message, "");
    }

    #[test]
    fn test_component_health_short_circuits() {
        let bundle = ArtifactBundle {
            build_log: Some(build_log("error: something\n")),
            component_health: Some(DEGRADED_ETCD.to_string()),
            changepoints: vec![ChangepointDocument {
                name: "a.json".into(),
                format: DocumentFormat::Json,
                content: CHANGEPOINTS.into(),
            }],
            ..ArtifactBundle::default()
        };

        let record = Orchestrator::default().analyze(&bundle, "job");

        assert_eq!(
            record.evidence.lines(),
            [
                HEADLINE,
                r#"{"Name":"etcd","Status":"True","Reason":"MembersDown","Message":"1 of 3 members down"}"#,
            ]
        );
        assert!(!record.requires_llm_filter);
    }

    #[test]
    fn test_changepoints_when_cluster_is_healthy() {
        let bundle = ArtifactBundle {
            build_log: Some(build_log("error: something\n")),
            component_health: Some(HEALTHY.to_string()),
            changepoints: vec![ChangepointDocument {
                name: "a.json".into(),
                format: DocumentFormat::Json,
                content: CHANGEPOINTS.into(),
            }],
            ..ArtifactBundle::default()
        };

        let record = Orchestrator::default().analyze(&bundle, "job");

        assert_eq!(record.evidence.len(), 2);
        assert_eq!(record.evidence.headline(), Some(HEADLINE));
        assert!(record.evidence.lines()[1].contains("20 % changepoint --- https://prow/1"));
        assert!(!record.requires_llm_filter);
    }

    #[test]
    fn test_frequency_reduction_fallback() {
        let log = build_log(
            "t | error: etcd timeout\n\
             t | fine\n\
             t | error: etcd timeout\n\
             t | panic: once\n",
        );
        let bundle = ArtifactBundle {
            build_log: Some(log),
            test_report: Some(REPORT.to_string()),
            component_health: Some(HEALTHY.to_string()),
            ..ArtifactBundle::default()
        };
        let orchestrator = Orchestrator::new(
            AnalysisSettings {
                build_log_tail: 100,
                top_n_errors: 1,
            },
            Box::new(FrequencyClusterer),
        );

        let record = orchestrator.analyze(&bundle, "job");

        assert!(record.requires_llm_filter);
        assert_eq!(record.category_message, "test phase: workload failure");
        assert_eq!(
            record.evidence.lines(),
            [
                HEADLINE,
                "workload exceeded thresholds",
                " error: etcd timeout",
                " error: etcd timeout",
            ]
        );
    }

    #[test]
    fn test_reducer_without_errors_falls_back_to_tail() {
        let bundle = ArtifactBundle {
            build_log: Some(build_log("all quiet\n")),
            component_health: Some(HEALTHY.to_string()),
            ..ArtifactBundle::default()
        };
        let orchestrator = Orchestrator::new(
            AnalysisSettings {
                build_log_tail: 1,
                top_n_errors: 5,
            },
            Box::new(FrequencyClusterer),
        );

        let record = orchestrator.analyze(&bundle, "job");

        assert!(record.requires_llm_filter);
        assert_eq!(record.evidence.lines(), [HEADLINE, "", "all quiet"]);
    }

    #[test]
    fn test_unusable_report_categorizes_headline() {
        let bundle = ArtifactBundle {
            build_log: Some(build_log("")),
            test_report: Some("<not-xml".to_string()),
            ..ArtifactBundle::default()
        };

        let record = Orchestrator::default().analyze(&bundle, "job");

        assert_eq!(
            record.category_message,
            format!("unknown phase: {HEADLINE} step failure")
        );
    }

    #[test]
    fn test_malformed_structured_artifacts_never_fail() {
        let bundle = ArtifactBundle {
            build_log: Some(build_log("")),
            test_report: Some("garbage".into()),
            component_health: Some("garbage".into()),
            changepoints: vec![ChangepointDocument {
                name: "x.json".into(),
                format: DocumentFormat::Json,
                content: "garbage".into(),
            }],
        };

        let record = Orchestrator::default().analyze(&bundle, "job");

        assert!(!record.is_maintenance_issue);
        assert_eq!(record.evidence.headline(), Some(HEADLINE));
    }
}
