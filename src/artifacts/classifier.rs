use crate::triage::CategoryTag;

/// Marker carried by the category message of infrastructure-level failures.
pub const MAINTENANCE_ISSUE: &str = "prow maintenance issue";

/// Step-name keywords and what a failure in such a step means.
///
/// `deprovision` precedes `provision` so that teardown steps are not
/// reported as provisioning failures.
const STEP_FAILURES: [(&str, &str); 8] = [
    ("deprovision", "deprovision failure"),
    ("provision", "provision failure"),
    ("gather", "must gather failure"),
    ("orion", "change point detection failure"),
    ("cerberus", "cerberus health check failure"),
    ("node-readiness", "nodes readiness check failure"),
    ("openshift-qe", "workload failure"),
    ("upgrade", "upgrade failure"),
];

/// Describes a failed CI step, e.g. `"pre phase: provision failure"`.
pub fn categorize_step(step_name: &str, phase: &str) -> String {
    STEP_FAILURES
        .iter()
        .find(|(keyword, _)| step_name.contains(keyword))
        .map_or_else(
            || format!("{phase} phase: {step_name} step failure"),
            |(_, description)| format!("{phase} phase: {description}"),
        )
}

fn looks_like_component_health(line: &str) -> bool {
    line.contains("\"Name\"") && line.contains("\"Reason\"")
}

/// Maps a failure record onto a category tag.
///
/// Matching is case-insensitive and the first rule that fires wins.
pub fn classify<S: AsRef<str>>(
    evidence: &[S],
    category_message: &str,
    is_install_issue: bool,
) -> CategoryTag {
    let category = category_message.to_lowercase();
    let has = |needle: &str| category.contains(needle);

    if has("maintenance issue") {
        CategoryTag::Maintenance
    } else if is_install_issue {
        CategoryTag::Install
    } else if has("change point") {
        CategoryTag::Changepoint
    } else if has("workload") || has("openshift-qe") {
        CategoryTag::Workload
    } else if has("must gather") {
        CategoryTag::MustGather
    } else if has("provision") && !has("deprovision") {
        CategoryTag::Provision
    } else if has("deprovision") {
        CategoryTag::Deprovision
    } else if has("upgrade") {
        CategoryTag::Upgrade
    } else if has("node") && has("readiness") {
        CategoryTag::NodeReadiness
    } else if has("cerberus") {
        CategoryTag::CerberusHealth
    } else if evidence
        .iter()
        .any(|line| looks_like_component_health(line.as_ref()))
    {
        // unclassified component-health noise usually means bring-up failed
        CategoryTag::Install
    } else if !category.trim().is_empty() {
        CategoryTag::ProwOther
    } else {
        CategoryTag::Unknown
    }
}
