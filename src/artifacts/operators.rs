use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ComponentList {
    items: Vec<Component>,
}

#[derive(Debug, Deserialize)]
struct Component {
    metadata: Metadata,
    #[serde(default)]
    status: ComponentStatus,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentStatus {
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    type_: String,
    status: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

impl Condition {
    fn is_unhealthy(&self) -> bool {
        matches!(
            (self.type_.as_str(), self.status.as_str()),
            ("Degraded", "True") | ("Available", "False")
        )
    }
}

/// One unhealthy condition, tagged with the component that reported it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConditionRecord<'a> {
    name: &'a str,
    status: &'a str,
    reason: &'a str,
    message: &'a str,
}

/// Serialized degraded/unavailable conditions from a component-health
/// document (`clusteroperators.json`).
///
/// Returns an empty list when the document cannot be parsed.
pub fn unhealthy_conditions(document: &str) -> Vec<String> {
    let components: ComponentList = match serde_json::from_str(document) {
        Ok(components) => components,
        Err(e) => {
            warn!("Failed to parse clusteroperators.json: {e}");
            return Vec::new();
        }
    };

    components
        .items
        .iter()
        .flat_map(|component| {
            component
                .status
                .conditions
                .iter()
                .filter(|condition| condition.is_unhealthy())
                .map(move |condition| ConditionRecord {
                    name: &component.metadata.name,
                    status: &condition.status,
                    reason: &condition.reason,
                    message: &condition.message,
                })
        })
        .filter_map(|record| serde_json::to_string(&record).ok())
        .collect()
}
