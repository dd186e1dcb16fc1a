//! The synthesized template and queries over it

use serde::Serialize;
use serde_json::Value as JsonValue;

use super::SynthConfig;

/// A synthesized template document
///
/// Queries follow the matching rules of the engine's assertion tooling:
/// expected properties must be present at the top level, and each expected
/// value must match exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Template(JsonValue);

impl Template {
    pub(crate) fn new(document: JsonValue) -> Self {
        Self(document)
    }

    pub fn as_json(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_json(self) -> JsonValue {
        self.0
    }

    /// Serialize according to `config`
    pub fn render(&self, config: &SynthConfig) -> Result<String, serde_json::Error> {
        if config.pretty_print {
            serde_json::to_string_pretty(&self.0)
        } else {
            serde_json::to_string(&self.0)
        }
    }

    /// All resources as `(logical id, entry)` in template order
    pub fn resources(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0
            .get("Resources")
            .and_then(JsonValue::as_object)
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Resource entry by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&JsonValue> {
        self.0.get("Resources")?.get(logical_id)
    }

    pub fn logical_ids(&self) -> Vec<&str> {
        self.resources().map(|(id, _)| id).collect()
    }

    /// Resources with the given type name
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &JsonValue)> {
        self.resources()
            .filter(|(_, entry)| entry.get("Type").and_then(JsonValue::as_str) == Some(resource_type))
            .collect()
    }

    pub fn count_resources(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).len()
    }

    /// Logical ids of resources of `resource_type` whose properties match
    pub fn find_resources(&self, resource_type: &str, expected: &JsonValue) -> Vec<&str> {
        self.resources_of_type(resource_type)
            .into_iter()
            .filter(|(_, entry)| {
                let properties = entry
                    .get("Properties")
                    .cloned()
                    .unwrap_or_else(|| JsonValue::Object(Default::default()));
                is_super_object(&properties, expected)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// True if some resource of `resource_type` has matching properties
    pub fn has_resource_properties(&self, resource_type: &str, expected: &JsonValue) -> bool {
        !self.find_resources(resource_type, expected).is_empty()
    }

    pub fn output(&self, logical_id: &str) -> Option<&JsonValue> {
        self.0.get("Outputs")?.get(logical_id)
    }
}

/// Top-level superset, exact match below
fn is_super_object(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Object(actual), JsonValue::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key) == Some(value)),
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Template {
        Template::new(json!({
            "Resources": {
                "plan": {
                    "Type": "AWS::ApiGateway::UsagePlan",
                    "Properties": {
                        "UsagePlanName": "Pro",
                        "Quota": { "Limit": 10, "Period": "DAY" }
                    }
                },
                "key": { "Type": "AWS::ApiGateway::ApiKey" }
            }
        }))
    }

    #[test]
    fn test_top_level_superset() {
        let t = template();
        assert!(t.has_resource_properties(
            "AWS::ApiGateway::UsagePlan",
            &json!({ "UsagePlanName": "Pro" })
        ));
    }

    #[test]
    fn test_nested_values_match_exactly() {
        let t = template();
        assert!(!t.has_resource_properties(
            "AWS::ApiGateway::UsagePlan",
            &json!({ "Quota": { "Limit": 10 } })
        ));
    }

    #[test]
    fn test_missing_properties_match_empty_expectation() {
        let t = template();
        assert!(t.has_resource_properties("AWS::ApiGateway::ApiKey", &json!({})));
        assert_eq!(t.count_resources("AWS::ApiGateway::ApiKey"), 1);
    }

    #[test]
    fn test_render_compact() {
        let t = Template::new(json!({ "Resources": {} }));
        let out = t
            .render(&SynthConfig::new().with_pretty_print(false))
            .unwrap();
        assert_eq!(out, r#"{"Resources":{}}"#);
    }

    #[test]
    fn test_logical_ids_keep_order() {
        assert_eq!(template().logical_ids(), vec!["plan", "key"]);
    }
}
