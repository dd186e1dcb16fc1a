//! Two-pass synthesis of a stack into a template
//!
//! Pass one walks the tree depth first, assigns every element its logical
//! id and applies content hash suffixes. Pass two renders each element,
//! resolving node references against the finished id table. Nothing is
//! rendered until every id is known, so forward references are harmless.

use std::collections::HashMap;

use serde_json::{json, Map, Value as JsonValue};

use crate::construct::logical_id::content_hash;
use crate::construct::{CfnOutput, CfnResource, ConstructError, Element, NodeId, Stack, Value};

use super::{SynthConfig, Template};

/// Synthesize a stack into a template
pub fn synthesize(stack: &Stack, config: &SynthConfig) -> Result<Template, ConstructError> {
    tracing::debug!(stack = stack.name(), nodes = stack.len(), "synthesizing");
    stack.validate()?;

    if config.debug {
        log_tree(stack, stack.root(), 0);
    }

    let elements: Vec<NodeId> = stack
        .descendants(stack.root())
        .into_iter()
        .filter(|id| matches!(stack.node(*id), Ok(node) if node.element().is_some()))
        .collect();

    let ids = assign_logical_ids(stack, &elements)?;
    if config.debug {
        for id in &elements {
            if let Some(logical_id) = ids.get(id) {
                tracing::debug!(path = %stack.path(*id), logical_id = %logical_id, "assigned logical id");
            }
        }
    }

    let resolver = Resolver { stack, ids: &ids };
    let mut resources = Map::new();
    let mut outputs = Map::new();
    for &id in &elements {
        let logical_id = resolver.own_id(id)?;
        match stack.node(id)?.element() {
            Some(Element::Resource(resource)) => {
                resources.insert(logical_id, resolver.render_resource(id, resource)?);
            }
            Some(Element::Output(output)) => {
                outputs.insert(logical_id, resolver.render_output(id, output)?);
            }
            None => {}
        }
    }

    let mut document = Map::new();
    if let Some(description) = stack.description() {
        document.insert("Description".to_string(), json!(description));
    }
    document.insert("Resources".to_string(), JsonValue::Object(resources));
    if !outputs.is_empty() {
        document.insert("Outputs".to_string(), JsonValue::Object(outputs));
    }

    tracing::debug!(stack = stack.name(), elements = elements.len(), "synthesis complete");
    Ok(Template::new(JsonValue::Object(document)))
}

fn assign_logical_ids(
    stack: &Stack,
    elements: &[NodeId],
) -> Result<HashMap<NodeId, String>, ConstructError> {
    let mut ids = HashMap::new();
    for &id in elements {
        let logical_id = match stack.node(id)?.element() {
            Some(Element::Resource(CfnResource {
                logical_id_override: Some(logical_id),
                ..
            })) => logical_id.clone(),
            _ => stack.unique_id(id)?,
        };
        ids.insert(id, logical_id);
    }

    // Hash components resolve against path-derived ids
    let mut suffixes = Vec::new();
    {
        let resolver = Resolver { stack, ids: &ids };
        for &id in elements {
            if let Some(Element::Resource(resource)) = stack.node(id)?.element() {
                if resource.hash_components.is_empty() || resource.logical_id_override.is_some() {
                    continue;
                }
                let components = resource
                    .hash_components
                    .iter()
                    .map(|component| resolver.resolve(id, component))
                    .collect::<Result<Vec<_>, _>>()?;
                suffixes.push((id, content_hash(&components)));
            }
        }
    }
    for (id, suffix) in suffixes {
        if let Some(logical_id) = ids.get_mut(&id) {
            logical_id.push_str(&suffix);
        }
    }

    let mut seen: HashMap<&str, NodeId> = HashMap::new();
    for &id in elements {
        let Some(logical_id) = ids.get(&id) else {
            continue;
        };
        if let Some(first) = seen.insert(logical_id.as_str(), id) {
            return Err(ConstructError::DuplicateLogicalId {
                logical_id: logical_id.clone(),
                first: stack.path(first),
                second: stack.path(id),
            });
        }
    }

    Ok(ids)
}

/// Renders values once every logical id is known
struct Resolver<'a> {
    stack: &'a Stack,
    ids: &'a HashMap<NodeId, String>,
}

impl Resolver<'_> {
    fn own_id(&self, id: NodeId) -> Result<String, ConstructError> {
        self.ids
            .get(&id)
            .cloned()
            .ok_or_else(|| ConstructError::unresolved(self.stack.path(id), self.stack.path(id)))
    }

    /// Logical id of the resource `target` stands for
    fn logical_id(&self, from: NodeId, target: NodeId) -> Result<String, ConstructError> {
        let element = match self.stack.resolve_element(target) {
            Ok(element) => element,
            Err(_) => {
                return Err(ConstructError::unresolved(
                    self.stack.path(from),
                    "a node of another stack",
                ))
            }
        };
        let resource = element.filter(|e| {
            matches!(
                self.stack.node(*e).map(|n| n.element()),
                Ok(Some(Element::Resource(_)))
            )
        });
        resource
            .and_then(|e| self.ids.get(&e))
            .cloned()
            .ok_or_else(|| ConstructError::unresolved(self.stack.path(from), self.stack.path(target)))
    }

    fn resolve(&self, from: NodeId, value: &Value) -> Result<JsonValue, ConstructError> {
        Ok(match value {
            Value::String(s) => json!(s),
            Value::Integer(n) => json!(n),
            Value::Number(n) => number(*n).ok_or_else(|| {
                ConstructError::validation(
                    self.stack.path(from),
                    format!("{} is not a finite number", n),
                )
            })?,
            Value::Bool(b) => json!(b),
            Value::List(items) => JsonValue::Array(self.resolve_all(from, items)?),
            Value::Map(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    out.insert(key.clone(), self.resolve(from, item)?);
                }
                JsonValue::Object(out)
            }
            Value::Ref(target) => {
                let logical_id = self.logical_id(from, *target)?;
                json!({ "Ref": logical_id })
            }
            Value::GetAtt(target, attribute) => {
                let logical_id = self.logical_id(from, *target)?;
                json!({ "Fn::GetAtt": [logical_id, attribute] })
            }
            Value::Pseudo(pseudo) => json!({ "Ref": pseudo.as_str() }),
            Value::Join(separator, parts) => {
                let parts = self.resolve_all(from, parts)?;
                json!({ "Fn::Join": [separator, parts] })
            }
        })
    }

    fn resolve_all(&self, from: NodeId, items: &[Value]) -> Result<Vec<JsonValue>, ConstructError> {
        items.iter().map(|item| self.resolve(from, item)).collect()
    }

    fn render_resource(&self, id: NodeId, resource: &CfnResource) -> Result<JsonValue, ConstructError> {
        let mut entry = Map::new();
        entry.insert("Type".to_string(), json!(resource.resource_type));

        if !resource.properties.is_empty() {
            let mut properties = Map::new();
            for (key, value) in resource.properties.iter() {
                properties.insert(key.clone(), self.resolve(id, value)?);
            }
            entry.insert("Properties".to_string(), JsonValue::Object(properties));
        }

        if !resource.depends_on.is_empty() {
            let mut depends_on = resource
                .depends_on
                .iter()
                .map(|target| self.logical_id(id, *target))
                .collect::<Result<Vec<_>, _>>()?;
            depends_on.sort();
            depends_on.dedup();
            entry.insert("DependsOn".to_string(), json!(depends_on));
        }

        Ok(JsonValue::Object(entry))
    }

    fn render_output(&self, id: NodeId, output: &CfnOutput) -> Result<JsonValue, ConstructError> {
        let mut entry = Map::new();
        if let Some(description) = &output.description {
            entry.insert("Description".to_string(), json!(description));
        }
        entry.insert("Value".to_string(), self.resolve(id, &output.value)?);
        if let Some(name) = &output.export_name {
            entry.insert("Export".to_string(), json!({ "Name": name }));
        }
        Ok(JsonValue::Object(entry))
    }
}

/// Integral floats render as integers, the way the engine's own tooling does
fn number(n: f64) -> Option<JsonValue> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(json!(n as i64));
    }
    serde_json::Number::from_f64(n).map(JsonValue::Number)
}

fn log_tree(stack: &Stack, id: NodeId, depth: usize) {
    let Ok(node) = stack.node(id) else {
        return;
    };
    let kind = match node.element() {
        Some(Element::Resource(resource)) => resource.resource_type.as_str(),
        Some(Element::Output(_)) => "output",
        None => "scope",
    };
    tracing::debug!("{}[{}] {}", "  ".repeat(depth), node.id(), kind);
    for child in node.children() {
        log_tree(stack, *child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::{Properties, Pseudo};

    fn key_resource(name: &str) -> CfnResource {
        CfnResource::new(
            "AWS::ApiGateway::ApiKey",
            Properties::new().with("Name", name),
        )
    }

    #[test]
    fn test_number_rendering() {
        assert_eq!(number(10.0), Some(json!(10)));
        assert_eq!(number(0.0), Some(json!(0)));
        assert_eq!(number(2.5), Some(json!(2.5)));
        assert_eq!(number(f64::NAN), None);
        assert_eq!(number(f64::INFINITY), None);
    }

    #[test]
    fn test_one_entry_per_resource() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        let a = stack.add_child(root, "a").unwrap();
        stack.add_resource(a, "Resource", key_resource("a")).unwrap();
        let b = stack.add_child(root, "b").unwrap();
        stack.add_resource(b, "Resource", key_resource("b")).unwrap();

        let template = stack.synth().unwrap();
        assert_eq!(template.resources().count(), 2);
    }

    #[test]
    fn test_forward_reference_resolves() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        let later = stack.add_child(root, "later").unwrap();
        let plan = stack
            .add_resource(
                root,
                "plan",
                CfnResource::new("AWS::ApiGateway::UsagePlan", Properties::new()),
            )
            .unwrap();
        stack
            .resource_mut(plan)
            .unwrap()
            .properties
            .set("Target", Value::reference(later));
        // The target gets its resource only after the reference was taken
        stack
            .add_resource(later, "Resource", key_resource("later"))
            .unwrap();

        let template = stack.synth().unwrap();
        let target_id = make_id(&["later", "Resource"]);
        assert_eq!(
            template.resource("plan").unwrap()["Properties"]["Target"],
            json!({ "Ref": target_id })
        );
    }

    fn make_id(components: &[&str]) -> String {
        crate::construct::make_unique_id(components).unwrap()
    }

    #[test]
    fn test_reference_to_scope_without_resource_fails() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        let empty = stack.add_child(root, "empty").unwrap();
        stack
            .add_resource(
                root,
                "plan",
                CfnResource::new(
                    "AWS::ApiGateway::UsagePlan",
                    Properties::new().with("Target", Value::reference(empty)),
                ),
            )
            .unwrap();

        let err = stack.synth().unwrap_err();
        assert_eq!(err, ConstructError::unresolved("plan", "empty"));
    }

    #[test]
    fn test_reference_into_other_stack_fails() {
        let mut other = Stack::new("other");
        let other_root = other.root();
        let foreign = other
            .add_resource(other_root, "key", key_resource("k"))
            .unwrap();

        let mut stack = Stack::new("test");
        let root = stack.root();
        stack
            .add_resource(
                root,
                "plan",
                CfnResource::new(
                    "AWS::ApiGateway::UsagePlan",
                    Properties::new().with("Target", Value::reference(foreign)),
                ),
            )
            .unwrap();

        assert!(matches!(
            stack.synth(),
            Err(ConstructError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_logical_id_collision_detected() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        stack.add_resource(root, "a-b", key_resource("1")).unwrap();
        stack.add_resource(root, "ab", key_resource("2")).unwrap();

        let err = stack.synth().unwrap_err();
        assert!(matches!(err, ConstructError::DuplicateLogicalId { ref logical_id, .. } if logical_id == "ab"));
    }

    #[test]
    fn test_depends_on_sorted_and_intrinsics_rendered() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        let z = stack.add_resource(root, "zeta", key_resource("z")).unwrap();
        let a = stack.add_resource(root, "alpha", key_resource("a")).unwrap();
        let out = stack
            .add_resource(
                root,
                "account",
                CfnResource::new(
                    "AWS::ApiGateway::Account",
                    Properties::new().with(
                        "Url",
                        Value::join("", vec!["https://".into(), Pseudo::Region.into()]),
                    ),
                ),
            )
            .unwrap();
        stack.add_dependency(out, z).unwrap();
        stack.add_dependency(out, a).unwrap();

        let template = stack.synth().unwrap();
        let account = template.resource("account").unwrap();
        assert_eq!(account["DependsOn"], json!(["alpha", "zeta"]));
        assert_eq!(
            account["Properties"]["Url"],
            json!({ "Fn::Join": ["", ["https://", { "Ref": "AWS::Region" }]] })
        );
    }

    #[test]
    fn test_hash_components_suffix_logical_id() {
        let build = |method: &str| {
            let mut stack = Stack::new("test");
            let root = stack.root();
            let mut deployment =
                CfnResource::new("AWS::ApiGateway::Deployment", Properties::new());
            deployment.hash_components.push(json_value(method));
            stack.add_resource(root, "deployment", deployment).unwrap();
            stack.synth().unwrap()
        };
        let get = build("GET");
        let post = build("POST");
        let get_id = get.logical_ids()[0].to_string();
        let post_id = post.logical_ids()[0].to_string();
        assert!(get_id.starts_with("deployment"));
        assert_eq!(get_id.len(), "deployment".len() + 32);
        assert_ne!(get_id, post_id);
    }

    fn json_value(method: &str) -> Value {
        Value::Map([("method".to_string(), Value::from(method))].into_iter().collect())
    }

    #[test]
    fn test_non_finite_number_fails() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        stack
            .add_resource(
                root,
                "plan",
                CfnResource::new(
                    "AWS::ApiGateway::UsagePlan",
                    Properties::new().with("Rate", f64::NAN),
                ),
            )
            .unwrap();
        assert!(matches!(
            stack.synth(),
            Err(ConstructError::Validation { .. })
        ));
    }

    #[test]
    fn test_description_and_outputs() {
        let mut stack = Stack::with_props(
            "test",
            crate::construct::StackProps::default().with_description("demo"),
        );
        let root = stack.root();
        let key = stack.add_resource(root, "key", key_resource("k")).unwrap();
        stack
            .add_output(
                root,
                "KeyId",
                CfnOutput::new(Value::reference(key)).with_export_name("KeyExport"),
            )
            .unwrap();

        let template = stack.synth().unwrap();
        let doc = template.as_json();
        assert_eq!(doc["Description"], json!("demo"));
        assert_eq!(
            doc["Outputs"]["KeyId"],
            json!({ "Value": { "Ref": "key" }, "Export": { "Name": "KeyExport" } })
        );
    }
}
