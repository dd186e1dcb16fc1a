//! API keys

use crate::construct::{CfnResource, ConstructError, NodeId, Properties, Stack, Value};

use super::rest_api::RestApi;
use super::API_KEY_TYPE;

const MIN_VALUE_LEN: usize = 20;
const MAX_VALUE_LEN: usize = 128;

/// Properties for [`ApiKey::new`]
#[derive(Debug, Clone)]
pub struct ApiKeyProps {
    pub api_key_name: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub generate_distinct_id: Option<bool>,
    /// Explicit key value; generated by the engine when unset
    pub value: Option<String>,
    pub customer_id: Option<String>,
    /// APIs whose deployment stage the key is bound to
    pub resources: Vec<RestApi>,
}

impl Default for ApiKeyProps {
    fn default() -> Self {
        Self {
            api_key_name: None,
            description: None,
            enabled: true,
            generate_distinct_id: None,
            value: None,
            customer_id: None,
            resources: Vec::new(),
        }
    }
}

impl ApiKeyProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.api_key_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_generate_distinct_id(mut self, distinct: bool) -> Self {
        self.generate_distinct_id = Some(distinct);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_resource(mut self, api: RestApi) -> Self {
        self.resources.push(api);
        self
    }
}

/// An API key
#[derive(Debug, Clone)]
pub struct ApiKey {
    node: NodeId,
    resource: NodeId,
}

impl ApiKey {
    /// Create an API key at the top of the stack
    pub fn new(stack: &mut Stack, id: &str, props: ApiKeyProps) -> Result<Self, ConstructError> {
        let scope = stack.root();
        Self::new_in(stack, scope, id, props)
    }

    pub fn new_in(
        stack: &mut Stack,
        scope: NodeId,
        id: &str,
        props: ApiKeyProps,
    ) -> Result<Self, ConstructError> {
        let path = stack.child_path(scope, id);
        if let Some(value) = &props.value {
            let len = value.chars().count();
            if !(MIN_VALUE_LEN..=MAX_VALUE_LEN).contains(&len) {
                return Err(ConstructError::validation(
                    path,
                    format!(
                        "API key value must be between {} and {} characters, got {}",
                        MIN_VALUE_LEN, MAX_VALUE_LEN, len
                    ),
                ));
            }
        }

        let mut stage_keys = Vec::new();
        for api in &props.resources {
            let stage = api.deployment_stage().ok_or_else(|| {
                ConstructError::validation(
                    path.as_str(),
                    format!("API '{}' has no deployment stage", stack.path(api.node())),
                )
            })?;
            stage_keys.push(Value::from(
                Properties::new()
                    .with("RestApiId", api.rest_api_id())
                    .with("StageName", stage.stage_ref()),
            ));
        }

        let node = stack.add_child(scope, id)?;
        let properties = Properties::new()
            .with_opt("CustomerId", props.customer_id)
            .with_opt("Description", props.description)
            .with("Enabled", props.enabled)
            .with_opt("GenerateDistinctId", props.generate_distinct_id)
            .with_opt("Name", props.api_key_name)
            .with_opt("StageKeys", (!stage_keys.is_empty()).then_some(stage_keys))
            .with_opt("Value", props.value);
        let resource = stack.add_resource(node, "Resource", CfnResource::new(API_KEY_TYPE, properties))?;

        tracing::debug!(path = %stack.path(node), "created API key");
        Ok(Self { node, resource })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Reference to the `AWS::ApiGateway::ApiKey` resource
    pub fn key_id(&self) -> Value {
        Value::reference(self.resource)
    }
}
