//! Deployments and stages

use std::collections::BTreeMap;

use crate::construct::{CfnResource, ConstructError, NodeId, Properties, Stack, Value};

use super::rest_api::{ApiContext, RestApi};
use super::{DEPLOYMENT_TYPE, STAGE_TYPE};

/// A snapshot of an API
///
/// The deployment a [`RestApi`] creates for itself depends on every method
/// and resource of the API and hashes their properties into its logical
/// id, so any change to the API produces a fresh deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    context: ApiContext,
    node: NodeId,
    resource: NodeId,
}

impl Deployment {
    /// Create a deployment of `api` at the top of the stack
    pub fn new(
        stack: &mut Stack,
        id: &str,
        api: &RestApi,
        description: Option<&str>,
    ) -> Result<Self, ConstructError> {
        let scope = stack.root();
        Self::create(stack, scope, id, api.context(), description)
    }

    pub(crate) fn create(
        stack: &mut Stack,
        scope: NodeId,
        id: &str,
        context: ApiContext,
        description: Option<&str>,
    ) -> Result<Self, ConstructError> {
        let node = stack.add_child(scope, id)?;
        let properties = Properties::new()
            .with_opt("Description", description)
            .with("RestApiId", Value::reference(context.rest_api));
        let resource = stack.add_resource(
            node,
            "Resource",
            CfnResource::new(DEPLOYMENT_TYPE, properties),
        )?;
        Ok(Self {
            context,
            node,
            resource,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn resource_node(&self) -> NodeId {
        self.resource
    }

    /// Reference to the `AWS::ApiGateway::Deployment` resource
    pub fn deployment_id(&self) -> Value {
        Value::reference(self.resource)
    }

    /// Hash `data` into the logical id
    pub fn add_to_logical_id(&self, stack: &mut Stack, data: impl Into<Value>) -> Result<(), ConstructError> {
        stack
            .resource_mut(self.resource)?
            .hash_components
            .push(data.into());
        Ok(())
    }
}

/// Make the API's deployment depend on, and hash, a newly added resource
pub(crate) fn track_in_deployment(
    stack: &mut Stack,
    deployment: NodeId,
    dependency: NodeId,
    kind: &str,
    properties: Properties,
) -> Result<(), ConstructError> {
    stack.add_dependency(deployment, dependency)?;
    stack
        .resource_mut(deployment)?
        .hash_components
        .push(Properties::new().with(kind, properties).into());
    Ok(())
}

/// Options for a stage
#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Defaults to `prod` for stages a [`RestApi`] creates
    pub stage_name: Option<String>,
    pub description: Option<String>,
    pub tracing_enabled: Option<bool>,
    pub variables: BTreeMap<String, String>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage_name(mut self, stage_name: impl Into<String>) -> Self {
        self.stage_name = Some(stage_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tracing_enabled(mut self, enabled: bool) -> Self {
        self.tracing_enabled = Some(enabled);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Stage names may only hold letters, numbers and underscores
pub(crate) fn validate_stage_name(path: &str, stage_name: &str) -> Result<(), ConstructError> {
    if stage_name.is_empty()
        || !stage_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConstructError::validation(
            path,
            format!(
                "stage name '{}' may only contain letters, numbers and underscores",
                stage_name
            ),
        ));
    }
    Ok(())
}

/// A named, invokable snapshot of an API
#[derive(Debug, Clone)]
pub struct Stage {
    context: ApiContext,
    node: NodeId,
    resource: NodeId,
    stage_name: String,
}

impl Stage {
    /// Create a stage for `deployment` at the top of the stack
    pub fn new(
        stack: &mut Stack,
        id: &str,
        deployment: &Deployment,
        options: StageOptions,
    ) -> Result<Self, ConstructError> {
        let scope = stack.root();
        Self::create(stack, scope, id, deployment, options)
    }

    pub(crate) fn create(
        stack: &mut Stack,
        scope: NodeId,
        id: &str,
        deployment: &Deployment,
        options: StageOptions,
    ) -> Result<Self, ConstructError> {
        let stage_name = options
            .stage_name
            .clone()
            .unwrap_or_else(|| "prod".to_string());
        validate_stage_name(&stack.child_path(scope, id), &stage_name)?;

        let variables = if options.variables.is_empty() {
            None
        } else {
            Some(Value::Map(
                options
                    .variables
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ))
        };

        let node = stack.add_child(scope, id)?;
        let properties = Properties::new()
            .with("DeploymentId", deployment.deployment_id())
            .with_opt("Description", options.description.clone())
            .with("RestApiId", Value::reference(deployment.context.rest_api))
            .with("StageName", stage_name.as_str())
            .with_opt("TracingEnabled", options.tracing_enabled)
            .with_opt("Variables", variables);
        let resource = stack.add_resource(node, "Resource", CfnResource::new(STAGE_TYPE, properties))?;

        Ok(Self {
            context: deployment.context,
            node,
            resource,
            stage_name,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Reference to the `AWS::ApiGateway::Stage` resource
    pub fn stage_ref(&self) -> Value {
        Value::reference(self.resource)
    }

    /// Reference to the API this stage serves
    pub fn rest_api_id(&self) -> Value {
        Value::reference(self.context.rest_api)
    }

    /// The RestApi construct this stage belongs to
    pub fn api_node(&self) -> NodeId {
        self.context.api
    }
}
