//! The REST API construct

use serde::Deserialize;

use crate::construct::{
    CfnOutput, CfnResource, ConstructError, NodeId, Properties, Pseudo, Stack, Value,
};

use super::deployment::{validate_stage_name, Deployment, Stage, StageOptions};
use super::resource::ApiResource;
use super::{ACCOUNT_TYPE, IAM_ROLE_TYPE, METHOD_TYPE, REST_API_TYPE};

const DEFAULT_STAGE_NAME: &str = "prod";
const DEPLOYMENT_DESCRIPTION: &str = "Automatically created by the RestApi construct";
const PUSH_TO_CLOUDWATCH_POLICY: &str =
    ":iam::aws:policy/service-role/AmazonAPIGatewayPushToCloudWatchLogs";

/// Nodes every construct hanging off an API needs to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ApiContext {
    /// The RestApi construct
    pub api: NodeId,
    /// Its `AWS::ApiGateway::RestApi` resource
    pub rest_api: NodeId,
    /// Resource of the deployment that tracks every method
    pub deployment: Option<NodeId>,
}

/// Endpoint flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointType {
    Edge,
    Regional,
    Private,
}

impl EndpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Edge => "EDGE",
            EndpointType::Regional => "REGIONAL",
            EndpointType::Private => "PRIVATE",
        }
    }
}

/// Properties for [`RestApi::new`]
#[derive(Debug, Clone)]
pub struct RestApiProps {
    /// API name; defaults to the construct id
    pub rest_api_name: Option<String>,
    pub description: Option<String>,
    /// Create a role allowing the gateway to push logs, plus the account setting using it
    pub cloud_watch_role: bool,
    /// Create a deployment, a stage and an `Endpoint` output
    pub deploy: bool,
    /// Options for the stage created when `deploy` is set
    pub deploy_options: StageOptions,
    pub endpoint_types: Vec<EndpointType>,
    /// Export name for the `Endpoint` output
    pub endpoint_export_name: Option<String>,
}

impl Default for RestApiProps {
    fn default() -> Self {
        Self {
            rest_api_name: None,
            description: None,
            cloud_watch_role: true,
            deploy: true,
            deploy_options: StageOptions::default(),
            endpoint_types: Vec::new(),
            endpoint_export_name: None,
        }
    }
}

impl RestApiProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.rest_api_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cloud_watch_role(mut self, enabled: bool) -> Self {
        self.cloud_watch_role = enabled;
        self
    }

    pub fn with_deploy(mut self, deploy: bool) -> Self {
        self.deploy = deploy;
        self
    }

    pub fn with_deploy_options(mut self, options: StageOptions) -> Self {
        self.deploy_options = options;
        self
    }

    /// Name of the stage created when `deploy` is set
    pub fn with_stage_name(mut self, stage_name: impl Into<String>) -> Self {
        self.deploy_options.stage_name = Some(stage_name.into());
        self
    }

    pub fn with_endpoint_types(mut self, types: Vec<EndpointType>) -> Self {
        self.endpoint_types = types;
        self
    }

    pub fn with_endpoint_export_name(mut self, name: impl Into<String>) -> Self {
        self.endpoint_export_name = Some(name.into());
        self
    }
}

/// A REST API with its root resource
#[derive(Debug, Clone)]
pub struct RestApi {
    context: ApiContext,
    root: ApiResource,
    latest_deployment: Option<Deployment>,
    deployment_stage: Option<Stage>,
}

impl RestApi {
    /// Create a REST API at the top of the stack
    pub fn new(stack: &mut Stack, id: &str, props: RestApiProps) -> Result<Self, ConstructError> {
        let scope = stack.root();
        Self::new_in(stack, scope, id, props)
    }

    /// Create a REST API under `scope`
    pub fn new_in(
        stack: &mut Stack,
        scope: NodeId,
        id: &str,
        props: RestApiProps,
    ) -> Result<Self, ConstructError> {
        let path = stack.child_path(scope, id);
        if let Some(stage_name) = &props.deploy_options.stage_name {
            if !props.deploy {
                return Err(ConstructError::validation(
                    path,
                    format!("stage '{}' requested but deploy is disabled", stage_name),
                ));
            }
        }
        let stage_name = props
            .deploy_options
            .stage_name
            .clone()
            .unwrap_or_else(|| DEFAULT_STAGE_NAME.to_string());
        let stage_id = format!("DeploymentStage.{}", stage_name);
        if props.deploy {
            validate_stage_name(&format!("{}/{}", path, stage_id), &stage_name)?;
        }

        let api = stack.add_child(scope, id)?;
        let endpoint_configuration = if props.endpoint_types.is_empty() {
            None
        } else {
            let types: Vec<Value> = props
                .endpoint_types
                .iter()
                .map(|t| Value::from(t.as_str()))
                .collect();
            Some(Properties::new().with("Types", types))
        };
        let properties = Properties::new()
            .with("Name", props.rest_api_name.clone().unwrap_or_else(|| id.to_string()))
            .with_opt("Description", props.description.clone())
            .with_opt("EndpointConfiguration", endpoint_configuration);
        let rest_api = stack.add_resource(
            api,
            "Resource",
            CfnResource::new(REST_API_TYPE, properties),
        )?;

        if props.cloud_watch_role {
            configure_cloud_watch_role(stack, api, rest_api)?;
        }

        let mut context = ApiContext {
            api,
            rest_api,
            deployment: None,
        };

        let mut latest_deployment = None;
        let mut deployment_stage = None;
        if props.deploy {
            let deployment = Deployment::create(
                stack,
                api,
                "Deployment",
                context,
                Some(DEPLOYMENT_DESCRIPTION),
            )?;
            context.deployment = Some(deployment.resource_node());

            let mut options = props.deploy_options.clone();
            options.stage_name = Some(stage_name);
            let stage = Stage::create(stack, api, &stage_id, &deployment, options)?;

            let mut output = CfnOutput::new(endpoint_url(rest_api, &stage, "/"));
            if let Some(name) = &props.endpoint_export_name {
                output = output.with_export_name(name.clone());
            }
            stack.add_output(api, "Endpoint", output)?;

            latest_deployment = Some(deployment);
            deployment_stage = Some(stage);
        }

        let root_node = stack.add_child(api, "Default")?;
        let root = ApiResource::root(context, root_node);

        stack.add_validation(api, move |stack| {
            let has_method = stack.descendants(api).into_iter().any(|node| {
                matches!(stack.resource(node), Ok(resource) if resource.resource_type == METHOD_TYPE)
            });
            if has_method {
                Ok(())
            } else {
                Err("the REST API doesn't contain any methods".to_string())
            }
        })?;

        tracing::debug!(path = %stack.path(api), deploy = props.deploy, "created REST API");
        Ok(Self {
            context,
            root,
            latest_deployment,
            deployment_stage,
        })
    }

    pub fn node(&self) -> NodeId {
        self.context.api
    }

    /// Reference to the `AWS::ApiGateway::RestApi` resource
    pub fn rest_api_id(&self) -> Value {
        Value::reference(self.context.rest_api)
    }

    /// The `/` resource
    pub fn root(&self) -> &ApiResource {
        &self.root
    }

    /// Deployment created when `deploy` is set
    pub fn latest_deployment(&self) -> Option<&Deployment> {
        self.latest_deployment.as_ref()
    }

    /// Stage created when `deploy` is set
    pub fn deployment_stage(&self) -> Option<&Stage> {
        self.deployment_stage.as_ref()
    }

    /// Invoke URL of `path` on the deployment stage
    pub fn url_for_path(&self, path: &str) -> Option<Value> {
        self.deployment_stage
            .as_ref()
            .map(|stage| endpoint_url(self.context.rest_api, stage, path))
    }

    pub(crate) fn context(&self) -> ApiContext {
        self.context
    }
}

fn endpoint_url(rest_api: NodeId, stage: &Stage, path: &str) -> Value {
    Value::join(
        "",
        vec![
            "https://".into(),
            Value::reference(rest_api),
            ".execute-api.".into(),
            Pseudo::Region.into(),
            ".".into(),
            Pseudo::UrlSuffix.into(),
            "/".into(),
            stage.stage_ref(),
            path.into(),
        ],
    )
}

fn configure_cloud_watch_role(
    stack: &mut Stack,
    api: NodeId,
    rest_api: NodeId,
) -> Result<(), ConstructError> {
    let statement = Properties::new()
        .with("Action", "sts:AssumeRole")
        .with("Effect", "Allow")
        .with(
            "Principal",
            Properties::new().with("Service", "apigateway.amazonaws.com"),
        );
    let policy_document = Properties::new()
        .with("Statement", vec![Value::from(statement)])
        .with("Version", "2012-10-17");
    let managed_policy = Value::join(
        "",
        vec![
            "arn:".into(),
            Pseudo::Partition.into(),
            PUSH_TO_CLOUDWATCH_POLICY.into(),
        ],
    );
    let role_scope = stack.add_child(api, "CloudWatchRole")?;
    let role = stack.add_resource(
        role_scope,
        "Resource",
        CfnResource::new(
            IAM_ROLE_TYPE,
            Properties::new()
                .with("AssumeRolePolicyDocument", policy_document)
                .with("ManagedPolicyArns", vec![managed_policy]),
        ),
    )?;
    let account = stack.add_resource(
        api,
        "Account",
        CfnResource::new(
            ACCOUNT_TYPE,
            Properties::new().with("CloudWatchRoleArn", Value::get_att(role, "Arn")),
        ),
    )?;
    stack.add_dependency(account, rest_api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_props() {
        let props = RestApiProps::default();
        assert!(props.cloud_watch_role);
        assert!(props.deploy);
        assert!(props.deploy_options.stage_name.is_none());
    }

    #[test]
    fn test_name_defaults_to_id() {
        let mut stack = Stack::new("test");
        let api = RestApi::new(&mut stack, "my-api", RestApiProps::new().with_deploy(false))
            .unwrap();
        let resource = stack.resource(api.context.rest_api).unwrap();
        assert_eq!(resource.properties.get("Name"), Some(&Value::from("my-api")));
    }

    #[test]
    fn test_stage_without_deploy_rejected() {
        let mut stack = Stack::new("test");
        let props = RestApiProps::new().with_deploy(false).with_stage_name("test");
        assert!(matches!(
            RestApi::new(&mut stack, "my-api", props),
            Err(ConstructError::Validation { .. })
        ));
    }

    #[test]
    fn test_invalid_stage_name_leaves_stack_untouched() {
        let mut stack = Stack::new("test");
        let before = stack.len();
        let err = RestApi::new(
            &mut stack,
            "my-api",
            RestApiProps::new().with_stage_name("not-valid"),
        )
        .unwrap_err();
        assert_eq!(err.path(), Some("my-api/DeploymentStage.not-valid"));
        assert_eq!(stack.len(), before);

        // The id is still free for a corrected API
        let api = RestApi::new(&mut stack, "my-api", RestApiProps::new().with_stage_name("test"))
            .unwrap();
        api.root().add_method(&mut stack, "GET").unwrap();
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn test_errors_carry_the_full_path() {
        let mut stack = Stack::new("test");
        let root = stack.root();
        let scope = stack.add_child(root, "service").unwrap();
        let err = RestApi::new_in(
            &mut stack,
            scope,
            "my-api",
            RestApiProps::new().with_deploy(false).with_stage_name("test"),
        )
        .unwrap_err();
        assert_eq!(err.path(), Some("service/my-api"));
    }

    #[test]
    fn test_deploy_creates_stage_and_deployment() {
        let mut stack = Stack::new("test");
        let api = RestApi::new(&mut stack, "my-api", RestApiProps::new()).unwrap();
        assert_eq!(api.deployment_stage().unwrap().stage_name(), "prod");
        assert!(api.latest_deployment().is_some());
        assert!(api.url_for_path("/").is_some());
    }

    #[test]
    fn test_endpoint_type_names() {
        assert_eq!(EndpointType::Regional.as_str(), "REGIONAL");
        assert_eq!(EndpointType::Private.as_str(), "PRIVATE");
    }
}
