//! API resources (path segments) and the methods attached to them

use crate::construct::{CfnResource, ConstructError, NodeId, Properties, Stack, Value};

use super::deployment::track_in_deployment;
use super::rest_api::ApiContext;
use super::{METHOD_TYPE, RESOURCE_TYPE};

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "ANY"];

/// Who may call a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationType {
    #[default]
    None,
    Iam,
    Cognito,
    Custom,
}

impl AuthorizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationType::None => "NONE",
            AuthorizationType::Iam => "AWS_IAM",
            AuthorizationType::Cognito => "COGNITO_USER_POOLS",
            AuthorizationType::Custom => "CUSTOM",
        }
    }
}

/// Backend a method forwards to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Integration {
    /// Answer from the gateway itself
    #[default]
    Mock,
    /// Pass the request through to an HTTP endpoint
    HttpProxy { url: String, http_method: String },
}

impl Integration {
    pub fn http_proxy(url: impl Into<String>) -> Self {
        Integration::HttpProxy {
            url: url.into(),
            http_method: "ANY".to_string(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Integration::Mock => Properties::new().with("Type", "MOCK").into(),
            Integration::HttpProxy { url, http_method } => Properties::new()
                .with("IntegrationHttpMethod", http_method.as_str())
                .with("Type", "HTTP_PROXY")
                .with("Uri", url.as_str())
                .into(),
        }
    }
}

/// Options for [`ApiResource::add_method_with_options`]
#[derive(Debug, Clone, Default)]
pub struct MethodOptions {
    pub authorization_type: AuthorizationType,
    pub api_key_required: Option<bool>,
    pub integration: Integration,
    pub operation_name: Option<String>,
}

impl MethodOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authorization_type(mut self, authorization_type: AuthorizationType) -> Self {
        self.authorization_type = authorization_type;
        self
    }

    pub fn with_api_key_required(mut self, required: bool) -> Self {
        self.api_key_required = Some(required);
        self
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// A path segment of an API
#[derive(Debug, Clone)]
pub struct ApiResource {
    context: ApiContext,
    node: NodeId,
    resource_id: Value,
    path: String,
}

impl ApiResource {
    pub(crate) fn root(context: ApiContext, node: NodeId) -> Self {
        Self {
            context,
            node,
            resource_id: Value::get_att(context.rest_api, "RootResourceId"),
            path: "/".to_string(),
        }
    }

    /// Full path, `/` for the root
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Value identifying this resource to methods and child resources
    pub fn resource_id(&self) -> &Value {
        &self.resource_id
    }

    fn child_path(&self, path_part: &str) -> String {
        if self.path == "/" {
            format!("/{}", path_part)
        } else {
            format!("{}/{}", self.path, path_part)
        }
    }

    /// Add a child path segment
    pub fn add_resource(&self, stack: &mut Stack, path_part: &str) -> Result<ApiResource, ConstructError> {
        validate_path_part(path_part)
            .map_err(|reason| ConstructError::validation(stack.path(self.node), reason))?;

        let node = stack.add_child(self.node, path_part)?;
        let properties = Properties::new()
            .with("ParentId", self.resource_id.clone())
            .with("PathPart", path_part)
            .with("RestApiId", Value::reference(self.context.rest_api));
        let resource = stack.add_resource(
            node,
            "Resource",
            CfnResource::new(RESOURCE_TYPE, properties.clone()),
        )?;
        if let Some(deployment) = self.context.deployment {
            track_in_deployment(stack, deployment, resource, "resource", properties)?;
        }

        Ok(ApiResource {
            context: self.context,
            node,
            resource_id: Value::reference(resource),
            path: self.child_path(path_part),
        })
    }

    /// Existing child path segment
    pub fn get_resource(&self, stack: &Stack, path_part: &str) -> Option<ApiResource> {
        let node = stack.find_child(self.node, path_part)?;
        let resource = stack.find_child(node, "Resource")?;
        if stack.resource(resource).ok()?.resource_type != RESOURCE_TYPE {
            return None;
        }
        Some(ApiResource {
            context: self.context,
            node,
            resource_id: Value::reference(resource),
            path: self.child_path(path_part),
        })
    }

    /// Resource at `path` below this one, creating missing segments
    pub fn resource_for_path(&self, stack: &mut Stack, path: &str) -> Result<ApiResource, ConstructError> {
        let mut current = self.clone();
        for part in path.split('/').filter(|part| !part.is_empty()) {
            current = match current.get_resource(stack, part) {
                Some(existing) => existing,
                None => current.add_resource(stack, part)?,
            };
        }
        Ok(current)
    }

    /// Add a method with a mock integration and no authorization
    pub fn add_method(&self, stack: &mut Stack, http_method: &str) -> Result<Method, ConstructError> {
        self.add_method_with_options(stack, http_method, MethodOptions::default())
    }

    pub fn add_method_with_options(
        &self,
        stack: &mut Stack,
        http_method: &str,
        options: MethodOptions,
    ) -> Result<Method, ConstructError> {
        let http_method = http_method.to_uppercase();
        if !HTTP_METHODS.contains(&http_method.as_str()) {
            return Err(ConstructError::validation(
                stack.path(self.node),
                format!("invalid HTTP method '{}'", http_method),
            ));
        }

        let node = stack.add_child(self.node, &http_method)?;
        let properties = Properties::new()
            .with("AuthorizationType", options.authorization_type.as_str())
            .with_opt("ApiKeyRequired", options.api_key_required)
            .with("HttpMethod", http_method.as_str())
            .with("Integration", options.integration.to_value())
            .with_opt("OperationName", options.operation_name.clone())
            .with("ResourceId", self.resource_id.clone())
            .with("RestApiId", Value::reference(self.context.rest_api));
        let resource = stack.add_resource(
            node,
            "Resource",
            CfnResource::new(METHOD_TYPE, properties.clone()),
        )?;
        if let Some(deployment) = self.context.deployment {
            track_in_deployment(stack, deployment, resource, "method", properties)?;
        }

        tracing::debug!(path = %self.path, method = %http_method, "added method");
        Ok(Method {
            context: self.context,
            node,
            resource,
            http_method,
            resource_path: self.path.clone(),
        })
    }
}

/// An HTTP method on a resource
#[derive(Debug, Clone)]
pub struct Method {
    context: ApiContext,
    node: NodeId,
    resource: NodeId,
    http_method: String,
    resource_path: String,
}

impl Method {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Upper-case HTTP verb
    pub fn http_method(&self) -> &str {
        &self.http_method
    }

    /// Path of the resource the method is attached to
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Reference to the `AWS::ApiGateway::Method` resource
    pub fn method_id(&self) -> Value {
        Value::reference(self.resource)
    }

    /// Key of this method in a usage plan throttle table, e.g. `//GET`
    pub fn throttle_key(&self) -> String {
        format!("{}/{}", self.resource_path, self.http_method)
    }

    /// The RestApi construct this method belongs to
    pub fn api_node(&self) -> NodeId {
        self.context.api
    }
}

/// Path parts are plain segments or `{param}` / `{proxy+}` placeholders
fn validate_path_part(part: &str) -> Result<(), String> {
    let is_segment_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');

    if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        let name = inner.strip_suffix('+').unwrap_or(inner);
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Ok(());
        }
    } else if !part.is_empty() && part.chars().all(is_segment_char) {
        return Ok(());
    }

    Err(format!(
        "resource path part '{}' must be alphanumeric (plus '.', '_', '-') or a {{param}} / {{proxy+}} placeholder",
        part
    ))
}
