//! Usage plans: who may call which stage, how often

use serde::Deserialize;

use crate::construct::{CfnResource, ConstructError, NodeId, Properties, Stack, Value};

use super::api_key::ApiKey;
use super::deployment::Stage;
use super::resource::Method;
use super::{USAGE_PLAN_KEY_TYPE, USAGE_PLAN_TYPE};

const USAGE_PLAN_KEY_ID: &str = "UsagePlanKeyResource";

/// Time period a quota applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "DAY",
            Period::Week => "WEEK",
            Period::Month => "MONTH",
        }
    }
}

/// Request rate limits
///
/// A limit of zero is meaningful (the method is blocked) and is emitted;
/// an unset limit is left out of the template.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleSettings {
    pub burst_limit: Option<u32>,
    /// Steady-state requests per second
    pub rate_limit: Option<f64>,
}

impl ThrottleSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_burst_limit(mut self, limit: u32) -> Self {
        self.burst_limit = Some(limit);
        self
    }

    pub fn with_rate_limit(mut self, limit: f64) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    fn validate(&self, path: &str) -> Result<(), ConstructError> {
        match self.rate_limit {
            Some(rate) if !rate.is_finite() || rate < 0.0 => Err(ConstructError::validation(
                path,
                format!("rate limit must be a non-negative number, got {}", rate),
            )),
            _ => Ok(()),
        }
    }

    fn to_value(self) -> Value {
        Properties::new()
            .with_opt("BurstLimit", self.burst_limit)
            .with_opt("RateLimit", self.rate_limit)
            .into()
    }
}

/// Number of requests allowed per period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaSettings {
    pub limit: Option<u32>,
    /// Requests subtracted from the limit in the first period
    pub offset: Option<u32>,
    pub period: Option<Period>,
}

impl QuotaSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    fn to_value(self) -> Value {
        Properties::new()
            .with_opt("Limit", self.limit)
            .with_opt("Offset", self.offset)
            .with_opt("Period", self.period.map(|p| p.as_str()))
            .into()
    }
}

/// Throttle override for a single method
#[derive(Debug, Clone)]
pub struct ThrottlingPerMethod {
    pub method: Method,
    pub throttle: ThrottleSettings,
}

/// A stage the plan grants access to, with optional per-method limits
#[derive(Debug, Clone)]
pub struct ApiStage {
    pub stage: Stage,
    pub throttle: Vec<ThrottlingPerMethod>,
}

impl ApiStage {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            throttle: Vec::new(),
        }
    }

    pub fn with_method_throttle(mut self, method: &Method, throttle: ThrottleSettings) -> Self {
        self.throttle.push(ThrottlingPerMethod {
            method: method.clone(),
            throttle,
        });
        self
    }

    fn to_value(&self, path: &str) -> Result<Value, ConstructError> {
        let mut table = Properties::new();
        for entry in &self.throttle {
            if entry.method.api_node() != self.stage.api_node() {
                return Err(ConstructError::validation(
                    path,
                    format!(
                        "method '{}' does not belong to the API of stage '{}'",
                        entry.method.throttle_key(),
                        self.stage.stage_name()
                    ),
                ));
            }
            entry.throttle.validate(path)?;
            table.set(entry.method.throttle_key(), entry.throttle.to_value());
        }

        Ok(Properties::new()
            .with("ApiId", self.stage.rest_api_id())
            .with("Stage", self.stage.stage_ref())
            .with_opt("Throttle", (!table.is_empty()).then_some(table))
            .into())
    }
}

/// Properties for [`UsagePlan::new`]
#[derive(Debug, Clone, Default)]
pub struct UsagePlanProps {
    pub name: Option<String>,
    pub description: Option<String>,
    pub api_stages: Vec<ApiStage>,
    pub quota: Option<QuotaSettings>,
    /// Limits for every method the plan covers
    pub throttle: Option<ThrottleSettings>,
}

impl UsagePlanProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_api_stage(mut self, stage: ApiStage) -> Self {
        self.api_stages.push(stage);
        self
    }

    pub fn with_quota(mut self, quota: QuotaSettings) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleSettings) -> Self {
        self.throttle = Some(throttle);
        self
    }
}

/// A usage plan
#[derive(Debug, Clone)]
pub struct UsagePlan {
    node: NodeId,
    resource: NodeId,
}

impl UsagePlan {
    /// Create a usage plan at the top of the stack
    pub fn new(stack: &mut Stack, id: &str, props: UsagePlanProps) -> Result<Self, ConstructError> {
        let scope = stack.root();
        Self::new_in(stack, scope, id, props)
    }

    pub fn new_in(
        stack: &mut Stack,
        scope: NodeId,
        id: &str,
        props: UsagePlanProps,
    ) -> Result<Self, ConstructError> {
        let path = stack.child_path(scope, id);
        if let Some(throttle) = &props.throttle {
            throttle.validate(&path)?;
        }
        let api_stages = props
            .api_stages
            .iter()
            .map(|stage| stage.to_value(&path))
            .collect::<Result<Vec<_>, _>>()?;

        let node = stack.add_child(scope, id)?;
        let properties = Properties::new()
            .with_opt("ApiStages", (!api_stages.is_empty()).then_some(api_stages))
            .with_opt("Description", props.description)
            .with_opt("Quota", props.quota.map(QuotaSettings::to_value))
            .with_opt("Throttle", props.throttle.map(ThrottleSettings::to_value))
            .with_opt("UsagePlanName", props.name);
        let resource = stack.add_resource(
            node,
            "Resource",
            CfnResource::new(USAGE_PLAN_TYPE, properties),
        )?;

        tracing::debug!(path = %stack.path(node), stages = props.api_stages.len(), "created usage plan");
        Ok(Self { node, resource })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Reference to the `AWS::ApiGateway::UsagePlan` resource
    pub fn usage_plan_id(&self) -> Value {
        Value::reference(self.resource)
    }

    /// Grant access to another stage
    pub fn add_api_stage(&self, stack: &mut Stack, stage: ApiStage) -> Result<(), ConstructError> {
        let path = stack.path(self.node);
        let value = stage.to_value(&path)?;
        if !stack.resource_mut(self.resource)?.properties.push("ApiStages", value) {
            return Err(ConstructError::validation(path, "ApiStages is not a list"));
        }
        Ok(())
    }

    /// Associate an API key with this plan
    ///
    /// Returns the `AWS::ApiGateway::UsagePlanKey` node.
    pub fn add_api_key(&self, stack: &mut Stack, key: &ApiKey) -> Result<NodeId, ConstructError> {
        let id = if stack.find_child(self.node, USAGE_PLAN_KEY_ID).is_some() {
            format!("{}:{}", USAGE_PLAN_KEY_ID, stack.unique_id(key.node())?)
        } else {
            USAGE_PLAN_KEY_ID.to_string()
        };
        let properties = Properties::new()
            .with("KeyId", key.key_id())
            .with("KeyType", "API_KEY")
            .with("UsagePlanId", self.usage_plan_id());
        let node = stack.add_resource(
            self.node,
            &id,
            CfnResource::new(USAGE_PLAN_KEY_TYPE, properties),
        )?;
        tracing::debug!(plan = %stack.path(self.node), key = %stack.path(key.node()), "added API key to usage plan");
        Ok(node)
    }
}
