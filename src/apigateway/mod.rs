//! API gateway constructs
//!
//! Higher-level constructs that each add one or more resources to a
//! [`Stack`](crate::construct::Stack): a REST API with its resource tree,
//! methods, deployment and stage, API keys and usage plans.
//!
//! # Example
//!
//! ```rust
//! use gateway_constructs::apigateway::{
//!     ApiKey, ApiKeyProps, ApiStage, RestApi, RestApiProps, ThrottleSettings, UsagePlan,
//!     UsagePlanProps,
//! };
//! use gateway_constructs::construct::Stack;
//!
//! let mut stack = Stack::new("demo");
//! let api = RestApi::new(
//!     &mut stack,
//!     "my-api",
//!     RestApiProps::new().with_cloud_watch_role(false).with_stage_name("test"),
//! )
//! .unwrap();
//! let method = api.root().add_method(&mut stack, "GET").unwrap();
//! let stage = api.deployment_stage().unwrap().clone();
//!
//! let plan = UsagePlan::new(
//!     &mut stack,
//!     "my-usage-plan",
//!     UsagePlanProps::new()
//!         .with_name("Basic")
//!         .with_api_stage(ApiStage::new(stage).with_method_throttle(
//!             &method,
//!             ThrottleSettings::new().with_burst_limit(0).with_rate_limit(0.0),
//!         )),
//! )
//! .unwrap();
//! let key = ApiKey::new(&mut stack, "my-api-key", ApiKeyProps::new()).unwrap();
//! plan.add_api_key(&mut stack, &key).unwrap();
//!
//! let template = stack.synth().unwrap();
//! assert_eq!(template.count_resources("AWS::ApiGateway::UsagePlanKey"), 1);
//! ```

pub mod api_key;
pub mod deployment;
pub mod resource;
pub mod rest_api;
pub mod usage_plan;

pub use api_key::{ApiKey, ApiKeyProps};
pub use deployment::{Deployment, Stage, StageOptions};
pub use resource::{ApiResource, AuthorizationType, Integration, Method, MethodOptions};
pub use rest_api::{EndpointType, RestApi, RestApiProps};
pub use usage_plan::{
    ApiStage, Period, QuotaSettings, ThrottleSettings, ThrottlingPerMethod, UsagePlan,
    UsagePlanProps,
};

pub const REST_API_TYPE: &str = "AWS::ApiGateway::RestApi";
pub const RESOURCE_TYPE: &str = "AWS::ApiGateway::Resource";
pub const METHOD_TYPE: &str = "AWS::ApiGateway::Method";
pub const DEPLOYMENT_TYPE: &str = "AWS::ApiGateway::Deployment";
pub const STAGE_TYPE: &str = "AWS::ApiGateway::Stage";
pub const ACCOUNT_TYPE: &str = "AWS::ApiGateway::Account";
pub const API_KEY_TYPE: &str = "AWS::ApiGateway::ApiKey";
pub const USAGE_PLAN_TYPE: &str = "AWS::ApiGateway::UsagePlan";
pub const USAGE_PLAN_KEY_TYPE: &str = "AWS::ApiGateway::UsagePlanKey";
pub const IAM_ROLE_TYPE: &str = "AWS::IAM::Role";
