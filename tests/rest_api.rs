//! REST API shape: resources, methods, deployment, stage and outputs

use gateway_constructs::apigateway::{
    ApiKey, ApiKeyProps, RestApi, RestApiProps, StageOptions, DEPLOYMENT_TYPE, METHOD_TYPE,
    STAGE_TYPE,
};
use gateway_constructs::{ConstructError, Stack, StackProps, SynthConfig};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_api_without_methods_fails_validation() {
    let mut stack = Stack::new("test");
    RestApi::new(&mut stack, "my-api", RestApiProps::new()).unwrap();

    let err = stack.synth().unwrap_err();
    assert_eq!(
        err,
        ConstructError::validation("my-api", "the REST API doesn't contain any methods")
    );
}

#[test]
fn test_default_api_shape() {
    let mut stack = Stack::new("test");
    let api = RestApi::new(&mut stack, "my-api", RestApiProps::new()).unwrap();
    api.root().add_method(&mut stack, "GET").unwrap();

    let template = stack.synth().unwrap();
    let ids = template.logical_ids();
    assert_eq!(ids[0], "myapi4C7BF186");
    assert_eq!(ids[1], "myapiCloudWatchRole095452E5");
    assert_eq!(ids[2], "myapiAccountEC421A0A");
    assert!(ids[3].starts_with("myapiDeployment92F2CB49"));
    assert_eq!(ids[4], "myapiDeploymentStageprod298F01AF");
    assert_eq!(ids[5], "myapiGETF990CE3C");

    assert_eq!(
        template.resource("myapiAccountEC421A0A").unwrap(),
        &json!({
            "Type": "AWS::ApiGateway::Account",
            "Properties": {
                "CloudWatchRoleArn": {
                    "Fn::GetAtt": ["myapiCloudWatchRole095452E5", "Arn"]
                }
            },
            "DependsOn": ["myapi4C7BF186"]
        })
    );
    assert_eq!(
        template.resource("myapiGETF990CE3C").unwrap()["Properties"],
        json!({
            "AuthorizationType": "NONE",
            "HttpMethod": "GET",
            "Integration": { "Type": "MOCK" },
            "ResourceId": { "Fn::GetAtt": ["myapi4C7BF186", "RootResourceId"] },
            "RestApiId": { "Ref": "myapi4C7BF186" }
        })
    );
}

#[test]
fn test_endpoint_output() {
    let mut stack = Stack::new("test");
    let api = RestApi::new(
        &mut stack,
        "my-api",
        RestApiProps::new()
            .with_cloud_watch_role(false)
            .with_endpoint_export_name("MyApiUrl"),
    )
    .unwrap();
    api.root().add_method(&mut stack, "GET").unwrap();

    let template = stack.synth().unwrap();
    assert_eq!(
        template.output("myapiEndpoint3628AFE3").unwrap(),
        &json!({
            "Value": {
                "Fn::Join": ["", [
                    "https://",
                    { "Ref": "myapi4C7BF186" },
                    ".execute-api.",
                    { "Ref": "AWS::Region" },
                    ".",
                    { "Ref": "AWS::URLSuffix" },
                    "/",
                    { "Ref": "myapiDeploymentStageprod298F01AF" },
                    "/"
                ]]
            },
            "Export": { "Name": "MyApiUrl" }
        })
    );
}

#[test]
fn test_deployment_tracks_methods_and_resources() {
    let mut stack = Stack::new("test");
    let api = RestApi::new(
        &mut stack,
        "my-api",
        RestApiProps::new().with_cloud_watch_role(false),
    )
    .unwrap();
    let books = api.root().add_resource(&mut stack, "books").unwrap();
    books.add_method(&mut stack, "GET").unwrap();

    let template = stack.synth().unwrap();
    let deployments = template.resources_of_type(DEPLOYMENT_TYPE);
    assert_eq!(deployments.len(), 1);
    let (deployment_id, deployment) = deployments[0];
    assert_eq!(deployment_id.len(), "myapiDeployment92F2CB49".len() + 32);
    assert_eq!(
        deployment["DependsOn"],
        json!(["myapibooks51D54548", "myapibooksGETD6B2F597"])
    );

    // The stage points at the hashed deployment id
    let (_, stage) = template.resources_of_type(STAGE_TYPE)[0];
    assert_eq!(stage["Properties"]["DeploymentId"], json!({ "Ref": deployment_id }));
}

#[test]
fn test_changing_a_method_changes_the_deployment_id() {
    fn deployment_id(http_method: &str) -> String {
        let mut stack = Stack::new("test");
        let api = RestApi::new(
            &mut stack,
            "my-api",
            RestApiProps::new().with_cloud_watch_role(false),
        )
        .unwrap();
        api.root().add_method(&mut stack, http_method).unwrap();
        let template = stack.synth().unwrap();
        template.resources_of_type(DEPLOYMENT_TYPE)[0].0.to_string()
    }

    assert_ne!(deployment_id("GET"), deployment_id("POST"));
    assert_eq!(deployment_id("GET"), deployment_id("GET"));
}

#[test]
fn test_stage_options() {
    let mut stack = Stack::new("test");
    let api = RestApi::new(
        &mut stack,
        "my-api",
        RestApiProps::new().with_cloud_watch_role(false).with_deploy_options(
            StageOptions::new()
                .with_stage_name("beta")
                .with_tracing_enabled(true),
        ),
    )
    .unwrap();
    api.root().add_method(&mut stack, "ANY").unwrap();

    let template = stack.synth().unwrap();
    assert!(template.has_resource_properties(
        STAGE_TYPE,
        &json!({ "StageName": "beta", "TracingEnabled": true })
    ));
    assert_eq!(template.count_resources(METHOD_TYPE), 1);
}

#[test]
fn test_api_key_rendering() {
    let mut stack = Stack::with_props(
        "test",
        StackProps::default().with_description("keys only"),
    );
    ApiKey::new(
        &mut stack,
        "my-api-key",
        ApiKeyProps::new().with_name("gold"),
    )
    .unwrap();

    let config = SynthConfig::new().with_pretty_print(false);
    let json = stack.synth_with_config(&config).unwrap().render(&config).unwrap();
    insta::assert_snapshot!(json, @r#"{"Description":"keys only","Resources":{"myapikey1B052F70":{"Type":"AWS::ApiGateway::ApiKey","Properties":{"Enabled":true,"Name":"gold"}}}}"#);
}
