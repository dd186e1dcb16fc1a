//! TOML manifests describing APIs, keys and usage plans
//!
//! A manifest is a declarative alternative to calling the constructs
//! directly. Entries refer to each other by id; those references are
//! checked while building the stack and unknown names are reported with
//! their location in the file and similarly named candidates.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use toml::Spanned;

use crate::apigateway::{
    ApiKey, ApiKeyProps, ApiStage, EndpointType, Method, MethodOptions, QuotaSettings, RestApi,
    RestApiProps, ThrottleSettings, UsagePlan, UsagePlanProps,
};
use crate::construct::{Stack, StackProps};
use crate::error::ManifestError;

/// Maximum edit distance for "did you mean" suggestions
const SUGGESTION_DISTANCE: usize = 3;

/// Root of a manifest file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Template description
    pub description: Option<String>,
    #[serde(default)]
    pub apis: Vec<ApiSpec>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeySpec>,
    #[serde(default)]
    pub usage_plans: Vec<UsagePlanSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSpec {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub cloud_watch_role: Option<bool>,
    pub deploy: Option<bool>,
    pub stage_name: Option<String>,
    #[serde(default)]
    pub endpoint_types: Vec<EndpointType>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    #[serde(default = "root_path")]
    pub path: String,
    pub http_method: String,
    pub api_key_required: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeySpec {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub value: Option<String>,
    pub customer_id: Option<String>,
    /// APIs whose deployment stage the key is bound to
    #[serde(default)]
    pub apis: Vec<Spanned<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsagePlanSpec {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub quota: Option<QuotaSettings>,
    pub throttle: Option<ThrottleSettings>,
    #[serde(default)]
    pub api_stages: Vec<ApiStageSpec>,
    #[serde(default)]
    pub api_keys: Vec<Spanned<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiStageSpec {
    pub api: Spanned<String>,
    #[serde(default)]
    pub throttle: Vec<MethodThrottleSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodThrottleSpec {
    #[serde(default = "root_path")]
    pub path: String,
    pub http_method: Spanned<String>,
    pub burst_limit: Option<u32>,
    pub rate_limit: Option<f64>,
}

fn root_path() -> String {
    "/".to_string()
}

/// An API built from the manifest with the methods it declared
struct BuiltApi {
    api: RestApi,
    methods: Vec<Method>,
}

impl BuiltApi {
    fn find_method(&self, path: &str, http_method: &str) -> Option<&Method> {
        let path = normalize_path(path);
        let http_method = http_method.to_uppercase();
        self.methods
            .iter()
            .find(|m| m.resource_path() == path && m.http_method() == http_method)
    }

    fn method_names(&self) -> Vec<String> {
        self.methods
            .iter()
            .map(|m| method_name(m.http_method(), m.resource_path()))
            .collect()
    }
}

impl Manifest {
    /// Load a manifest from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a manifest from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Build a stack holding every construct the manifest declares
    ///
    /// APIs are created first, then API keys, then usage plans.
    pub fn build(&self, stack_name: &str) -> Result<Stack, ManifestError> {
        let props = StackProps {
            description: self.description.clone(),
        };
        let mut stack = Stack::with_props(stack_name, props);

        let mut apis = BTreeMap::new();
        for spec in &self.apis {
            let built = build_api(&mut stack, spec)?;
            apis.insert(spec.id.clone(), built);
        }

        let mut keys = BTreeMap::new();
        for spec in &self.api_keys {
            let mut props = ApiKeyProps::new();
            props.api_key_name = spec.name.clone();
            props.description = spec.description.clone();
            props.enabled = spec.enabled.unwrap_or(true);
            props.value = spec.value.clone();
            props.customer_id = spec.customer_id.clone();
            for api in &spec.apis {
                props = props.with_resource(lookup(&apis, "API", api)?.api.clone());
            }
            let key = ApiKey::new(&mut stack, &spec.id, props)?;
            keys.insert(spec.id.clone(), key);
        }

        for spec in &self.usage_plans {
            let mut props = UsagePlanProps::new();
            props.name = spec.name.clone();
            props.description = spec.description.clone();
            props.quota = spec.quota;
            props.throttle = spec.throttle;
            for stage_spec in &spec.api_stages {
                props = props.with_api_stage(api_stage(&apis, stage_spec)?);
            }
            let plan = UsagePlan::new(&mut stack, &spec.id, props)?;
            for key in &spec.api_keys {
                plan.add_api_key(&mut stack, lookup(&keys, "API key", key)?)?;
            }
        }

        tracing::debug!(
            apis = self.apis.len(),
            api_keys = self.api_keys.len(),
            usage_plans = self.usage_plans.len(),
            "built stack from manifest"
        );
        Ok(stack)
    }
}

fn build_api(stack: &mut Stack, spec: &ApiSpec) -> Result<BuiltApi, ManifestError> {
    let mut props = RestApiProps::new().with_endpoint_types(spec.endpoint_types.clone());
    props.rest_api_name = spec.name.clone();
    props.description = spec.description.clone();
    if let Some(enabled) = spec.cloud_watch_role {
        props = props.with_cloud_watch_role(enabled);
    }
    if let Some(deploy) = spec.deploy {
        props = props.with_deploy(deploy);
    }
    if let Some(stage_name) = &spec.stage_name {
        props = props.with_stage_name(stage_name.clone());
    }

    let api = RestApi::new(stack, &spec.id, props)?;
    let mut methods = Vec::with_capacity(spec.methods.len());
    for method in &spec.methods {
        let resource = api.root().resource_for_path(stack, &method.path)?;
        let mut options = MethodOptions::new();
        if let Some(required) = method.api_key_required {
            options = options.with_api_key_required(required);
        }
        methods.push(resource.add_method_with_options(stack, &method.http_method, options)?);
    }
    Ok(BuiltApi { api, methods })
}

fn api_stage(
    apis: &BTreeMap<String, BuiltApi>,
    spec: &ApiStageSpec,
) -> Result<ApiStage, ManifestError> {
    let built = lookup(apis, "API", &spec.api)?;
    let stage = built.api.deployment_stage().ok_or_else(|| {
        ManifestError::invalid(
            format!("API '{}' is not deployed and has no stage", spec.api.get_ref()),
            Some(spec.api.span()),
        )
    })?;

    let mut api_stage = ApiStage::new(stage.clone());
    for throttle in &spec.throttle {
        let http_method = throttle.http_method.get_ref();
        let method = built
            .find_method(&throttle.path, http_method)
            .ok_or_else(|| {
                let name = method_name(http_method, &normalize_path(&throttle.path));
                let suggestions = find_similar(&built.method_names(), &name, SUGGESTION_DISTANCE);
                ManifestError::unknown("method", name, Some(throttle.http_method.span()), suggestions)
            })?;
        let settings = ThrottleSettings {
            burst_limit: throttle.burst_limit,
            rate_limit: throttle.rate_limit,
        };
        api_stage = api_stage.with_method_throttle(method, settings);
    }
    Ok(api_stage)
}

/// Resolve a manifest reference, suggesting close matches when it is unknown
fn lookup<'a, T>(
    defined: &'a BTreeMap<String, T>,
    kind: &'static str,
    name: &Spanned<String>,
) -> Result<&'a T, ManifestError> {
    defined.get(name.get_ref()).ok_or_else(|| {
        let candidates: Vec<String> = defined.keys().cloned().collect();
        let suggestions = find_similar(&candidates, name.get_ref(), SUGGESTION_DISTANCE);
        ManifestError::unknown(kind, name.get_ref().clone(), Some(name.span()), suggestions)
    })
}

fn method_name(http_method: &str, path: &str) -> String {
    format!("{} {}", http_method.to_uppercase(), path)
}

/// `books/{id}/` and `/books/{id}` name the same resource
fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (m, n) = (a_chars.len(), b_chars.len());
    if m == 0 || n == 0 {
        return m.max(n);
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut row = vec![0usize; n + 1];
    for i in 1..=m {
        row[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[n]
}

/// Up to three defined names within `max_distance` edits of `target`, closest first
fn find_similar(defined: &[String], target: &str, max_distance: usize) -> Vec<String> {
    let mut candidates: Vec<(&String, usize)> = defined
        .iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist > 0 && dist <= max_distance).then_some((name, dist))
        })
        .collect();

    candidates.sort_by_key(|(_, d)| *d);
    candidates
        .into_iter()
        .map(|(name, _)| name.clone())
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("my-api", "my-api"), 0);
        assert_eq!(levenshtein_distance("my-api", "my-apj"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_sorted_and_limited() {
        let defined: Vec<String> = ["key-a", "key-b", "key-ab", "other", "key"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found = find_similar(&defined, "key-c", 2);
        assert_eq!(found.len(), 3);
        assert!(found[..2].contains(&"key-a".to_string()));
        assert!(!found.contains(&"other".to_string()));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("books/{id}/"), "/books/{id}");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Manifest::from_str("[[apis]]\nid = \"a\"\nstage = \"test\"\n").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_unknown_api_suggests_close_match() {
        let source = r#"
[[apis]]
id = "my-api"
methods = [{ http_method = "GET" }]

[[usage_plans]]
id = "plan"

[[usage_plans.api_stages]]
api = "my-apj"
"#;
        let manifest = Manifest::from_str(source).unwrap();
        let err = manifest.build("Stack").unwrap_err();
        match &err {
            ManifestError::UnknownReference {
                kind,
                name,
                span,
                suggestions,
            } => {
                assert_eq!(*kind, "API");
                assert_eq!(name, "my-apj");
                assert_eq!(suggestions, &vec!["my-api".to_string()]);
                let span = span.clone().unwrap();
                assert!(source[span].contains("my-apj"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method() {
        let source = r#"
[[apis]]
id = "my-api"
stage_name = "test"
methods = [{ path = "/", http_method = "GET" }]

[[usage_plans]]
id = "plan"

[[usage_plans.api_stages]]
api = "my-api"
throttle = [{ path = "/", http_method = "PUT", burst_limit = 1 }]
"#;
        let err = Manifest::from_str(source).unwrap().build("Stack").unwrap_err();
        assert_eq!(err.to_string(), "unknown method 'PUT /'");
        assert_eq!(err.suggestions(), ["GET /".to_string()]);
    }

    #[test]
    fn test_stage_of_undeployed_api() {
        let source = r#"
[[apis]]
id = "my-api"
deploy = false
methods = [{ http_method = "GET" }]

[[usage_plans]]
id = "plan"

[[usage_plans.api_stages]]
api = "my-api"
"#;
        let err = Manifest::from_str(source).unwrap().build("Stack").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));
    }

    #[test]
    fn test_methods_share_resources() {
        let source = r#"
[[apis]]
id = "books"
cloud_watch_role = false
methods = [
    { path = "/books", http_method = "GET" },
    { path = "/books/", http_method = "post" },
]
"#;
        let stack = Manifest::from_str(source).unwrap().build("Stack").unwrap();
        let template = stack.synth().unwrap();
        assert_eq!(template.count_resources("AWS::ApiGateway::Resource"), 1);
        assert_eq!(template.count_resources("AWS::ApiGateway::Method"), 2);
    }
}
