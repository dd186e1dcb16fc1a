//! Gateway Constructs - API gateway building blocks that synthesize deployment templates
//!
//! Constructs (REST APIs, methods, stages, API keys, usage plans) are
//! composed into a [`Stack`](construct::Stack) and synthesized into a
//! declarative JSON template for the provisioning engine. The same
//! composition can be described in a TOML [`Manifest`].
//!
//! # Example
//!
//! ```rust
//! use gateway_constructs::synth_manifest;
//!
//! let template = synth_manifest(r#"
//!     [[apis]]
//!     id = "my-api"
//!     cloud_watch_role = false
//!     stage_name = "test"
//!     methods = [{ path = "/", http_method = "GET" }]
//!
//!     [[usage_plans]]
//!     id = "my-usage-plan"
//!     name = "Basic"
//!
//!     [[usage_plans.api_stages]]
//!     api = "my-api"
//! "#).unwrap();
//! assert!(template.contains("AWS::ApiGateway::UsagePlan"));
//! ```

pub mod apigateway;
pub mod construct;
pub mod error;
pub mod manifest;
pub mod template;

pub use construct::{ConstructError, Stack, StackProps};
pub use error::ManifestError;
pub use manifest::Manifest;
pub use template::{SynthConfig, Template};

use thiserror::Error;

/// Name of the stack built from a manifest
pub const DEFAULT_STACK_NAME: &str = "Stack";

/// Errors that can occur during the synthesis pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// The manifest could not be loaded or built
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The stack failed validation or synthesis
    #[error("synthesis failed: {0}")]
    Construct(#[from] ConstructError),

    #[error("failed to serialize template: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synthesize a TOML manifest into a template with default configuration
pub fn synth_manifest(source: &str) -> Result<String, Error> {
    synth_manifest_with_config(source, &SynthConfig::default())
}

/// Synthesize a TOML manifest into a template
///
/// # Example
///
/// ```rust
/// use gateway_constructs::{synth_manifest_with_config, SynthConfig};
///
/// let config = SynthConfig::new().with_pretty_print(false);
/// let json = synth_manifest_with_config(r#"
///     [[api_keys]]
///     id = "my-api-key"
/// "#, &config).unwrap();
/// assert!(!json.contains('\n'));
/// ```
pub fn synth_manifest_with_config(source: &str, config: &SynthConfig) -> Result<String, Error> {
    let manifest = Manifest::from_str(source)?;
    let stack = manifest.build(DEFAULT_STACK_NAME)?;
    let template = stack.synth_with_config(config)?;
    Ok(template.render(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synth_empty_manifest() {
        let json = synth_manifest("").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "Resources": {} }));
    }

    #[test]
    fn test_description_comes_first() {
        let json = synth_manifest_with_config(
            "description = \"usage plans\"\n[[api_keys]]\nid = \"k\"\n",
            &SynthConfig::new().with_pretty_print(false),
        )
        .unwrap();
        assert!(json.starts_with(r#"{"Description":"usage plans","Resources""#));
    }

    #[test]
    fn test_api_without_methods_fails() {
        let err = synth_manifest("[[apis]]\nid = \"my-api\"\n").unwrap_err();
        assert!(matches!(err, Error::Construct(ConstructError::Validation { .. })));
    }

    #[test]
    fn test_parse_error_is_manifest_error() {
        let err = synth_manifest("[[apis]\n").unwrap_err();
        assert!(matches!(err, Error::Manifest(ManifestError::Parse(_))));
    }
}
