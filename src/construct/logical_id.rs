//! Logical id derivation
//!
//! A logical id is derived from a node's path below its stack: a readable
//! part built from the path components plus a short hash of the full path,
//! so two paths that read the same never collide.

use md5::{Digest, Md5};

use super::error::ConstructError;

/// Path components with this id are skipped entirely
pub const HIDDEN_ID: &str = "Default";

/// Path components with this id are hashed but left out of the readable part
pub const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

const PATH_SEP: &str = "/";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Compute the logical id for a path
///
/// A single component is used as-is (minus non-alphanumerics) so top-level
/// resources keep readable ids.
pub fn make_unique_id(components: &[&str]) -> Result<String, ConstructError> {
    let components: Vec<&str> = components
        .iter()
        .copied()
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    if components.is_empty() {
        return Err(ConstructError::invalid_id(
            "",
            "unable to calculate a unique id for an empty set of components",
        ));
    }

    if components.len() == 1 {
        let candidate = remove_non_alphanumeric(components[0]);
        if candidate.len() <= MAX_ID_LEN {
            return Ok(candidate);
        }
    }

    let hash = path_hash(&components);
    let human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect::<String>()
        .chars()
        .take(MAX_HUMAN_LEN)
        .collect();

    Ok(format!("{}{}", human, hash))
}

/// Hex md5 of serialized values, appended to ids that track content
pub fn content_hash(components: &[serde_json::Value]) -> String {
    let mut hasher = Md5::new();
    for component in components {
        hasher.update(component.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn path_hash(components: &[&str]) -> String {
    let digest = Md5::digest(components.join(PATH_SEP).as_bytes());
    hex::encode(digest)[..HASH_LEN].to_uppercase()
}

/// Drop components already spelled out by the end of the previous one
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut ret: Vec<&'a str> = Vec::new();
    for &component in components {
        match ret.last() {
            Some(last) if last.ends_with(component) => {}
            _ => ret.push(component),
        }
    }
    ret
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_component_is_kept() {
        assert_eq!(make_unique_id(&["my-api-key-2"]).unwrap(), "myapikey2");
    }

    #[test]
    fn test_resource_component_is_hashed_not_shown() {
        assert_eq!(
            make_unique_id(&["my-api", "Resource"]).unwrap(),
            "myapi4C7BF186"
        );
        assert_eq!(
            make_unique_id(&["my-usage-plan", "Resource"]).unwrap(),
            "myusageplan23AA1E32"
        );
    }

    #[test]
    fn test_nested_path() {
        assert_eq!(
            make_unique_id(&["my-api", "DeploymentStage.test", "Resource"]).unwrap(),
            "myapiDeploymentStagetest4A4AB65E"
        );
    }

    #[test]
    fn test_default_components_are_skipped() {
        assert_eq!(
            make_unique_id(&["my-api", "Default", "Resource"]).unwrap(),
            make_unique_id(&["my-api", "Resource"]).unwrap()
        );
    }

    #[test]
    fn test_empty_components_rejected() {
        assert!(make_unique_id(&[]).is_err());
        assert!(make_unique_id(&["Default"]).is_err());
    }

    #[test]
    fn test_remove_dupes() {
        assert_eq!(
            remove_dupes(&["Bucket", "Bucket", "Policy"]),
            vec!["Bucket", "Policy"]
        );
        assert_eq!(remove_dupes(&["MyBucket", "Bucket"]), vec!["MyBucket"]);
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let a = content_hash(&[serde_json::json!({"method": "GET"})]);
        let b = content_hash(&[serde_json::json!({"method": "POST"})]);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
