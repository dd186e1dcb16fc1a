//! Error types for construction and synthesis

use thiserror::Error;

/// Errors raised while building the tree or synthesizing it
///
/// Every variant is fatal: synthesis emits a complete template or nothing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstructError {
    /// Construct id that cannot be used
    #[error("invalid construct id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// Two siblings with the same construct id
    #[error("there is already a construct with id '{id}' in '{parent}'")]
    DuplicateId { parent: String, id: String },

    /// A construct rejected its own configuration
    #[error("validation failed for '{path}': {message}")]
    Validation { path: String, message: String },

    /// A property refers to something that has no template entry
    #[error("unresolved reference from '{from}' to '{target}'")]
    UnresolvedReference { from: String, target: String },

    /// Two template entries derived the same logical id
    #[error("logical id '{logical_id}' is used by both '{first}' and '{second}'")]
    DuplicateLogicalId {
        logical_id: String,
        first: String,
        second: String,
    },

    /// A node handle from another stack
    #[error("node does not belong to stack '{stack}'")]
    ForeignNode { stack: String },
}

impl ConstructError {
    /// Create an invalid id error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(parent: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            parent: parent.into(),
            id: id.into(),
        }
    }

    /// Create a validation error for the construct at `path`
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved(from: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            from: from.into(),
            target: target.into(),
        }
    }

    /// Construct path the error is about, if it names one
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::DuplicateId { parent, .. } => Some(parent),
            Self::Validation { path, .. } => Some(path),
            Self::UnresolvedReference { from, .. } => Some(from),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_id_display() {
        let err = ConstructError::duplicate_id("my-api", "GET");
        assert!(err.to_string().contains("'GET'"));
        assert_eq!(err.path(), Some("my-api"));
    }

    #[test]
    fn test_validation_display() {
        let err = ConstructError::validation("my-api", "no methods");
        assert_eq!(err.to_string(), "validation failed for 'my-api': no methods");
    }

    #[test]
    fn test_logical_id_collision_display() {
        let err = ConstructError::DuplicateLogicalId {
            logical_id: "ab".to_string(),
            first: "a-b".to_string(),
            second: "ab".to_string(),
        };
        assert!(err.to_string().contains("'a-b' and 'ab'"));
        assert_eq!(err.path(), None);
    }
}
