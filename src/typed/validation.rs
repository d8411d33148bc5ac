//! Errors raised while typing and merging values.

use crate::fieldpath::Path;
use thiserror::Error;

/// AdaptError reports where a generic value disagrees with its schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdaptError {
    #[error("{path}: type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        path: Path,
        expected: String,
        actual: String,
    },

    #[error("{path}: field not declared in schema: {field}")]
    UnknownField { path: Path, field: String },

    #[error("{path}: associative list element is missing key field {key}")]
    MissingKey { path: Path, key: String },

    #[error("{path}: no type found matching: {name}")]
    UnresolvedType { path: Path, name: String },
}

impl AdaptError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(path: &Path, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        AdaptError::TypeMismatch {
            path: path.clone(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(path: &Path, field: impl Into<String>) -> Self {
        AdaptError::UnknownField {
            path: path.clone(),
            field: field.into(),
        }
    }

    /// Creates a missing key error.
    pub fn missing_key(path: &Path, key: impl Into<String>) -> Self {
        AdaptError::MissingKey {
            path: path.clone(),
            key: key.into(),
        }
    }

    /// Creates an unresolved type error.
    pub fn unresolved_type(path: &Path, name: impl Into<String>) -> Self {
        AdaptError::UnresolvedType {
            path: path.clone(),
            name: name.into(),
        }
    }

    /// Returns the path at which the error occurred.
    pub fn path(&self) -> &Path {
        match self {
            AdaptError::TypeMismatch { path, .. }
            | AdaptError::UnknownField { path, .. }
            | AdaptError::MissingKey { path, .. }
            | AdaptError::UnresolvedType { path, .. } => path,
        }
    }
}

/// MergeConflict means the live object and the patch hold different kinds of
/// node at the same location. It signals a schema/data inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: merge conflict: live value is a {live}, patch value is a {patch}")]
pub struct MergeConflict {
    pub path: Path,
    pub live: &'static str,
    pub patch: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_error_display() {
        let err = AdaptError::type_mismatch(&Path::from_fields(["spec", "replicas"]), "numeric", "string");
        assert_eq!(
            err.to_string(),
            ".spec.replicas: type mismatch: expected numeric, got string"
        );
        assert_eq!(err.path(), &Path::from_fields(["spec", "replicas"]));
    }

    #[test]
    fn test_merge_conflict_display() {
        let err = MergeConflict {
            path: Path::from_fields(["spec"]),
            live: "map",
            patch: "scalar",
        };
        assert!(err.to_string().starts_with(".spec: merge conflict"));
    }
}
