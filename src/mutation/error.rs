//! Errors returned by the mutation pipeline.

use super::request::EvaluationError;
use crate::fieldpath::{join_paths, Path};
use crate::resolver::ResolveError;
use crate::schema::{GroupVersionKind, ResourceKind};
use crate::typed::{AdaptError, MergeConflict};
use thiserror::Error;

/// MutationError is the outcome of a patch that could not be applied.
///
/// Every variant carries the kind and/or the paths it concerns. Only
/// [`SchemaUnavailable`](MutationError::SchemaUnavailable) is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error(transparent)]
    SchemaUnavailable(#[from] ResolveError),

    #[error("no schema supplied for {kind}")]
    SchemaRequired { kind: ResourceKind },

    #[error("patch kind {patch} does not match object kind {live}")]
    KindMismatch {
        live: GroupVersionKind,
        patch: GroupVersionKind,
    },

    #[error("schema for {schema} cannot type an object of kind {object}")]
    SchemaKindMismatch {
        schema: GroupVersionKind,
        object: GroupVersionKind,
    },

    #[error(transparent)]
    TypeMismatch(#[from] AdaptError),

    #[error("apply configuration may not set fields of atomic structures: {}", join_paths(.paths))]
    AtomicFieldViolation { paths: Vec<Path> },

    #[error("patch expression must evaluate to an object, got {actual}")]
    InvalidPatchType { actual: String },

    #[error(transparent)]
    MergeConflict(#[from] MergeConflict),

    #[error("patch expression failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl MutationError {
    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MutationError::SchemaUnavailable(_))
    }

    /// Paths the error points at, if any.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            MutationError::AtomicFieldViolation { paths } => paths.iter().collect(),
            MutationError::TypeMismatch(err) => vec![err.path()],
            MutationError::MergeConflict(err) => vec![&err.path],
            _ => Vec::new(),
        }
    }

    /// Short machine-readable name of the error category.
    pub fn reason(&self) -> &'static str {
        match self {
            MutationError::SchemaUnavailable(_) => "SchemaUnavailable",
            MutationError::SchemaRequired { .. } => "SchemaRequired",
            MutationError::KindMismatch { .. } => "KindMismatch",
            MutationError::SchemaKindMismatch { .. } => "SchemaKindMismatch",
            MutationError::TypeMismatch(_) => "TypeMismatch",
            MutationError::AtomicFieldViolation { .. } => "AtomicFieldViolation",
            MutationError::InvalidPatchType { .. } => "InvalidPatchType",
            MutationError::MergeConflict(_) => "MergeConflict",
            MutationError::Evaluation(_) => "EvaluationError",
        }
    }
}
