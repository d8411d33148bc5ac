//! # Kube Apply Mutate
//!
//! Schema-aware declarative mutation for Kubernetes admission.
//!
//! A policy expression evaluates to a sparse apply configuration. This crate
//! resolves the schema of the admitted kind, rejects patches that would
//! silently overwrite atomic structures, and merges the rest into the
//! admitted object following each field's merge strategy.
//!
//! ## Modules
//!
//! - [`value`] - Generic form of objects as they arrive in admission requests
//! - [`fieldpath`] - Paths to fields, used in diagnostics
//! - [`schema`] - Merge schema language, resource kinds and schema views
//! - [`openapi`] - OpenAPI v3 documents converted into merge schemas
//! - [`typed`] - Typed value trees, the atomicity check and the merge engine
//! - [`resolver`] - Per-kind schema cache in front of a discovery client
//! - [`mutation`] - Admission glue and the patch applier
//! - [`config`] - Engine configuration

pub mod config;
pub mod fieldpath;
pub mod mutation;
pub mod openapi;
pub mod resolver;
pub mod schema;
pub mod typed;
pub mod value;

pub use config::EngineConfig;
pub use fieldpath::{Path, PathElement};
pub use mutation::{
    AdmissionContext, AdmissionRequest, MutationEngine, MutationError, PatchApplier,
    PatchExpression, PatchRequest,
};
pub use resolver::{SchemaClient, SchemaResolver, StaticSchemaClient};
pub use schema::{GroupVersionKind, KindSchema, ResourceKind, Schema};
pub use typed::TypedValue;
pub use value::Value;
