//! Admission requests, the expression boundary and the unit of patch work.

use crate::schema::{GroupVersionKind, GroupVersionResource, KindSchema, ResourceKind};
use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// AdmissionRequest mirrors the `request` of an `admission.k8s.io/v1`
/// AdmissionReview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: String,

    pub kind: GroupVersionKind,

    pub resource: GroupVersionResource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    pub operation: Operation,

    #[serde(default)]
    pub user_info: UserInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    #[default]
    Create,
    Update,
    Delete,
    Connect,
}

/// The requesting user, as authenticated by the API server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

impl AdmissionRequest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The kind and resource the request targets.
    pub fn resource_kind(&self) -> ResourceKind {
        ResourceKind::new(self.kind.clone(), self.resource.clone())
    }
}

/// AdmissionContext is everything a patch expression may look at.
#[derive(Debug, Clone)]
pub struct AdmissionContext<'a> {
    request: &'a AdmissionRequest,
    variables: Map,
}

impl<'a> AdmissionContext<'a> {
    pub fn new(request: &'a AdmissionRequest) -> Self {
        AdmissionContext {
            request,
            variables: Map::new(),
        }
    }

    /// Attaches extra named values, such as a policy's parameters.
    pub fn with_variables(mut self, variables: Map) -> Self {
        self.variables = variables;
        self
    }

    /// The object as it will be persisted, absent on DELETE.
    pub fn object(&self) -> Option<&'a Value> {
        self.request.object.as_ref()
    }

    /// The object as currently persisted, present on UPDATE and DELETE.
    pub fn old_object(&self) -> Option<&'a Value> {
        self.request.old_object.as_ref()
    }

    pub fn kind(&self) -> &'a GroupVersionKind {
        &self.request.kind
    }

    pub fn namespace(&self) -> &'a str {
        &self.request.namespace
    }

    pub fn operation(&self) -> Operation {
        self.request.operation
    }

    pub fn user_info(&self) -> &'a UserInfo {
        &self.request.user_info
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &Map {
        &self.variables
    }
}

/// EvaluationError is reported by the expression boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("compilation error: {0}")]
    Compile(String),

    #[error("evaluation error: {0}")]
    Runtime(String),
}

/// PatchExpression produces the apply configuration for an admission request.
///
/// A compiled policy expression implements this; so does any closure of the
/// right shape.
pub trait PatchExpression: Send + Sync {
    fn evaluate(&self, ctx: &AdmissionContext<'_>) -> Result<Value, EvaluationError>;
}

impl<F> PatchExpression for F
where
    F: Fn(&AdmissionContext<'_>) -> Result<Value, EvaluationError> + Send + Sync,
{
    fn evaluate(&self, ctx: &AdmissionContext<'_>) -> Result<Value, EvaluationError> {
        self(ctx)
    }
}

/// PatchRequest is one unit of work for the applier: a live object, the
/// sparse patch to merge into it and the schema of the target kind.
#[derive(Debug, Clone)]
pub struct PatchRequest {
    pub kind: ResourceKind,
    pub live_kind: GroupVersionKind,
    pub patch_kind: GroupVersionKind,
    pub live: Value,
    pub patch: Value,
    pub schema: Option<Arc<KindSchema>>,
}

impl PatchRequest {
    /// Creates a request against `kind`. The kinds of both objects are read
    /// from their own `apiVersion`/`kind` fields; whichever of the two is
    /// missing is taken from the target.
    pub fn new(kind: ResourceKind, live: Value, patch: Value, schema: Option<Arc<KindSchema>>) -> Self {
        let live_kind = GroupVersionKind::from_object_or(&live, &kind.gvk);
        let patch_kind = GroupVersionKind::from_object_or(&patch, &kind.gvk);
        PatchRequest {
            kind,
            live_kind,
            patch_kind,
            live,
            patch,
            schema,
        }
    }
}
