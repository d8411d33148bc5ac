//! OpenAPI v3 document model.
//!
//! Only the parts that carry structure and merge strategy are modelled;
//! everything else in the document is ignored.

use crate::schema::GroupVersionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// OpenAPI v3 document, as served by `/openapi/v3/apis/<group>/<version>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAPIDocument {
    /// OpenAPI version (should be "3.0.x" or "3.1.x").
    #[serde(default)]
    pub openapi: String,

    /// API info.
    #[serde(default)]
    pub info: Info,

    /// Components section containing schemas.
    #[serde(default)]
    pub components: Components,
}

/// API information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub version: String,
}

/// OpenAPI v3 components section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions.
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaV3>,
}

/// OpenAPI v3 schema definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaV3 {
    /// Schema type (string, integer, number, boolean, array, object).
    #[serde(rename = "type", default)]
    pub schema_type: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Reference to another schema.
    #[serde(rename = "$ref", default)]
    pub ref_path: Option<String>,

    /// Properties for object types.
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaV3>,

    /// Additional properties for map types.
    #[serde(default)]
    pub additional_properties: Option<Box<AdditionalProperties>>,

    /// Items schema for array types.
    #[serde(default)]
    pub items: Option<Box<SchemaV3>>,

    #[serde(default)]
    pub required: Vec<String>,

    /// allOf composition. Kubernetes wraps most `$ref`s in a single-element allOf.
    #[serde(default)]
    pub all_of: Option<Vec<SchemaV3>>,

    #[serde(default)]
    pub any_of: Option<Vec<SchemaV3>>,

    #[serde(default)]
    pub one_of: Option<Vec<SchemaV3>>,

    #[serde(default)]
    pub nullable: Option<bool>,

    #[serde(rename = "x-kubernetes-group-version-kind", default)]
    pub x_kubernetes_group_version_kind: Option<Vec<GroupVersionKind>>,

    /// atomic, set or map.
    #[serde(rename = "x-kubernetes-list-type", default)]
    pub x_kubernetes_list_type: Option<String>,

    #[serde(rename = "x-kubernetes-list-map-keys", default)]
    pub x_kubernetes_list_map_keys: Option<Vec<String>>,

    /// atomic or granular.
    #[serde(rename = "x-kubernetes-map-type", default)]
    pub x_kubernetes_map_type: Option<String>,

    /// merge, replace or retainKeys.
    #[serde(rename = "x-kubernetes-patch-strategy", default)]
    pub x_kubernetes_patch_strategy: Option<String>,

    #[serde(rename = "x-kubernetes-patch-merge-key", default)]
    pub x_kubernetes_patch_merge_key: Option<String>,

    #[serde(rename = "x-kubernetes-preserve-unknown-fields", default)]
    pub x_kubernetes_preserve_unknown_fields: Option<bool>,

    #[serde(rename = "x-kubernetes-int-or-string", default)]
    pub x_kubernetes_int_or_string: Option<bool>,

    #[serde(rename = "x-kubernetes-embedded-resource", default)]
    pub x_kubernetes_embedded_resource: Option<bool>,
}

/// Additional properties can be a boolean or a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(SchemaV3),
}

impl Default for AdditionalProperties {
    fn default() -> Self {
        AdditionalProperties::Bool(true)
    }
}

impl SchemaV3 {
    /// Returns true if the subtree is free-form content.
    pub fn is_untyped(&self) -> bool {
        self.x_kubernetes_preserve_unknown_fields == Some(true)
            || self.x_kubernetes_embedded_resource == Some(true)
    }
}

impl OpenAPIDocument {
    /// Parse an OpenAPI document from JSON.
    pub fn from_json(json: &str) -> Result<Self, OpenAPIParseError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| OpenAPIParseError::InvalidJson(e.to_string()))?;

        Self::from_value(value)
    }

    /// Parse an OpenAPI document from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, OpenAPIParseError> {
        let value: serde_json::Value =
            serde_yaml::from_str(yaml).map_err(|e| OpenAPIParseError::InvalidYaml(e.to_string()))?;

        Self::from_value(value)
    }

    /// Parse an OpenAPI document from a serde_json::Value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, OpenAPIParseError> {
        match value.get("openapi").and_then(|v| v.as_str()) {
            Some(version) if version.starts_with("3.") => serde_json::from_value(value)
                .map_err(|e| OpenAPIParseError::InvalidSchema(e.to_string())),
            Some(version) => Err(OpenAPIParseError::UnsupportedVersion(version.to_string())),
            None => Err(OpenAPIParseError::UnsupportedVersion(String::new())),
        }
    }
}

/// Error type for OpenAPI parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpenAPIParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("unsupported OpenAPI version {0:?}, expected 3.x")]
    UnsupportedVersion(String),
}
