//! Resource kind identifiers.

use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// GroupVersionKind identifies the type of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

/// GroupVersionResource identifies the REST resource an object is served as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub resource: String,
}

/// ResourceKind pairs an object kind with the resource it is served as.
/// It is the key of the schema cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKind {
    pub gvk: GroupVersionKind,
    pub gvr: GroupVersionResource,
}

impl GroupVersionKind {
    pub fn gvk(group: &str, version: &str, kind: &str) -> Self {
        GroupVersionKind {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Parses an `apiVersion` string (`apps/v1` or `v1`) and a kind.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        GroupVersionKind::gvk(group, version, kind)
    }

    /// Reads `apiVersion` and `kind` from an object, if both are present.
    pub fn from_object(object: &Value) -> Option<Self> {
        let map = object.as_map()?;
        let api_version = map.get("apiVersion")?.as_str()?;
        let kind = map.get("kind")?.as_str()?;
        Some(GroupVersionKind::from_api_version(api_version, kind))
    }

    /// Reads `apiVersion` and `kind` from an object, taking each one that is
    /// absent from `default`. A non-string value is kept in its JSON form so
    /// it never compares equal to a real kind.
    pub fn from_object_or(object: &Value, default: &GroupVersionKind) -> Self {
        let field = |name: &str| {
            object.as_map().and_then(|m| m.get(name)).map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };
        let api_version = field("apiVersion").unwrap_or_else(|| default.api_version());
        let kind = field("kind").unwrap_or_else(|| default.kind.clone());
        GroupVersionKind::from_api_version(&api_version, &kind)
    }

    /// Renders the `apiVersion` field value.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Writes `apiVersion` and `kind` into an object map.
    pub fn stamp(&self, map: &mut Map) {
        map.set("apiVersion", Value::String(self.api_version()));
        map.set("kind", Value::String(self.kind.clone()));
    }
}

impl GroupVersionResource {
    pub fn gvr(group: &str, version: &str, resource: &str) -> Self {
        GroupVersionResource {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }
}

impl ResourceKind {
    pub fn new(gvk: GroupVersionKind, gvr: GroupVersionResource) -> Self {
        ResourceKind { gvk, gvr }
    }

    /// Builds a ResourceKind whose resource name is the lowercased plural of
    /// the kind, which holds for nearly every built-in type.
    pub fn from_gvk(gvk: GroupVersionKind) -> Self {
        let resource = plural_resource(&gvk.kind);
        let gvr = GroupVersionResource::gvr(&gvk.group, &gvk.version, &resource);
        ResourceKind { gvk, gvr }
    }
}

fn plural_resource(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") || lower.ends_with('x') {
        format!("{}es", lower)
    } else if let Some(stem) = lower.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            format!("{}s", lower)
        } else {
            format!("{}ies", stem)
        }
    } else {
        format!("{}s", lower)
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

impl fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Resource={}", self.version, self.resource)
        } else {
            write!(f, "{}/{}, Resource={}", self.group, self.version, self.resource)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gvk)
    }
}
