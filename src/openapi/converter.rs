//! Converter from OpenAPI v3 schemas to merge schemas.
//!
//! The `x-kubernetes-*` extensions decide the merge strategy of every
//! container: list type and map keys for lists, map type for maps, and the
//! older patch strategy / merge key pair as a fallback for lists.

use super::schema::{AdditionalProperties, OpenAPIDocument, SchemaV3};
use crate::schema::{
    Atom, ElementRelationship, GroupVersionKind, List, Map as SchemaMap, Scalar, Schema,
    StructField, TypeDef, TypeRef, UNTYPED_ATOMIC, UNTYPED_DEDUCED,
};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Converter from OpenAPI to merge schema.
pub struct OpenAPIConverter<'a> {
    definitions: &'a BTreeMap<String, SchemaV3>,
    /// Errors encountered during conversion.
    errors: Vec<ConversionError>,
}

/// Non-fatal problem found while converting a definition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {message}")]
pub struct ConversionError {
    /// Path to the schema element.
    pub path: String,
    pub message: String,
}

/// Result of OpenAPI conversion.
#[derive(Debug)]
pub struct ConversionResult {
    /// The converted schema, builtin untyped types included.
    pub schema: Schema,
    /// Root type name of every kind declared through
    /// `x-kubernetes-group-version-kind`.
    pub kinds: BTreeMap<GroupVersionKind, String>,
    /// Errors encountered during conversion (non-fatal).
    pub errors: Vec<ConversionError>,
}

impl ConversionResult {
    /// Returns a reference to the root type of `gvk`, if the document declares it.
    pub fn root_for(&self, gvk: &GroupVersionKind) -> Option<TypeRef> {
        self.kinds.get(gvk).map(TypeRef::named)
    }
}

impl<'a> OpenAPIConverter<'a> {
    pub fn new(doc: &'a OpenAPIDocument) -> Self {
        OpenAPIConverter {
            definitions: &doc.components.schemas,
            errors: Vec::new(),
        }
    }

    /// Converts every component schema of the document.
    pub fn convert(mut self) -> ConversionResult {
        let mut types = Vec::with_capacity(self.definitions.len());
        let mut kinds = BTreeMap::new();

        for (name, definition) in self.definitions {
            for gvk in definition.x_kubernetes_group_version_kind.iter().flatten() {
                kinds.insert(gvk.clone(), name.clone());
            }
            let atom = self.definition_atom(name, definition);
            types.push(TypeDef {
                name: name.clone(),
                atom,
            });
        }

        ConversionResult {
            schema: Schema::with_types(types).with_untyped_types(),
            kinds,
            errors: self.errors,
        }
    }

    /// A named definition must be an atom, so references are followed to
    /// the schema they point at.
    fn definition_atom(&mut self, name: &str, definition: &SchemaV3) -> Atom {
        let definitions = self.definitions;
        let mut seen = HashSet::new();
        let mut current = definition;
        while let Some(target) = single_ref(current) {
            let target_name = type_name_from_ref(target);
            if !seen.insert(target_name.clone()) {
                self.add_error(name, "reference cycle");
                return untyped_atom();
            }
            match definitions.get(&target_name) {
                Some(next) => current = next,
                None => {
                    self.add_error(name, &format!("unresolved reference {target}"));
                    return untyped_atom();
                }
            }
        }
        self.schema_to_atom(current, name)
    }

    fn schema_to_type_ref(&mut self, schema: &SchemaV3, path: &str) -> TypeRef {
        if let Some(target) = single_ref(schema) {
            return TypeRef {
                named_type: Some(type_name_from_ref(target)),
                element_relationship: relationship_override(schema),
                ..Default::default()
            };
        }
        if schema.is_untyped() && schema.properties.is_empty() {
            return TypeRef::named(UNTYPED_DEDUCED);
        }
        TypeRef::inline(self.schema_to_atom(schema, path))
    }

    fn schema_to_atom(&mut self, schema: &SchemaV3, path: &str) -> Atom {
        if let Some(all_of) = schema.all_of.as_deref().filter(|s| s.len() > 1) {
            return self.merge_all_of(schema, all_of, path);
        }

        if let Some(first) = schema
            .any_of
            .as_deref()
            .or(schema.one_of.as_deref())
            .and_then(|s| s.first())
        {
            return self.schema_to_atom(first, path);
        }

        if schema.x_kubernetes_int_or_string == Some(true) {
            return Atom {
                scalar: Some(Scalar::Untyped),
                ..Default::default()
            };
        }

        if schema.is_untyped() && schema.properties.is_empty() {
            return untyped_atom();
        }

        match schema.schema_type.as_deref().unwrap_or("") {
            "string" => scalar_atom(Scalar::String),
            "integer" | "number" => scalar_atom(Scalar::Numeric),
            "boolean" => scalar_atom(Scalar::Boolean),
            "array" => self.convert_array(schema, path),
            "object" | "" => self.convert_object(schema, path),
            other => {
                self.add_error(path, &format!("unknown type: {other}"));
                scalar_atom(Scalar::Untyped)
            }
        }
    }

    fn convert_array(&mut self, schema: &SchemaV3, path: &str) -> Atom {
        let element_type = match schema.items {
            Some(ref items) => self.schema_to_type_ref(items, &format!("{path}[]")),
            None => TypeRef::named(UNTYPED_ATOMIC),
        };

        let (element_relationship, keys) = list_strategy(schema);
        if element_relationship == ElementRelationship::Associative
            && keys.is_empty()
            && schema.x_kubernetes_list_type.as_deref() == Some("map")
        {
            self.add_error(path, "list-type map without list-map-keys");
        }

        Atom {
            list: Some(List {
                element_type,
                element_relationship,
                keys,
            }),
            ..Default::default()
        }
    }

    fn convert_object(&mut self, schema: &SchemaV3, path: &str) -> Atom {
        let element_relationship = match schema.x_kubernetes_map_type.as_deref() {
            Some("atomic") => ElementRelationship::Atomic,
            _ => ElementRelationship::Separable,
        };

        let element_type = if schema.is_untyped() {
            TypeRef::named(UNTYPED_DEDUCED)
        } else {
            match schema.additional_properties.as_deref() {
                Some(AdditionalProperties::Schema(s)) => self.schema_to_type_ref(s, &format!("{path}.*")),
                Some(AdditionalProperties::Bool(true)) => TypeRef::named(UNTYPED_DEDUCED),
                // A bare object without properties is free-form.
                None if schema.properties.is_empty() => TypeRef::named(UNTYPED_DEDUCED),
                _ => TypeRef::default(),
            }
        };

        let fields = schema
            .properties
            .iter()
            .map(|(name, property)| {
                let field_type = self.schema_to_type_ref(property, &format!("{path}.{name}"));
                StructField::new(name.clone(), field_type)
            })
            .collect();

        let mut map = SchemaMap::with_fields(fields);
        map.element_type = element_type;
        map.element_relationship = element_relationship;
        Atom {
            map: Some(map),
            ..Default::default()
        }
    }

    /// allOf with several members: properties of every member are unioned.
    fn merge_all_of(&mut self, schema: &SchemaV3, members: &[SchemaV3], path: &str) -> Atom {
        let definitions = self.definitions;
        let mut merged = SchemaV3 {
            schema_type: Some("object".to_string()),
            x_kubernetes_map_type: schema.x_kubernetes_map_type.clone(),
            properties: schema.properties.clone(),
            ..Default::default()
        };
        for member in members {
            let member = match member.ref_path {
                Some(ref target) => match definitions.get(&type_name_from_ref(target)) {
                    Some(definition) => definition,
                    None => {
                        self.add_error(path, &format!("unresolved reference {target}"));
                        continue;
                    }
                },
                None => member,
            };
            for (name, property) in &member.properties {
                merged.properties.insert(name.clone(), property.clone());
            }
        }
        self.convert_object(&merged, path)
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ConversionError {
            path: path.to_string(),
            message: message.to_string(),
        });
    }
}

/// Convert an OpenAPI document to a merge schema.
pub fn convert_openapi_to_schema(doc: &OpenAPIDocument) -> ConversionResult {
    OpenAPIConverter::new(doc).convert()
}

/// Returns the target of a plain `$ref` or of a single-element `allOf`
/// wrapping one.
fn single_ref(schema: &SchemaV3) -> Option<&str> {
    if let Some(ref target) = schema.ref_path {
        return Some(target);
    }
    match schema.all_of.as_deref() {
        Some([only]) if only.properties.is_empty() => only.ref_path.as_deref(),
        _ => None,
    }
}

fn relationship_override(schema: &SchemaV3) -> Option<ElementRelationship> {
    match schema.x_kubernetes_map_type.as_deref() {
        Some("atomic") => Some(ElementRelationship::Atomic),
        Some("granular") => Some(ElementRelationship::Separable),
        _ => None,
    }
}

fn list_strategy(schema: &SchemaV3) -> (ElementRelationship, Vec<String>) {
    match schema.x_kubernetes_list_type.as_deref() {
        Some("atomic") => (ElementRelationship::Atomic, Vec::new()),
        Some("set") => (ElementRelationship::Associative, Vec::new()),
        Some("map") => (
            ElementRelationship::Associative,
            schema.x_kubernetes_list_map_keys.clone().unwrap_or_default(),
        ),
        _ => match schema.x_kubernetes_patch_strategy.as_deref() {
            Some(strategy) if strategy.split(',').any(|s| s == "merge") => (
                ElementRelationship::Associative,
                schema.x_kubernetes_patch_merge_key.iter().cloned().collect(),
            ),
            _ => (ElementRelationship::Atomic, Vec::new()),
        },
    }
}

fn type_name_from_ref(ref_path: &str) -> String {
    ref_path
        .strip_prefix("#/components/schemas/")
        .or_else(|| ref_path.rsplit('/').next())
        .unwrap_or(ref_path)
        .to_string()
}

fn scalar_atom(scalar: Scalar) -> Atom {
    Atom {
        scalar: Some(scalar),
        ..Default::default()
    }
}

/// The shape of `__untyped_deduced_`, for definitions that are free-form.
fn untyped_atom() -> Atom {
    Atom {
        scalar: Some(Scalar::Untyped),
        list: Some(List {
            element_type: TypeRef::named(UNTYPED_ATOMIC),
            element_relationship: ElementRelationship::Atomic,
            keys: Vec::new(),
        }),
        map: Some(SchemaMap::with_element_type_and_relationship(
            TypeRef::named(UNTYPED_DEDUCED),
            ElementRelationship::Separable,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r##"
openapi: 3.0.0
info:
  title: Kubernetes
  version: v1.31.0
components:
  schemas:
    io.k8s.api.apps.v1.Deployment:
      type: object
      properties:
        apiVersion:
          type: string
        kind:
          type: string
        metadata:
          allOf:
          - $ref: '#/components/schemas/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta'
        spec:
          allOf:
          - $ref: '#/components/schemas/io.k8s.api.apps.v1.DeploymentSpec'
      x-kubernetes-group-version-kind:
      - group: apps
        kind: Deployment
        version: v1
    io.k8s.api.apps.v1.DeploymentSpec:
      type: object
      properties:
        replicas:
          type: integer
          format: int32
        selector:
          allOf:
          - $ref: '#/components/schemas/io.k8s.apimachinery.pkg.apis.meta.v1.LabelSelector'
        template:
          type: object
          properties:
            spec:
              type: object
              properties:
                containers:
                  type: array
                  items:
                    allOf:
                    - $ref: '#/components/schemas/io.k8s.api.core.v1.Container'
                  x-kubernetes-patch-merge-key: name
                  x-kubernetes-patch-strategy: merge
                ports:
                  type: array
                  items:
                    type: object
                    properties:
                      containerPort:
                        type: integer
                      protocol:
                        type: string
                  x-kubernetes-list-type: map
                  x-kubernetes-list-map-keys: [containerPort, protocol]
                finalizers:
                  type: array
                  items:
                    type: string
                  x-kubernetes-list-type: set
    io.k8s.api.core.v1.Container:
      type: object
      properties:
        name:
          type: string
        args:
          type: array
          items:
            type: string
          x-kubernetes-list-type: atomic
        port:
          x-kubernetes-int-or-string: true
    io.k8s.apimachinery.pkg.apis.meta.v1.LabelSelector:
      type: object
      properties:
        matchLabels:
          type: object
          additionalProperties:
            type: string
      x-kubernetes-map-type: atomic
    io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta:
      type: object
      properties:
        labels:
          type: object
          additionalProperties:
            type: string
    io.k8s.apimachinery.pkg.runtime.RawExtension:
      type: object
      x-kubernetes-preserve-unknown-fields: true
"##;

    fn convert() -> ConversionResult {
        let doc = OpenAPIDocument::from_yaml(DOC).unwrap();
        convert_openapi_to_schema(&doc)
    }

    fn map_of<'a>(atom: &'a Atom) -> &'a SchemaMap {
        atom.map.as_ref().unwrap()
    }

    #[test]
    fn test_kinds_index() {
        let result = convert();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let gvk = GroupVersionKind::gvk("apps", "v1", "Deployment");
        assert_eq!(
            result.kinds.get(&gvk).map(String::as_str),
            Some("io.k8s.api.apps.v1.Deployment")
        );
        assert!(result.root_for(&gvk).is_some());
        assert!(result.root_for(&GroupVersionKind::gvk("", "v1", "Pod")).is_none());
    }

    #[test]
    fn test_builtin_untyped_types_appended() {
        let schema = convert().schema;
        assert!(schema.find_named_type(UNTYPED_ATOMIC).is_some());
        assert!(schema.find_named_type(UNTYPED_DEDUCED).is_some());
    }

    #[test]
    fn test_all_of_single_ref_is_unwrapped() {
        let schema = convert().schema;
        let deployment = schema.find_named_type("io.k8s.api.apps.v1.Deployment").unwrap();
        let spec = map_of(&deployment.atom).find_field("spec").unwrap();
        assert_eq!(
            spec.field_type.named_type.as_deref(),
            Some("io.k8s.api.apps.v1.DeploymentSpec")
        );
    }

    #[test]
    fn test_list_strategies() {
        let schema = convert().schema;
        let spec = schema.find_named_type("io.k8s.api.apps.v1.DeploymentSpec").unwrap();
        let template = map_of(&spec.atom).find_field("template").unwrap();
        let pod_spec = map_of(&template.field_type.inlined)
            .find_field("spec")
            .unwrap();
        let pod_spec = map_of(&pod_spec.field_type.inlined);

        let list = |name: &str| {
            pod_spec
                .find_field(name)
                .unwrap()
                .field_type
                .inlined
                .list
                .clone()
                .unwrap()
        };

        let containers = list("containers");
        assert_eq!(containers.element_relationship, ElementRelationship::Associative);
        assert_eq!(containers.keys, vec!["name"]);

        let ports = list("ports");
        assert!(ports.is_keyed());
        assert_eq!(ports.keys, vec!["containerPort", "protocol"]);

        let finalizers = list("finalizers");
        assert_eq!(finalizers.element_relationship, ElementRelationship::Associative);
        assert!(finalizers.keys.is_empty());

        let container = schema.find_named_type("io.k8s.api.core.v1.Container").unwrap();
        let args = map_of(&container.atom).find_field("args").unwrap();
        assert!(args.field_type.inlined.list.as_ref().unwrap().is_atomic());
    }

    #[test]
    fn test_atomic_map_and_int_or_string() {
        let schema = convert().schema;
        let selector = schema
            .find_named_type("io.k8s.apimachinery.pkg.apis.meta.v1.LabelSelector")
            .unwrap();
        assert!(map_of(&selector.atom).is_atomic());

        let container = schema.find_named_type("io.k8s.api.core.v1.Container").unwrap();
        let port = map_of(&container.atom).find_field("port").unwrap();
        assert_eq!(port.field_type.inlined.scalar, Some(Scalar::Untyped));
    }

    #[test]
    fn test_preserve_unknown_fields() {
        let schema = convert().schema;
        let raw = schema
            .find_named_type("io.k8s.apimachinery.pkg.runtime.RawExtension")
            .unwrap();
        assert_eq!(
            map_of(&raw.atom).element_type.named_type.as_deref(),
            Some(UNTYPED_DEDUCED)
        );
        assert!(raw.atom.scalar.is_some());
    }

    #[test]
    fn test_unlisted_array_defaults_to_atomic() {
        let doc = OpenAPIDocument::from_yaml(
            r#"
openapi: 3.0.0
components:
  schemas:
    Thing:
      type: object
      properties:
        values:
          type: array
          items:
            type: string
"#,
        )
        .unwrap();
        let schema = convert_openapi_to_schema(&doc).schema;
        let thing = schema.find_named_type("Thing").unwrap();
        let values = map_of(&thing.atom).find_field("values").unwrap();
        assert!(values.field_type.inlined.list.as_ref().unwrap().is_atomic());
    }

    #[test]
    fn test_unresolved_reference_is_reported() {
        let doc = OpenAPIDocument::from_yaml(
            r##"
openapi: 3.0.0
components:
  schemas:
    Alias:
      $ref: '#/components/schemas/Missing'
"##,
        )
        .unwrap();
        let result = convert_openapi_to_schema(&doc);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "Alias");
    }
}
