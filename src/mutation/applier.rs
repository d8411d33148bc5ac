//! The patch applier: adapt, check, merge, convert back.

use super::error::MutationError;
use super::request::{EvaluationError, PatchRequest};
use crate::schema::{GroupVersionKind, KindSchema, ResourceKind};
use crate::typed::{find_atomic_violations, from_typed};
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// PatchApplier merges an apply configuration into a live object.
///
/// It is a pure transform: nothing is mutated and nothing is cached, so one
/// applier can serve any number of concurrent requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchApplier;

impl PatchApplier {
    pub fn new() -> Self {
        PatchApplier
    }

    /// Applies `req.patch` to `req.live`.
    ///
    /// Fails without touching anything if the kinds differ, if no schema is
    /// supplied or it describes another kind, if either object does not fit the schema, if the patch sets
    /// a field of an atomic map or struct, or if the two trees conflict.
    /// The result keeps the live object's `apiVersion` and `kind`.
    #[instrument(skip_all, fields(kind = %req.kind))]
    pub fn apply(&self, req: &PatchRequest) -> Result<Value, MutationError> {
        if req.patch_kind != req.live_kind {
            debug!(live = %req.live_kind, patch = %req.patch_kind, "kind mismatch");
            return Err(MutationError::KindMismatch {
                live: req.live_kind.clone(),
                patch: req.patch_kind.clone(),
            });
        }

        let schema = req.schema.as_deref().ok_or_else(|| {
            debug!("no schema supplied");
            MutationError::SchemaRequired {
                kind: req.kind.clone(),
            }
        })?;
        if schema.kind().gvk != req.live_kind {
            debug!(schema = %schema.kind(), object = %req.live_kind, "schema belongs to another kind");
            return Err(MutationError::SchemaKindMismatch {
                schema: schema.kind().gvk.clone(),
                object: req.live_kind.clone(),
            });
        }
        let view = schema.merge_view();

        let live = view.to_typed(&req.live).map_err(|err| {
            debug!(error = %err, "live object does not fit schema");
            MutationError::TypeMismatch(err)
        })?;
        let patch = view.to_typed(&req.patch).map_err(|err| {
            debug!(error = %err, "patch does not fit schema");
            MutationError::TypeMismatch(err)
        })?;

        let violations = find_atomic_violations(&patch);
        if !violations.is_empty() {
            debug!(count = violations.len(), "patch sets atomic fields");
            return Err(MutationError::AtomicFieldViolation { paths: violations });
        }

        let merged = live.merge(&patch).map_err(|err| {
            debug!(error = %err, "merge conflict");
            MutationError::MergeConflict(err)
        })?;

        let mut result = from_typed(&merged);
        if let (Some(gvk), Some(map)) = (GroupVersionKind::from_object(&req.live), result.as_map_mut()) {
            gvk.stamp(map);
        }
        Ok(result)
    }

    /// Applies the outcome of a patch expression. Anything but an object is
    /// rejected as `InvalidPatchType`.
    pub fn apply_evaluation(
        &self,
        kind: ResourceKind,
        live: Value,
        evaluation: Result<Value, EvaluationError>,
        schema: Option<Arc<KindSchema>>,
    ) -> Result<Value, MutationError> {
        let patch = evaluation?;
        if !patch.is_map() {
            debug!(%kind, actual = patch.type_name(), "patch expression did not yield an object");
            return Err(MutationError::InvalidPatchType {
                actual: patch.type_name().to_string(),
            });
        }
        self.apply(&PatchRequest::new(kind, live, patch, schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::Path;
    use crate::schema::{Schema, TypeRef};
    use crate::typed::{AdaptError, MergeConflict};
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"types:
- name: deployment
  map:
    fields:
    - name: apiVersion
      type:
        scalar: string
    - name: kind
      type:
        scalar: string
    - name: raw
      type:
        namedType: __untyped_deduced_
    - name: metadata
      type:
        map:
          fields:
          - name: name
            type:
              scalar: string
          - name: labels
            type:
              map:
                elementType:
                  scalar: string
    - name: spec
      type:
        map:
          fields:
          - name: replicas
            type:
              scalar: numeric
          - name: selector
            type:
              map:
                elementRelationship: atomic
                fields:
                - name: matchLabels
                  type:
                    map:
                      elementType:
                        scalar: string
"#;

    fn deployment() -> ResourceKind {
        ResourceKind::from_gvk(GroupVersionKind::gvk("apps", "v1", "Deployment"))
    }

    fn schema() -> Arc<KindSchema> {
        Arc::new(KindSchema::new(
            deployment(),
            Arc::new(Schema::from_yaml(SCHEMA).unwrap().with_untyped_types()),
            TypeRef::named("deployment"),
        ))
    }

    fn live() -> Value {
        from_yaml(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
  selector:
    matchLabels:
      app: web
"#,
        )
        .unwrap()
    }

    fn request(patch: &str, schema: Option<Arc<KindSchema>>) -> PatchRequest {
        PatchRequest::new(deployment(), live(), from_yaml(patch).unwrap(), schema)
    }

    #[test]
    fn test_apply_merges_and_keeps_kind() {
        let result = PatchApplier::new()
            .apply(&request(
                "metadata:\n  labels:\n    team: infra\nspec:\n  replicas: 3\n",
                Some(schema()),
            ))
            .unwrap();

        let expected = from_yaml(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels:
    team: infra
spec:
  replicas: 3
  selector:
    matchLabels:
      app: web
"#,
        )
        .unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_kind_mismatch_comes_first() {
        let req = request("apiVersion: apps/v1\nkind: StatefulSet\nspec:\n  bogus: 1\n", None);
        let err = PatchApplier::new().apply(&req).unwrap_err();
        assert_eq!(
            err,
            MutationError::KindMismatch {
                live: GroupVersionKind::gvk("apps", "v1", "Deployment"),
                patch: GroupVersionKind::gvk("apps", "v1", "StatefulSet"),
            }
        );
        assert_eq!(req.live, live());
    }

    #[test]
    fn test_kind_without_api_version_is_compared() {
        let req = request("kind: StatefulSet\nspec:\n  replicas: 7\n", Some(schema()));
        assert_eq!(req.patch_kind, GroupVersionKind::gvk("apps", "v1", "StatefulSet"));

        let err = PatchApplier::new().apply(&req).unwrap_err();
        assert_eq!(
            err,
            MutationError::KindMismatch {
                live: GroupVersionKind::gvk("apps", "v1", "Deployment"),
                patch: GroupVersionKind::gvk("apps", "v1", "StatefulSet"),
            }
        );
    }

    #[test]
    fn test_schema_of_another_kind_is_rejected() {
        let config_map = ResourceKind::from_gvk(GroupVersionKind::gvk("", "v1", "ConfigMap"));
        let free_form = Arc::new(KindSchema::new(
            config_map,
            Arc::new(Schema::new().with_untyped_types()),
            TypeRef::named(crate::schema::UNTYPED_DEDUCED),
        ));

        let err = PatchApplier::new()
            .apply(&request(
                "spec:\n  selector:\n    matchLabels:\n      c: d\n",
                Some(free_form),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            MutationError::SchemaKindMismatch {
                schema: GroupVersionKind::gvk("", "v1", "ConfigMap"),
                object: GroupVersionKind::gvk("apps", "v1", "Deployment"),
            }
        );
        assert_eq!(err.reason(), "SchemaKindMismatch");
    }

    #[test]
    fn test_merge_conflict_is_verbatim() {
        let live = from_yaml("apiVersion: apps/v1\nkind: Deployment\nraw:\n  x:\n    y: 1\n").unwrap();
        let patch = from_yaml("raw:\n  x: flat\n").unwrap();

        let err = PatchApplier::new()
            .apply(&PatchRequest::new(deployment(), live, patch, Some(schema())))
            .unwrap_err();
        assert_eq!(
            err,
            MutationError::MergeConflict(MergeConflict {
                path: Path::from_fields(["raw", "x"]),
                live: "map",
                patch: "scalar",
            })
        );
        assert_eq!(err.paths(), vec![&Path::from_fields(["raw", "x"])]);
    }

    #[test]
    fn test_null_replaces_atomic_struct() {
        let result = PatchApplier::new()
            .apply(&request("spec:\n  selector: null\n", Some(schema())))
            .unwrap();
        let spec = result.as_map().and_then(|m| m.get("spec")).and_then(Value::as_map).unwrap();
        assert_eq!(spec.get("selector"), Some(&Value::Null));
        assert_eq!(spec.get("replicas"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_missing_schema_before_conversion() {
        // The patch would not type either; the schema check must win.
        let err = PatchApplier::new()
            .apply(&request("spec:\n  bogus: 1\n", None))
            .unwrap_err();
        assert_eq!(err, MutationError::SchemaRequired { kind: deployment() });
    }

    #[test]
    fn test_type_mismatch_is_verbatim() {
        let err = PatchApplier::new()
            .apply(&request("spec:\n  replicas: three\n", Some(schema())))
            .unwrap_err();
        assert_eq!(
            err,
            MutationError::TypeMismatch(AdaptError::type_mismatch(
                &Path::from_fields(["spec", "replicas"]),
                "numeric",
                "string"
            ))
        );
    }

    #[test]
    fn test_atomic_struct_rejected() {
        let err = PatchApplier::new()
            .apply(&request(
                "spec:\n  selector:\n    matchLabels:\n      app: other\n",
                Some(schema()),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            MutationError::AtomicFieldViolation {
                paths: vec![Path::from_fields(["spec", "selector"])]
            }
        );
        assert_eq!(
            err.to_string(),
            "apply configuration may not set fields of atomic structures: .spec.selector"
        );
    }

    #[test]
    fn test_apply_is_idempotent() {
        let req = request("spec:\n  replicas: 5\n", Some(schema()));
        let applier = PatchApplier::new();
        let first = applier.apply(&req).unwrap();
        let second = applier.apply(&req).unwrap();
        assert_eq!(first, second);

        let again = applier
            .apply(&PatchRequest::new(deployment(), first.clone(), req.patch.clone(), Some(schema())))
            .unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_apply_evaluation() {
        let applier = PatchApplier::new();

        let err = applier
            .apply_evaluation(deployment(), live(), Ok(Value::from("not an object")), Some(schema()))
            .unwrap_err();
        assert_eq!(
            err,
            MutationError::InvalidPatchType {
                actual: "string".to_string()
            }
        );

        let err = applier
            .apply_evaluation(
                deployment(),
                live(),
                Err(EvaluationError::Runtime("no such key: image".into())),
                Some(schema()),
            )
            .unwrap_err();
        assert!(matches!(err, MutationError::Evaluation(_)));

        let result = applier
            .apply_evaluation(
                deployment(),
                live(),
                Ok(from_yaml("spec:\n  replicas: 2\n").unwrap()),
                Some(schema()),
            )
            .unwrap();
        assert_eq!(
            result.as_map().and_then(|m| m.get("spec")).and_then(|s| s.as_map()).and_then(|s| s.get("replicas")),
            Some(&Value::Int(2))
        );
    }
}
