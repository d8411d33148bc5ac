//! The resolved schema of a single resource kind.

use super::decl::DeclarationView;
use super::elements::{Schema, TypeRef};
use super::kind::ResourceKind;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// KindSchema is what the resolver hands out per resource kind: the type
/// universe the kind lives in plus a reference to its root type.
///
/// It is immutable once built and shared across requests behind an `Arc`.
#[derive(Debug)]
pub struct KindSchema {
    kind: ResourceKind,
    schema: Arc<Schema>,
    root: TypeRef,
    declarations: OnceCell<DeclarationView>,
}

/// MergeView is the schema as the typed adapter and merge engine consume it.
#[derive(Debug, Clone, Copy)]
pub struct MergeView<'a> {
    pub schema: &'a Schema,
    pub root: &'a TypeRef,
}

impl KindSchema {
    pub fn new(kind: ResourceKind, schema: Arc<Schema>, root: TypeRef) -> Self {
        KindSchema {
            kind,
            schema,
            root,
            declarations: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn root(&self) -> &TypeRef {
        &self.root
    }

    /// Returns true if the root type can be found in the schema.
    pub fn is_resolvable(&self) -> bool {
        self.schema.resolve(&self.root).is_some()
    }

    pub fn merge_view(&self) -> MergeView<'_> {
        MergeView {
            schema: &self.schema,
            root: &self.root,
        }
    }

    /// Returns the declaration view, building it on first use.
    pub fn declaration_view(&self) -> &DeclarationView {
        self.declarations
            .get_or_init(|| DeclarationView::build(&self.schema, &self.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeclType, GroupVersionKind};

    #[test]
    fn test_views_share_the_schema() {
        let schema = Arc::new(
            Schema::from_yaml(
                r#"types:
- name: io.k8s.api.core.v1.ConfigMap
  map:
    fields:
    - name: data
      type:
        map:
          elementType:
            scalar: string
"#,
            )
            .unwrap(),
        );
        let kind = ResourceKind::from_gvk(GroupVersionKind::gvk("", "v1", "ConfigMap"));
        let ks = KindSchema::new(
            kind.clone(),
            schema.clone(),
            TypeRef::named("io.k8s.api.core.v1.ConfigMap"),
        );

        assert!(ks.is_resolvable());
        assert_eq!(ks.kind(), &kind);
        assert!(std::ptr::eq(ks.merge_view().schema, schema.as_ref()));

        let view = ks.declaration_view();
        assert!(matches!(
            view.lookup(view.root.as_ref().unwrap()),
            DeclType::Object { .. }
        ));
        assert!(std::ptr::eq(view, ks.declaration_view()));
    }
}
