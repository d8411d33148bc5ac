//! Declaration view: the type shape an expression compiler binds variables to.

use super::elements::{Atom, Scalar, Schema, TypeRef};
use serde::Serialize;
use std::collections::BTreeMap;

/// DeclType describes the type of a value without any merge semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum DeclType {
    Bool,
    Number,
    String,
    /// Any scalar.
    Scalar,
    /// Anything at all; used for untyped and unresolvable content.
    Any,
    List { element: Box<DeclType> },
    Map { element: Box<DeclType> },
    Object { fields: BTreeMap<String, DeclType> },
    /// Reference to an entry of [`DeclarationView::types`].
    Named { name: String },
}

/// DeclarationView holds the root type of a kind plus every named type it
/// references, so recursive schemas stay finite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationView {
    pub root: Option<DeclType>,
    pub types: BTreeMap<String, DeclType>,
}

impl DeclarationView {
    /// Builds the view for the type `root` references.
    pub fn build(schema: &Schema, root: &TypeRef) -> Self {
        let mut view = DeclarationView::default();
        let root_decl = view.decl_of_ref(schema, root);
        view.root = Some(root_decl);
        view
    }

    /// Follows named references until a concrete declaration is found.
    pub fn lookup<'a>(&'a self, decl: &'a DeclType) -> &'a DeclType {
        let mut current = decl;
        let mut hops = 0;
        while let DeclType::Named { name } = current {
            match self.types.get(name) {
                Some(next) if hops < self.types.len() => {
                    current = next;
                    hops += 1;
                }
                _ => break,
            }
        }
        current
    }

    fn decl_of_ref(&mut self, schema: &Schema, tr: &TypeRef) -> DeclType {
        if let (Some(name), None) = (&tr.named_type, tr.element_relationship) {
            if !self.types.contains_key(name) {
                match schema.find_named_type(name) {
                    Some(def) => {
                        // Placeholder first so self-references terminate.
                        self.types.insert(name.clone(), DeclType::Any);
                        let decl = self.decl_of_atom(schema, &def.atom);
                        self.types.insert(name.clone(), decl);
                    }
                    None => return DeclType::Any,
                }
            }
            return DeclType::Named { name: name.clone() };
        }

        match schema.resolve(tr) {
            Some(atom) => self.decl_of_atom(schema, &atom),
            None => DeclType::Any,
        }
    }

    fn decl_of_atom(&mut self, schema: &Schema, atom: &Atom) -> DeclType {
        let shapes = [atom.scalar.is_some(), atom.list.is_some(), atom.map.is_some()];
        if shapes.iter().filter(|s| **s).count() > 1 {
            return DeclType::Any;
        }

        if let Some(scalar) = atom.scalar {
            return match scalar {
                Scalar::Boolean => DeclType::Bool,
                Scalar::Numeric => DeclType::Number,
                Scalar::String => DeclType::String,
                Scalar::Untyped => DeclType::Scalar,
            };
        }

        if let Some(ref list) = atom.list {
            let element = self.decl_of_ref(schema, &list.element_type);
            return DeclType::List {
                element: Box::new(element),
            };
        }

        if let Some(ref map) = atom.map {
            if map.fields.is_empty() {
                let element = if map.element_type.is_empty() {
                    DeclType::Any
                } else {
                    self.decl_of_ref(schema, &map.element_type)
                };
                return DeclType::Map {
                    element: Box::new(element),
                };
            }
            let fields = map
                .fields
                .iter()
                .map(|f| (f.name.clone(), self.decl_of_ref(schema, &f.field_type)))
                .collect();
            return DeclType::Object { fields };
        }

        DeclType::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"types:
- name: node
  map:
    fields:
    - name: name
      type:
        scalar: string
    - name: weight
      type:
        scalar: numeric
    - name: children
      type:
        list:
          elementType:
            namedType: node
          elementRelationship: atomic
    - name: labels
      type:
        map:
          elementType:
            scalar: string
"#;

    #[test]
    fn test_recursive_types_terminate() {
        let schema = Schema::from_yaml(SCHEMA).unwrap();
        let view = DeclarationView::build(&schema, &TypeRef::named("node"));

        assert_eq!(view.root, Some(DeclType::Named { name: "node".into() }));
        let DeclType::Object { fields } = view.lookup(view.root.as_ref().unwrap()) else {
            panic!("node should be an object");
        };
        assert_eq!(fields.get("name"), Some(&DeclType::String));
        assert_eq!(fields.get("weight"), Some(&DeclType::Number));
        assert_eq!(
            fields.get("children"),
            Some(&DeclType::List {
                element: Box::new(DeclType::Named { name: "node".into() })
            })
        );
        assert_eq!(
            fields.get("labels"),
            Some(&DeclType::Map {
                element: Box::new(DeclType::String)
            })
        );
    }

    #[test]
    fn test_unknown_root_is_any() {
        let schema = Schema::new();
        let view = DeclarationView::build(&schema, &TypeRef::named("missing"));
        assert_eq!(view.root, Some(DeclType::Any));
    }
}
