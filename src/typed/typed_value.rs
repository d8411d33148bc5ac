//! TypedValue implementation.

use crate::schema::ElementRelationship;
use crate::value::{Field, FieldList, Value};
use std::collections::BTreeMap;

/// TypedValue is an object tree in which every container node knows its own
/// merge semantics, so no node ever needs to go back to the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Map(TypedMap),
    List(TypedList),
    /// A leaf: null, boolean, number or string.
    Scalar(Value),
}

/// A map or struct node.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedMap {
    pub fields: BTreeMap<String, TypedValue>,
    pub relationship: ElementRelationship,
}

/// A list node. `keys` is non-empty only for keyed associative lists.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedList {
    pub items: Vec<TypedValue>,
    pub relationship: ElementRelationship,
    pub keys: Vec<String>,
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Scalar(Value::Null))
    }

    /// Returns true for atomic maps and atomic lists.
    pub fn is_atomic(&self) -> bool {
        match self {
            TypedValue::Map(m) => m.is_atomic(),
            TypedValue::List(l) => l.is_atomic(),
            TypedValue::Scalar(_) => false,
        }
    }

    /// Returns the associative key fields of a keyed list node.
    pub fn associative_keys(&self) -> Option<&[String]> {
        match self {
            TypedValue::List(l) if l.is_keyed() => Some(&l.keys),
            _ => None,
        }
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypedValue::Map(_) => "map",
            TypedValue::List(_) => "list",
            TypedValue::Scalar(Value::Null) => "null",
            TypedValue::Scalar(_) => "scalar",
        }
    }

    pub fn as_map(&self) -> Option<&TypedMap> {
        match self {
            TypedValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TypedList> {
        match self {
            TypedValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Follows a chain of field names through nested maps.
    pub fn get_path(&self, names: &[&str]) -> Option<&TypedValue> {
        names
            .iter()
            .try_fold(self, |node, name| node.as_map()?.fields.get(*name))
    }
}

impl TypedMap {
    pub fn is_atomic(&self) -> bool {
        self.relationship == ElementRelationship::Atomic
    }
}

impl TypedList {
    pub fn is_atomic(&self) -> bool {
        self.relationship == ElementRelationship::Atomic
    }

    pub fn is_keyed(&self) -> bool {
        self.relationship == ElementRelationship::Associative && !self.keys.is_empty()
    }

    /// Returns true for associative lists of scalars matched by value.
    pub fn is_set(&self) -> bool {
        self.relationship == ElementRelationship::Associative && self.keys.is_empty()
    }

    /// Computes the key of an element of a keyed list. Returns None when the
    /// element is not a map or lacks one of the key fields.
    pub fn key_of(&self, item: &TypedValue) -> Option<FieldList> {
        let map = item.as_map()?;
        let fields = self
            .keys
            .iter()
            .map(|key| match map.fields.get(key) {
                Some(TypedValue::Scalar(value)) => Some(Field {
                    name: key.clone(),
                    value: value.clone(),
                }),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(FieldList::with_fields(fields))
    }
}
