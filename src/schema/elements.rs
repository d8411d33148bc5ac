//! Core schema elements and type definitions.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// Name of the builtin type whose containers are all atomic.
pub const UNTYPED_ATOMIC: &str = "__untyped_atomic_";
/// Name of the builtin type whose maps are separable and lists atomic.
pub const UNTYPED_DEDUCED: &str = "__untyped_deduced_";

/// Schema is a list of named types.
///
/// Schema types are indexed in a map before the first search so this type
/// should be considered immutable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDef>,

    #[serde(skip)]
    type_map: OnceCell<HashMap<String, usize>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema::with_types(self.types.clone())
    }
}

/// TypeDef represents a named type in a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDef {
    /// Top level types should be named. Every type must have a unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub atom: Atom,
}

/// TypeRef either refers to a named type or declares an inlined type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRef {
    /// Reference to named type in schema.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "namedType")]
    pub named_type: Option<String>,

    /// Inline type definition.
    #[serde(flatten)]
    pub inlined: Box<Atom>,

    /// If this reference refers to a map-type or list-type, this field overrides
    /// the `ElementRelationship` of the referred type when resolved.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "elementRelationship"
    )]
    pub element_relationship: Option<ElementRelationship>,
}

/// Atom represents the smallest possible pieces of the type system.
/// Each set field in the Atom represents a possible type for the object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Atom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<List>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Map>,
}

/// Scalar (AKA "primitive") represents a type which has a single value which is
/// either numeric, string, or boolean, or untyped for any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Numeric,
    String,
    Boolean,
    Untyped,
}

impl Scalar {
    pub fn name(&self) -> &'static str {
        match self {
            Scalar::Numeric => "numeric",
            Scalar::String => "string",
            Scalar::Boolean => "boolean",
            Scalar::Untyped => "scalar",
        }
    }
}

/// ElementRelationship is an enum of the different possible relationships
/// between the elements of container types (maps, lists).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRelationship {
    /// Associative only applies to lists: elements are matched by key
    /// (or by value when the list has no keys).
    Associative,
    /// Atomic makes container types (lists, maps) behave as scalars / leaf fields.
    Atomic,
    /// Separable means the items of the container type have no particular
    /// relationship (default behavior for maps).
    #[default]
    Separable,
}

/// Map is a key-value pair. Maps may also represent a type which is composed
/// of a number of different fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Map {
    /// Each struct field appears exactly once in this list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<StructField>,

    /// ElementType is the type of the struct's unknown fields.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the map's items.
    #[serde(
        default,
        skip_serializing_if = "is_default_element_relationship",
        rename = "elementRelationship"
    )]
    pub element_relationship: ElementRelationship,

    #[serde(skip)]
    field_map: OnceCell<HashMap<String, usize>>,
}

fn is_default_element_relationship(er: &ElementRelationship) -> bool {
    *er == ElementRelationship::Separable
}

/// StructField pairs a field name with a field type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructField {
    /// Name is the field name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Type is the field type.
    #[serde(default, rename = "type")]
    pub field_type: TypeRef,
}

/// List represents a type which contains zero or more elements, all of the
/// same subtype.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct List {
    /// ElementType is the type of the list's elements.
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,

    /// ElementRelationship states the relationship between the list's elements.
    #[serde(default, rename = "elementRelationship")]
    pub element_relationship: ElementRelationship,

    /// Keys lists the fields of the element's map type which are to be used
    /// as the keys of the list (for associative lists).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Schema::default()
    }

    /// Creates a schema with the given type definitions.
    pub fn with_types(types: Vec<TypeDef>) -> Self {
        Schema {
            types,
            type_map: OnceCell::new(),
        }
    }

    /// Parses a schema from its YAML form.
    pub fn from_yaml(yaml: &str) -> Result<Schema, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// FindNamedType returns the referenced TypeDef, if it exists.
    pub fn find_named_type(&self, name: &str) -> Option<&TypeDef> {
        let index = self.type_map.get_or_init(|| {
            self.types
                .iter()
                .enumerate()
                .map(|(i, t)| (t.name.clone(), i))
                .collect()
        });
        index.get(name).and_then(|&i| self.types.get(i))
    }

    /// Resolve returns the atom referenced, whether it is inline or named,
    /// with the reference's relationship override applied.
    /// Returns None if the type can't be resolved.
    pub fn resolve<'a>(&'a self, tr: &'a TypeRef) -> Option<Cow<'a, Atom>> {
        let atom = match tr.named_type {
            Some(ref named) => &self.find_named_type(named)?.atom,
            None => tr.inlined.as_ref(),
        };

        let Some(relationship) = tr.element_relationship else {
            return Some(Cow::Borrowed(atom));
        };

        if let Some(ref map) = atom.map {
            let mut map = map.clone();
            map.element_relationship = relationship;
            return Some(Cow::Owned(Atom {
                map: Some(map),
                ..Default::default()
            }));
        }
        if let Some(ref list) = atom.list {
            let mut list = list.clone();
            list.element_relationship = relationship;
            return Some(Cow::Owned(Atom {
                list: Some(list),
                ..Default::default()
            }));
        }
        None
    }

    /// Appends the builtin untyped types unless the schema already defines them.
    pub fn with_untyped_types(mut self) -> Self {
        for builtin in untyped_type_defs() {
            if self.find_named_type(&builtin.name).is_none() {
                self.types.push(builtin);
            }
        }
        self.type_map = OnceCell::new();
        self
    }
}

/// The untyped types used for free-form content such as
/// `x-kubernetes-preserve-unknown-fields` subtrees.
pub fn untyped_type_defs() -> Vec<TypeDef> {
    let untyped = |name: &str, map_element: &str, map_relationship| TypeDef {
        name: name.to_string(),
        atom: Atom {
            scalar: Some(Scalar::Untyped),
            list: Some(List {
                element_type: TypeRef::named(UNTYPED_ATOMIC),
                element_relationship: ElementRelationship::Atomic,
                keys: Vec::new(),
            }),
            map: Some(Map::with_element_type_and_relationship(
                TypeRef::named(map_element),
                map_relationship,
            )),
        },
    };
    vec![
        untyped(UNTYPED_ATOMIC, UNTYPED_ATOMIC, ElementRelationship::Atomic),
        untyped(UNTYPED_DEDUCED, UNTYPED_DEDUCED, ElementRelationship::Separable),
    ]
}

impl TypeRef {
    /// Creates a reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            named_type: Some(name.into()),
            ..Default::default()
        }
    }

    /// Creates an inlined type reference.
    pub fn inline(atom: Atom) -> Self {
        TypeRef {
            inlined: Box::new(atom),
            ..Default::default()
        }
    }

    /// Returns true if the reference names nothing and inlines nothing.
    pub fn is_empty(&self) -> bool {
        self.named_type.is_none()
            && self.inlined.scalar.is_none()
            && self.inlined.list.is_none()
            && self.inlined.map.is_none()
    }
}

impl Map {
    /// Creates a new Map with the given fields.
    pub fn with_fields(fields: Vec<StructField>) -> Self {
        Map {
            fields,
            ..Default::default()
        }
    }

    /// Creates a new Map with the given element type and relationship.
    pub fn with_element_type_and_relationship(
        element_type: TypeRef,
        element_relationship: ElementRelationship,
    ) -> Self {
        Map {
            element_type,
            element_relationship,
            ..Default::default()
        }
    }

    /// FindField returns the referenced StructField, if it exists.
    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        let index = self.field_map.get_or_init(|| {
            self.fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.clone(), i))
                .collect()
        });
        index.get(name).and_then(|&i| self.fields.get(i))
    }

    /// Returns the type of the named entry: the declared field type, or the
    /// element type for maps that accept arbitrary keys.
    pub fn field_type(&self, name: &str) -> Option<&TypeRef> {
        match self.find_field(name) {
            Some(field) => Some(&field.field_type),
            None if !self.element_type.is_empty() => Some(&self.element_type),
            None => None,
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.element_relationship == ElementRelationship::Atomic
    }
}

impl List {
    pub fn is_atomic(&self) -> bool {
        self.element_relationship == ElementRelationship::Atomic
    }

    /// Returns true for associative lists matched by key fields.
    pub fn is_keyed(&self) -> bool {
        self.element_relationship == ElementRelationship::Associative && !self.keys.is_empty()
    }
}

impl StructField {
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        StructField {
            name: name.into(),
            field_type,
        }
    }
}
