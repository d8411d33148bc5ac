//! Conversion between generic values and typed trees.

use super::typed_value::{TypedList, TypedMap, TypedValue};
use super::validation::AdaptError;
use crate::fieldpath::{Path, PathElement};
use crate::schema::{Atom, MergeView, Scalar, Schema, TypeRef};
use crate::value::{Field, FieldList, Map, Value};

/// Types a generic value against the type `root` references.
///
/// Fails at the first node whose shape disagrees with the schema; the error
/// carries that node's path.
pub fn to_typed(value: &Value, schema: &Schema, root: &TypeRef) -> Result<TypedValue, AdaptError> {
    let mut path = Path::new();
    Adapter { schema }.adapt(value, root, &mut path)
}

/// Converts a typed tree back to its generic form. Never fails.
pub fn from_typed(typed: &TypedValue) -> Value {
    match typed {
        TypedValue::Scalar(value) => value.clone(),
        TypedValue::List(list) => Value::List(list.items.iter().map(from_typed).collect()),
        TypedValue::Map(map) => Value::Map(
            map.fields
                .iter()
                .map(|(name, child)| (name.clone(), from_typed(child)))
                .collect::<Map>(),
        ),
    }
}

impl MergeView<'_> {
    /// Types a generic value against this view's root type.
    pub fn to_typed(&self, value: &Value) -> Result<TypedValue, AdaptError> {
        to_typed(value, self.schema, self.root)
    }
}

struct Adapter<'a> {
    schema: &'a Schema,
}

impl Adapter<'_> {
    fn adapt(&self, value: &Value, type_ref: &TypeRef, path: &mut Path) -> Result<TypedValue, AdaptError> {
        // Null fits every type.
        if value.is_null() {
            return Ok(TypedValue::Scalar(Value::Null));
        }

        let atom = self.schema.resolve(type_ref).ok_or_else(|| {
            let name = type_ref.named_type.as_deref().unwrap_or("<inline>");
            AdaptError::unresolved_type(path, name)
        })?;

        match value {
            Value::Map(fields) => {
                let Some(ref map_schema) = atom.map else {
                    return Err(AdaptError::type_mismatch(path, expected_shape(&atom), "map"));
                };
                let mut typed_fields = std::collections::BTreeMap::new();
                for (name, child) in fields.iter() {
                    path.push(PathElement::field_name(name.clone()));
                    let field_type = map_schema
                        .field_type(name)
                        .ok_or_else(|| AdaptError::unknown_field(path, name.clone()))?;
                    let typed = self.adapt(child, field_type, path)?;
                    path.pop();
                    typed_fields.insert(name.clone(), typed);
                }
                Ok(TypedValue::Map(TypedMap {
                    fields: typed_fields,
                    relationship: map_schema.element_relationship,
                }))
            }
            Value::List(items) => {
                let Some(ref list_schema) = atom.list else {
                    return Err(AdaptError::type_mismatch(path, expected_shape(&atom), "list"));
                };
                let mut typed_items = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let element = if list_schema.is_keyed() {
                        key_element(item, &list_schema.keys, i, path)?
                    } else {
                        PathElement::index(i)
                    };
                    path.push(element);
                    let typed = self.adapt(item, &list_schema.element_type, path)?;
                    path.pop();
                    typed_items.push(typed);
                }
                Ok(TypedValue::List(TypedList {
                    items: typed_items,
                    relationship: list_schema.element_relationship,
                    keys: if list_schema.is_keyed() {
                        list_schema.keys.clone()
                    } else {
                        Vec::new()
                    },
                }))
            }
            scalar => {
                let Some(kind) = atom.scalar else {
                    return Err(AdaptError::type_mismatch(path, expected_shape(&atom), scalar.type_name()));
                };
                if !scalar_matches(kind, scalar) {
                    return Err(AdaptError::type_mismatch(path, kind.name(), scalar.type_name()));
                }
                Ok(TypedValue::Scalar(scalar.clone()))
            }
        }
    }
}

/// Builds the key path element for a keyed list element. Elements that are
/// not maps keep their index so the element type check reports them.
fn key_element(item: &Value, keys: &[String], index: usize, path: &Path) -> Result<PathElement, AdaptError> {
    let Some(map) = item.as_map() else {
        return Ok(PathElement::index(index));
    };
    let mut fields = Vec::with_capacity(keys.len());
    for key in keys {
        match map.get(key) {
            Some(value) if value.is_scalar() && !value.is_null() => fields.push(Field {
                name: key.clone(),
                value: value.clone(),
            }),
            _ => return Err(AdaptError::missing_key(&path.with(PathElement::index(index)), key.clone())),
        }
    }
    Ok(PathElement::key(FieldList::with_fields(fields)))
}

fn scalar_matches(kind: Scalar, value: &Value) -> bool {
    match kind {
        Scalar::Numeric => value.is_int() || value.is_float(),
        Scalar::String => value.is_string(),
        Scalar::Boolean => value.is_bool(),
        Scalar::Untyped => value.is_scalar(),
    }
}

fn expected_shape(atom: &Atom) -> String {
    let mut shapes = Vec::new();
    if let Some(scalar) = atom.scalar {
        shapes.push(scalar.name());
    }
    if atom.list.is_some() {
        shapes.push("list");
    }
    if atom.map.is_some() {
        shapes.push("map");
    }
    if shapes.is_empty() {
        "nothing".to_string()
    } else {
        shapes.join(" or ")
    }
}
