//! Schema-directed merge of a patch into a live object.

use super::typed_value::{TypedList, TypedMap, TypedValue};
use super::validation::MergeConflict;
use crate::fieldpath::{Path, PathElement};
use crate::value::FieldList;
use std::collections::HashMap;

/// Merges `patch` into `live`, producing a new tree.
///
/// Both trees must have been typed against the same schema. Patch values
/// win at scalars and at atomic containers; separable maps merge field by
/// field and keyed lists merge element by element.
pub fn merge(live: &TypedValue, patch: &TypedValue) -> Result<TypedValue, MergeConflict> {
    let mut path = Path::new();
    merge_at(live, patch, &mut path)
}

impl TypedValue {
    /// Merges `patch` into this value. See [`merge`].
    pub fn merge(&self, patch: &TypedValue) -> Result<TypedValue, MergeConflict> {
        merge(self, patch)
    }
}

fn merge_at(live: &TypedValue, patch: &TypedValue, path: &mut Path) -> Result<TypedValue, MergeConflict> {
    // An explicit null replaces; a live null is simply overwritten.
    if patch.is_null() || live.is_null() {
        return Ok(patch.clone());
    }

    match (live, patch) {
        (TypedValue::Scalar(_), TypedValue::Scalar(_)) => Ok(patch.clone()),
        (TypedValue::Map(live_map), TypedValue::Map(patch_map)) => merge_maps(live_map, patch_map, path),
        (TypedValue::List(live_list), TypedValue::List(patch_list)) => {
            merge_lists(live_list, patch_list, path)
        }
        _ => Err(MergeConflict {
            path: path.clone(),
            live: live.kind_name(),
            patch: patch.kind_name(),
        }),
    }
}

fn merge_maps(live: &TypedMap, patch: &TypedMap, path: &mut Path) -> Result<TypedValue, MergeConflict> {
    if patch.is_atomic() {
        // Unreachable once the atomicity check has passed, unless the
        // patch leaves the map empty.
        let winner = if patch.fields.is_empty() { live } else { patch };
        return Ok(TypedValue::Map(winner.clone()));
    }

    let mut fields = live.fields.clone();
    for (name, patch_child) in &patch.fields {
        let merged = match live.fields.get(name) {
            Some(live_child) => {
                path.push(PathElement::field_name(name.clone()));
                let merged = merge_at(live_child, patch_child, path)?;
                path.pop();
                merged
            }
            None => patch_child.clone(),
        };
        fields.insert(name.clone(), merged);
    }

    Ok(TypedValue::Map(TypedMap {
        fields,
        relationship: patch.relationship,
    }))
}

fn merge_lists(live: &TypedList, patch: &TypedList, path: &mut Path) -> Result<TypedValue, MergeConflict> {
    if patch.is_keyed() {
        return merge_keyed(live, patch, path);
    }
    if patch.is_set() {
        let mut items = live.items.clone();
        for item in &patch.items {
            if !items.contains(item) {
                items.push(item.clone());
            }
        }
        return Ok(TypedValue::List(TypedList {
            items,
            relationship: patch.relationship,
            keys: Vec::new(),
        }));
    }
    // Atomic and positional lists are replaced wholesale.
    Ok(TypedValue::List(patch.clone()))
}

/// Live elements keep their order; matched elements merge in place and new
/// elements are appended in patch order.
fn merge_keyed(live: &TypedList, patch: &TypedList, path: &mut Path) -> Result<TypedValue, MergeConflict> {
    let mut items = live.items.clone();
    let mut index: HashMap<FieldList, usize> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        if let Some(key) = patch.key_of(item) {
            index.entry(key).or_insert(i);
        }
    }

    for patch_item in &patch.items {
        let Some(key) = patch.key_of(patch_item) else {
            items.push(patch_item.clone());
            continue;
        };
        match index.get(&key) {
            Some(&i) => {
                path.push(PathElement::key(key));
                let merged = merge_at(&items[i], patch_item, path)?;
                path.pop();
                items[i] = merged;
            }
            None => {
                index.insert(key, items.len());
                items.push(patch_item.clone());
            }
        }
    }

    Ok(TypedValue::List(TypedList {
        items,
        relationship: patch.relationship,
        keys: patch.keys.clone(),
    }))
}
