//! Detection of patches that overwrite atomic structures.
//!
//! A patch that sets any field of an atomic map replaces the whole map,
//! dropping whatever the live object held there. Such patches are reported.
//! Atomic lists are exempt: replacing the whole list (a container's `args`,
//! say) is the only way a patch can edit one.
//!
//! An explicit `null` for an atomic map sets no field and is not reported;
//! the merge then clears the whole map. Deleting a structure outright is
//! allowed, only partial rewrites are not.

use super::typed_value::{TypedList, TypedValue};
use crate::fieldpath::{Path, PathElement};

/// Returns the path of every atomic map the patch sets a field of, in
/// pre-order. An empty result means the patch is acceptable.
pub fn find_atomic_violations(patch: &TypedValue) -> Vec<Path> {
    let mut violations = Vec::new();
    let mut path = Path::new();
    walk(patch, &mut path, &mut violations);
    violations
}

fn walk(node: &TypedValue, path: &mut Path, violations: &mut Vec<Path>) {
    match node {
        TypedValue::Scalar(_) => {}
        TypedValue::Map(map) => {
            if map.is_atomic() && !map.fields.is_empty() {
                violations.push(path.clone());
            }
            for (name, child) in &map.fields {
                path.push(PathElement::field_name(name.clone()));
                walk(child, path, violations);
                path.pop();
            }
        }
        TypedValue::List(list) => {
            for (i, item) in list.items.iter().enumerate() {
                path.push(element_of(list, item, i));
                walk(item, path, violations);
                path.pop();
            }
        }
    }
}

fn element_of(list: &TypedList, item: &TypedValue, index: usize) -> PathElement {
    if list.is_keyed() {
        if let Some(key) = list.key_of(item) {
            return PathElement::key(key);
        }
    }
    PathElement::index(index)
}
