//! Table tests for the typed merge engine.

#[cfg(test)]
mod tests {
    use crate::schema::{Schema, TypeRef};
    use crate::typed::{from_typed, merge, to_typed, MergeConflict, TypedValue};
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    /// Test case for merge operations.
    struct MergeTestCase {
        name: &'static str,
        root_type_name: &'static str,
        schema: &'static str,
        triplets: Vec<MergeTriplet>,
    }

    struct MergeTriplet {
        live: &'static str,
        patch: &'static str,
        out: &'static str,
    }

    fn typed(schema: &Schema, root: &str, yaml: &str) -> TypedValue {
        let value = from_yaml(yaml).unwrap_or_else(|e| panic!("bad yaml {yaml}: {e}"));
        to_typed(&value, schema, &TypeRef::named(root)).unwrap_or_else(|e| panic!("cannot type {yaml}: {e}"))
    }

    fn run_merge_test_case(tc: MergeTestCase) {
        let schema = Schema::from_yaml(tc.schema)
            .unwrap_or_else(|e| panic!("Failed to parse schema for test {}: {e}", tc.name))
            .with_untyped_types();

        for (i, triplet) in tc.triplets.iter().enumerate() {
            let live = typed(&schema, tc.root_type_name, triplet.live);
            let patch = typed(&schema, tc.root_type_name, triplet.patch);
            let expected = from_yaml(triplet.out).unwrap();

            let merged = merge(&live, &patch)
                .unwrap_or_else(|e| panic!("Merge failed for {}-{}: {e}", tc.name, i));
            assert_eq!(
                from_typed(&merged),
                expected,
                "Merge result mismatch for {}-{}",
                tc.name,
                i
            );
        }
    }

    const KEYED_SCHEMA: &str = r#"types:
- name: root
  map:
    fields:
    - name: items
      type:
        list:
          elementType:
            namedType: item
          elementRelationship: associative
          keys: [key]
- name: item
  map:
    fields:
    - name: key
      type:
        scalar: string
    - name: v
      type:
        scalar: numeric
    - name: extra
      type:
        scalar: string
"#;

    #[test]
    fn test_merge_keyed_list() {
        run_merge_test_case(MergeTestCase {
            name: "keyed list",
            root_type_name: "root",
            schema: KEYED_SCHEMA,
            triplets: vec![
                MergeTriplet {
                    live: r#"{"items":[{"key":"a","v":1},{"key":"b","v":2}]}"#,
                    patch: r#"{"items":[{"key":"b","v":9},{"key":"c","v":3}]}"#,
                    out: r#"{"items":[{"key":"a","v":1},{"key":"b","v":9},{"key":"c","v":3}]}"#,
                },
                MergeTriplet {
                    live: r#"{"items":[{"key":"a","v":1,"extra":"keep"}]}"#,
                    patch: r#"{"items":[{"key":"a","v":5}]}"#,
                    out: r#"{"items":[{"key":"a","v":5,"extra":"keep"}]}"#,
                },
                MergeTriplet {
                    live: r#"{}"#,
                    patch: r#"{"items":[{"key":"z","v":0},{"key":"y","v":1}]}"#,
                    out: r#"{"items":[{"key":"z","v":0},{"key":"y","v":1}]}"#,
                },
                MergeTriplet {
                    live: r#"{"items":[{"key":"a","v":1}]}"#,
                    patch: r#"{}"#,
                    out: r#"{"items":[{"key":"a","v":1}]}"#,
                },
            ],
        });
    }

    #[test]
    fn test_merge_atomic_and_set_lists() {
        run_merge_test_case(MergeTestCase {
            name: "atomic and set lists",
            root_type_name: "root",
            schema: r#"types:
- name: root
  map:
    fields:
    - name: args
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: atomic
    - name: finalizers
      type:
        list:
          elementType:
            scalar: string
          elementRelationship: associative
"#,
            triplets: vec![
                MergeTriplet {
                    live: r#"{"args":["a","b","c"]}"#,
                    patch: r#"{"args":["x"]}"#,
                    out: r#"{"args":["x"]}"#,
                },
                MergeTriplet {
                    live: r#"{"args":["a"]}"#,
                    patch: r#"{"finalizers":["f"]}"#,
                    out: r#"{"args":["a"],"finalizers":["f"]}"#,
                },
                MergeTriplet {
                    live: r#"{"finalizers":["a","b"]}"#,
                    patch: r#"{"finalizers":["b","c"]}"#,
                    out: r#"{"finalizers":["a","b","c"]}"#,
                },
            ],
        });
    }

    #[test]
    fn test_merge_maps() {
        run_merge_test_case(MergeTestCase {
            name: "maps",
            root_type_name: "root",
            schema: r#"types:
- name: root
  map:
    fields:
    - name: labels
      type:
        map:
          elementType:
            scalar: string
    - name: selector
      type:
        map:
          elementRelationship: atomic
          elementType:
            scalar: string
    - name: raw
      type:
        namedType: __untyped_deduced_
"#,
            triplets: vec![
                MergeTriplet {
                    live: r#"{"labels":{"a":"1","b":"2"}}"#,
                    patch: r#"{"labels":{"b":"3","c":"4"}}"#,
                    out: r#"{"labels":{"a":"1","b":"3","c":"4"}}"#,
                },
                MergeTriplet {
                    live: r#"{"selector":{"a":"1","b":"2"}}"#,
                    patch: r#"{"selector":{"c":"3"}}"#,
                    out: r#"{"selector":{"c":"3"}}"#,
                },
                MergeTriplet {
                    live: r#"{"selector":{"a":"1"}}"#,
                    patch: r#"{"selector":{}}"#,
                    out: r#"{"selector":{"a":"1"}}"#,
                },
                MergeTriplet {
                    live: r#"{"labels":{"a":"1"}}"#,
                    patch: r#"{"labels":null}"#,
                    out: r#"{"labels":null}"#,
                },
                MergeTriplet {
                    live: r#"{"labels":null}"#,
                    patch: r#"{"labels":{"a":"1"}}"#,
                    out: r#"{"labels":{"a":"1"}}"#,
                },
                MergeTriplet {
                    live: r#"{"raw":{"x":{"y":1},"l":[1,2]}}"#,
                    patch: r#"{"raw":{"x":{"z":2},"l":[3]}}"#,
                    out: r#"{"raw":{"x":{"y":1,"z":2},"l":[3]}}"#,
                },
            ],
        });
    }

    #[test]
    fn test_merge_conflict_on_untyped_shape_change() {
        let schema = Schema::from_yaml(
            r#"types:
- name: root
  map:
    fields:
    - name: raw
      type:
        namedType: __untyped_deduced_
"#,
        )
        .unwrap()
        .with_untyped_types();

        let live = typed(&schema, "root", r#"{"raw":{"x":{"y":1}}}"#);
        let patch = typed(&schema, "root", r#"{"raw":{"x":"flat"}}"#);

        let err = merge(&live, &patch).unwrap_err();
        assert_eq!(
            err,
            MergeConflict {
                path: crate::fieldpath::Path::from_fields(["raw", "x"]),
                live: "map",
                patch: "scalar",
            }
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let schema = Schema::from_yaml(KEYED_SCHEMA).unwrap();
        let live = typed(&schema, "root", r#"{"items":[{"key":"a","v":1}]}"#);
        let patch = typed(&schema, "root", r#"{"items":[{"key":"a","v":2},{"key":"b","v":3}]}"#);

        let once = merge(&live, &patch).unwrap();
        let again = merge(&live, &patch).unwrap();
        assert_eq!(once, again);
        assert_eq!(merge(&once, &patch).unwrap(), once);
    }
}
