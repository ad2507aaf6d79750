//! Reference resolution and resource annotation detection.
//!
//! Both operate on an immutable document and never fail: a pointer that
//! cannot be followed is simply `None`, and a schema that cannot be
//! classified is not a resource.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, trace};

use crate::types::ResourceAnnotation;

/// Resolve a local JSON Pointer reference (e.g. `#/components/schemas/Book`).
///
/// Returns `None` when the pointer does not start with `#/`, when any
/// intermediate value cannot be traversed, or when the target is `null`.
/// Segments are unescaped per RFC 6901 (`~1` is `/`, `~0` is `~`) and
/// numeric segments index into arrays.
pub fn resolve_ref<'a>(pointer: &str, document: &'a Value) -> Option<&'a Value> {
    let path = pointer.strip_prefix("#/")?;

    let mut current = document;
    for part in path.split('/') {
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Check whether a schema is marked as a resource.
///
/// Follows `$ref`, then checks the node itself, then its `items` for array
/// schemas, then each of its `properties`. The nested search exists because
/// list responses wrap the resource in a named array property.
///
/// Reference cycles terminate: a pointer seen twice in one search counts
/// as "no resource found".
pub fn is_resource(schema: &Value, document: &Value) -> bool {
    AnnotationSearch::new(document).visit(schema)
}

/// Follow a chain of `$ref` nodes to the first node that is not a reference.
///
/// Returns `None` for dangling or cyclic chains.
pub fn deref<'a>(schema: &'a Value, document: &'a Value) -> Option<&'a Value> {
    let mut visited = HashSet::new();
    let mut current = schema;

    while let Some(reference) = current.get("$ref") {
        let pointer = reference.as_str()?;
        if !visited.insert(pointer) {
            debug!(pointer, "reference cycle while dereferencing");
            return None;
        }
        trace!(pointer, "following reference");
        current = resolve_ref(pointer, document)?;
    }

    Some(current)
}

/// Read the resource annotation of a schema after following `$ref`.
///
/// Unlike [`is_resource`], this does not look into items or properties.
pub fn resource_annotation(schema: &Value, document: &Value) -> Option<ResourceAnnotation> {
    deref(schema, document).and_then(ResourceAnnotation::from_schema)
}

// --- Internal implementation ---

struct AnnotationSearch<'d> {
    document: &'d Value,
    visited: HashSet<String>,
}

impl<'d> AnnotationSearch<'d> {
    fn new(document: &'d Value) -> Self {
        Self {
            document,
            visited: HashSet::new(),
        }
    }

    fn visit(&mut self, schema: &Value) -> bool {
        let Value::Object(map) = schema else {
            return false;
        };

        // A reference replaces the node entirely; sibling keys are ignored
        if let Some(reference) = map.get("$ref") {
            let document = self.document;
            let Some(pointer) = reference.as_str() else {
                return false;
            };
            if !self.visited.insert(pointer.to_string()) {
                debug!(pointer, "reference cycle, treating as unannotated");
                return false;
            }
            trace!(pointer, "following reference");
            return match resolve_ref(pointer, document) {
                Some(resolved) => self.visit(resolved),
                None => {
                    debug!(pointer, "dangling reference");
                    false
                }
            };
        }

        if ResourceAnnotation::from_schema(schema).is_some() {
            return true;
        }

        // Arrays without items fall through to properties
        if map.get("type").and_then(|t| t.as_str()) == Some("array") {
            if let Some(items) = map.get("items").filter(|items| !items.is_null()) {
                return self.visit(items);
            }
        }

        if let Some(Value::Object(props)) = map.get("properties") {
            return props.values().any(|prop| self.visit(prop));
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "x-aep-resource": "example.com/User",
                        "properties": { "name": { "type": "string" } }
                    },
                    "Book": { "type": "object" },
                    "UserList": {
                        "type": "object",
                        "properties": {
                            "users": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/User" }
                            }
                        }
                    }
                }
            },
            "paths": {
                "/users/{id}": { "get": { "operationId": "GetUser" } }
            },
            "tags": [{ "name": "first" }, { "name": "second" }]
        })
    }

    // === Reference Resolution Tests ===

    #[test]
    fn resolve_ref_valid() {
        let doc = doc();
        let result = resolve_ref("#/components/schemas/Book", &doc).unwrap();
        assert_eq!(result, &json!({ "type": "object" }));
    }

    #[test]
    fn resolve_ref_missing_target() {
        let doc = doc();
        assert!(resolve_ref("#/components/schemas/NonExistent", &doc).is_none());
    }

    #[test]
    fn resolve_ref_requires_prefix() {
        let doc = doc();
        assert!(resolve_ref("notAReference", &doc).is_none());
        assert!(resolve_ref("components/schemas/Book", &doc).is_none());
        assert!(resolve_ref("#components/schemas/Book", &doc).is_none());
        assert!(resolve_ref("", &doc).is_none());
        assert!(resolve_ref("other.json#/components", &doc).is_none());
    }

    #[test]
    fn resolve_ref_through_scalar_is_none() {
        let doc = doc();
        assert!(resolve_ref("#/components/schemas/Book/type/deeper", &doc).is_none());
    }

    #[test]
    fn resolve_ref_unescapes_segments() {
        let doc = doc();
        let result = resolve_ref("#/paths/~1users~1{id}/get", &doc).unwrap();
        assert_eq!(result["operationId"], "GetUser");
    }

    #[test]
    fn resolve_ref_indexes_arrays() {
        let doc = doc();
        assert_eq!(resolve_ref("#/tags/1/name", &doc).unwrap(), "second");
        assert!(resolve_ref("#/tags/7", &doc).is_none());
        assert!(resolve_ref("#/tags/first", &doc).is_none());
    }

    #[test]
    fn resolve_ref_null_target_is_none() {
        let doc = json!({ "a": { "b": null } });
        assert!(resolve_ref("#/a/b", &doc).is_none());
    }

    // === Annotation Detection Tests ===

    #[test]
    fn is_resource_direct() {
        let schema = json!({ "x-aep-resource": true, "type": "object" });
        assert!(is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_via_ref() {
        let schema = json!({ "$ref": "#/components/schemas/User" });
        assert!(is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_unannotated_ref() {
        let schema = json!({ "$ref": "#/components/schemas/Book" });
        assert!(!is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_dangling_ref() {
        let schema = json!({ "$ref": "#/components/schemas/Missing" });
        assert!(!is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_ref_wins_over_siblings() {
        let schema = json!({
            "$ref": "#/components/schemas/Book",
            "x-aep-resource": true
        });
        assert!(!is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_non_string_ref() {
        let schema = json!({ "$ref": 42, "x-aep-resource": true });
        assert!(!is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_array_items() {
        let schema = json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/User" }
        });
        assert!(is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_array_ignores_properties() {
        let schema = json!({
            "type": "array",
            "items": { "type": "string" },
            "properties": { "x": { "x-aep-resource": true } }
        });
        assert!(!is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_array_without_items_checks_properties() {
        let schema = json!({
            "type": "array",
            "properties": { "x": { "x-aep-resource": true } }
        });
        assert!(is_resource(&schema, &json!({})));

        let schema = json!({ "type": "array", "items": null, "properties": {} });
        assert!(!is_resource(&schema, &json!({})));
    }

    #[test]
    fn is_resource_nested_properties() {
        let schema = json!({ "$ref": "#/components/schemas/UserList" });
        assert!(is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_non_object() {
        assert!(!is_resource(&json!(null), &doc()));
        assert!(!is_resource(&json!("User"), &doc()));
        assert!(!is_resource(&json!([{ "x-aep-resource": true }]), &doc()));
    }

    #[test]
    fn is_resource_false_marker() {
        let schema = json!({ "x-aep-resource": false });
        assert!(!is_resource(&schema, &doc()));
    }

    #[test]
    fn is_resource_cycle_terminates() {
        let doc = json!({
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B" },
                    "B": { "$ref": "#/components/schemas/A" }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/A" });
        assert!(!is_resource(&schema, &doc));
    }

    #[test]
    fn is_resource_self_referencing_properties() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "children": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Node" }
                            },
                            "parent": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/Node" });
        assert!(!is_resource(&schema, &doc));
    }

    #[test]
    fn is_resource_shared_ref_in_sibling_properties() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Plain": { "type": "object" },
                    "Wrapper": {
                        "type": "object",
                        "properties": {
                            "first": { "$ref": "#/components/schemas/Plain" },
                            "second": { "$ref": "#/components/schemas/Plain" },
                            "third": { "x-aep-resource": { "singular": "thing", "plural": "things" } }
                        }
                    }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/Wrapper" });
        assert!(is_resource(&schema, &doc));
    }

    // === Deref Tests ===

    #[test]
    fn deref_follows_chain() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Alias": { "$ref": "#/components/schemas/Target" },
                    "Target": { "type": "object", "x-aep-resource": true }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/Alias" });
        let target = deref(&schema, &doc).unwrap();
        assert_eq!(target["type"], "object");
        assert_eq!(
            resource_annotation(&schema, &doc),
            Some(ResourceAnnotation::LegacyMarker)
        );
    }

    #[test]
    fn deref_cycle_is_none() {
        let doc = json!({
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/A" }
                }
            }
        });
        let schema = json!({ "$ref": "#/components/schemas/A" });
        assert!(deref(&schema, &doc).is_none());
    }

    #[test]
    fn deref_inline_schema_is_itself() {
        let schema = json!({ "type": "string" });
        assert_eq!(deref(&schema, &doc()), Some(&schema));
    }
}
