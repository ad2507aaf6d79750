//! Operation to resource schema mapping and the lint gate built on it.
//!
//! | Method | Schema inspected |
//! |--------|------------------|
//! | `post`, `put`, `patch` | `requestBody.content["application/json"].schema` |
//! | `get` | `responses["200"].content["application/json"].schema` |
//! | `delete` | the sibling `get`, else the first of `post`, `put`, `patch` |
//! | `options`, `head` | none |
//!
//! Custom method paths (`/users/{id}:archive`) that yield no schema of
//! their own borrow the schema of their base path (`/users/{id}`).

use serde_json::Value;
use tracing::debug;

use crate::resolver::{deref, is_resource, resource_annotation};
use crate::types::{Method, JSON_CONTENT_TYPE, SUCCESS_STATUS};

/// Methods tried, in order, when a custom method's base path is inspected.
const BASE_PATH_METHODS: [Method; 5] = [
    Method::Get,
    Method::Post,
    Method::Put,
    Method::Patch,
    Method::Delete,
];

/// Methods tried, in order, when a delete has no sibling `get`.
const DELETE_FALLBACK_METHODS: [Method; 3] = [Method::Post, Method::Put, Method::Patch];

/// Returns the operation for `method` on a path item, if it is an object.
pub fn operation_of(path_item: &Value, method: Method) -> Option<&Value> {
    path_item.get(method.as_str()).filter(|op| op.is_object())
}

/// Iterate over the operations of a path item in [`Method::ALL`] order.
pub fn operations<'a>(path_item: &'a Value) -> impl Iterator<Item = (Method, &'a Value)> + 'a {
    Method::ALL
        .into_iter()
        .filter_map(move |method| operation_of(path_item, method).map(|op| (method, op)))
}

/// Find the schema that represents the resource payload of an operation.
///
/// Request and response objects given as `$ref` are followed; the returned
/// schema itself is not dereferenced. Returns `None` when the operation has
/// no such schema.
pub fn find_resource_schema<'a>(
    operation: &'a Value,
    method: Method,
    path_item: &'a Value,
    document: &'a Value,
) -> Option<&'a Value> {
    if !operation.is_object() {
        return None;
    }

    match method {
        Method::Post | Method::Put | Method::Patch => {
            let request_body = operation.get("requestBody")?;
            json_body_schema(request_body, document)
        }
        Method::Get => {
            let response = operation.get("responses")?.get(SUCCESS_STATUS)?;
            json_body_schema(response, document)
        }
        Method::Delete => {
            if let Some(get) = operation_of(path_item, Method::Get) {
                return find_resource_schema(get, Method::Get, path_item, document);
            }
            DELETE_FALLBACK_METHODS.into_iter().find_map(|m| {
                operation_of(path_item, m)
                    .map(|op| find_resource_schema(op, m, path_item, document))
            })?
        }
        Method::Options | Method::Head => None,
    }
}

/// Returns the base path of a custom method path.
///
/// The custom method is everything after the last `:`, which must follow
/// the last `/`. `/users/{id}:archive` has base `/users/{id}`.
pub fn custom_method_base(path: &str) -> Option<&str> {
    let colon = path.rfind(':')?;
    if path[colon..].contains('/') {
        return None;
    }
    Some(&path[..colon])
}

/// Find the resource schema of a custom method through its base path.
///
/// Uses the base path's `get`, falling back to its `post`, `put`, `patch`
/// and `delete` in that order.
pub fn find_resource_schema_for_custom_method<'a>(
    path: &str,
    paths: &'a Value,
    document: &'a Value,
) -> Option<&'a Value> {
    let base = custom_method_base(path)?;
    let Some(base_item) = paths.get(base) else {
        debug!(path, base, "custom method base path not found");
        return None;
    };

    let (method, operation) = BASE_PATH_METHODS
        .into_iter()
        .find_map(|m| operation_of(base_item, m).map(|op| (m, op)))?;
    debug!(path, base, %method, "resolving custom method through base path");
    find_resource_schema(operation, method, base_item, document)
}

/// Decide whether style rules apply to an operation.
///
/// True when the operation's resource schema, found directly or through
/// its custom method base path, is marked as a resource.
pub fn should_lint_operation(
    operation: &Value,
    method: Method,
    path: &str,
    path_item: &Value,
    document: &Value,
) -> bool {
    let schema = find_resource_schema(operation, method, path_item, document).or_else(|| {
        if !path.contains(':') {
            return None;
        }
        let paths = document.get("paths")?;
        find_resource_schema_for_custom_method(path, paths, document)
    });

    match schema {
        Some(schema) => is_resource(schema, document),
        None => {
            debug!(path, %method, "no resource schema, skipping operation");
            false
        }
    }
}

/// Whether an operation's `200` JSON response schema is a singleton resource.
pub fn returns_singleton(operation: &Value, document: &Value) -> bool {
    let schema = operation
        .get("responses")
        .and_then(|r| r.get(SUCCESS_STATUS))
        .and_then(|response| json_body_schema(response, document));

    schema
        .and_then(|s| resource_annotation(s, document))
        .is_some_and(|annotation| annotation.is_singleton())
}

fn json_body_schema<'a>(holder: &'a Value, document: &'a Value) -> Option<&'a Value> {
    deref(holder, document)?
        .get("content")?
        .get(JSON_CONTENT_TYPE)?
        .get("schema")
        .filter(|schema| !schema.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_body(schema: Value) -> Value {
        json!({ "content": { "application/json": { "schema": schema } } })
    }

    fn user_ref() -> Value {
        json!({ "$ref": "#/components/schemas/User" })
    }

    fn doc() -> Value {
        json!({
            "components": {
                "schemas": {
                    "User": { "type": "object", "x-aep-resource": "example.com/User" },
                    "Plain": { "type": "object" }
                },
                "requestBodies": {
                    "UserBody": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/User" } } } }
                }
            }
        })
    }

    // === Extraction Tests ===

    #[test]
    fn post_put_patch_use_request_body() {
        let doc = doc();
        let op = json!({ "requestBody": json_body(user_ref()) });
        for method in [Method::Post, Method::Put, Method::Patch] {
            assert_eq!(
                find_resource_schema(&op, method, &json!({}), &doc),
                Some(&user_ref())
            );
        }
    }

    #[test]
    fn request_body_without_json_content() {
        let doc = doc();
        let op = json!({
            "requestBody": { "content": { "application/xml": { "schema": user_ref() } } }
        });
        assert!(find_resource_schema(&op, Method::Post, &json!({}), &doc).is_none());
    }

    #[test]
    fn request_body_ref_is_followed() {
        let doc = doc();
        let op = json!({ "requestBody": { "$ref": "#/components/requestBodies/UserBody" } });
        assert_eq!(
            find_resource_schema(&op, Method::Put, &json!({}), &doc),
            Some(&user_ref())
        );
    }

    #[test]
    fn get_uses_200_response() {
        let doc = doc();
        let op = json!({ "responses": { "200": json_body(user_ref()) } });
        assert_eq!(
            find_resource_schema(&op, Method::Get, &json!({}), &doc),
            Some(&user_ref())
        );

        let op = json!({ "responses": { "201": json_body(user_ref()) } });
        assert!(find_resource_schema(&op, Method::Get, &json!({}), &doc).is_none());
    }

    #[test]
    fn get_ignores_request_body() {
        let doc = doc();
        let op = json!({ "requestBody": json_body(user_ref()) });
        assert!(find_resource_schema(&op, Method::Get, &json!({}), &doc).is_none());
    }

    #[test]
    fn delete_uses_sibling_get() {
        let doc = doc();
        let path_item = json!({
            "get": { "responses": { "200": json_body(user_ref()) } },
            "post": { "requestBody": json_body(json!({ "$ref": "#/components/schemas/Plain" })) },
            "delete": {}
        });
        assert_eq!(
            find_resource_schema(&path_item["delete"], Method::Delete, &path_item, &doc),
            Some(&user_ref())
        );
    }

    #[test]
    fn delete_with_schemaless_get_does_not_fall_back() {
        let doc = doc();
        let path_item = json!({
            "get": { "responses": { "204": {} } },
            "post": { "requestBody": json_body(user_ref()) },
            "delete": {}
        });
        assert!(
            find_resource_schema(&path_item["delete"], Method::Delete, &path_item, &doc).is_none()
        );
    }

    #[test]
    fn delete_falls_back_to_post_put_patch() {
        let doc = doc();
        let path_item = json!({
            "patch": { "requestBody": json_body(json!({ "$ref": "#/components/schemas/Plain" })) },
            "put": { "requestBody": json_body(user_ref()) },
            "delete": {}
        });
        assert_eq!(
            find_resource_schema(&path_item["delete"], Method::Delete, &path_item, &doc),
            Some(&user_ref())
        );
    }

    #[test]
    fn delete_alone_has_no_schema() {
        let doc = doc();
        let path_item = json!({ "delete": {} });
        assert!(
            find_resource_schema(&path_item["delete"], Method::Delete, &path_item, &doc).is_none()
        );
    }

    #[test]
    fn options_and_head_have_no_schema() {
        let doc = doc();
        let op = json!({
            "requestBody": json_body(user_ref()),
            "responses": { "200": json_body(user_ref()) }
        });
        assert!(find_resource_schema(&op, Method::Options, &json!({}), &doc).is_none());
        assert!(find_resource_schema(&op, Method::Head, &json!({}), &doc).is_none());
    }

    #[test]
    fn non_object_operation_has_no_schema() {
        let doc = doc();
        assert!(find_resource_schema(&json!(null), Method::Get, &json!({}), &doc).is_none());
        assert!(find_resource_schema(&json!("get"), Method::Post, &json!({}), &doc).is_none());
    }

    // === Custom Method Tests ===

    #[test]
    fn custom_method_base_splits_last_colon() {
        assert_eq!(custom_method_base("/users/{id}:archive"), Some("/users/{id}"));
        assert_eq!(custom_method_base("/users/{id}:a:b"), Some("/users/{id}:a"));
        assert_eq!(custom_method_base("/users:batchGet"), Some("/users"));
        assert_eq!(custom_method_base("/users/{id}"), None);
        assert_eq!(custom_method_base("/v1:beta/users"), None);
    }

    #[test]
    fn custom_method_uses_base_get() {
        let doc = doc();
        let paths = json!({
            "/users/{id}": { "get": { "responses": { "200": json_body(user_ref()) } } }
        });
        assert_eq!(
            find_resource_schema_for_custom_method("/users/{id}:archive", &paths, &doc),
            Some(&user_ref())
        );
    }

    #[test]
    fn custom_method_base_falls_back_in_order() {
        let doc = doc();
        let paths = json!({
            "/users": {
                "delete": {},
                "patch": { "requestBody": json_body(json!({ "$ref": "#/components/schemas/Plain" })) },
                "post": { "requestBody": json_body(user_ref()) }
            }
        });
        assert_eq!(
            find_resource_schema_for_custom_method("/users:import", &paths, &doc),
            Some(&user_ref())
        );
    }

    #[test]
    fn custom_method_missing_base() {
        let doc = doc();
        let paths = json!({ "/books/{id}": { "get": {} } });
        assert!(find_resource_schema_for_custom_method("/users/{id}:archive", &paths, &doc).is_none());
        assert!(find_resource_schema_for_custom_method("/books/{id}", &paths, &doc).is_none());
    }

    // === Predicate Tests ===

    #[test]
    fn should_lint_annotated_get() {
        let doc = doc();
        let path_item = json!({ "get": { "responses": { "200": json_body(user_ref()) } } });
        assert!(should_lint_operation(
            &path_item["get"],
            Method::Get,
            "/users/{id}",
            &path_item,
            &doc
        ));
    }

    #[test]
    fn should_not_lint_plain_schema() {
        let doc = doc();
        let path_item = json!({
            "get": { "responses": { "200": json_body(json!({ "$ref": "#/components/schemas/Plain" })) } }
        });
        assert!(!should_lint_operation(
            &path_item["get"],
            Method::Get,
            "/plain",
            &path_item,
            &doc
        ));
    }

    #[test]
    fn should_lint_custom_method_through_base() {
        let mut doc = doc();
        doc["paths"] = json!({
            "/users/{id}": { "get": { "responses": { "200": json_body(user_ref()) } } },
            "/users/{id}:archive": { "post": { "responses": { "200": { "description": "ok" } } } }
        });
        let path_item = &doc["paths"]["/users/{id}:archive"];
        assert!(should_lint_operation(
            &path_item["post"],
            Method::Post,
            "/users/{id}:archive",
            path_item,
            &doc
        ));
    }

    #[test]
    fn should_not_lint_custom_method_without_paths_table() {
        let doc = doc();
        let path_item = json!({ "post": {} });
        assert!(!should_lint_operation(
            &path_item["post"],
            Method::Post,
            "/users/{id}:archive",
            &path_item,
            &doc
        ));
    }

    #[test]
    fn returns_singleton_follows_refs() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Config": { "x-aep-resource": { "singleton": true } },
                    "User": { "x-aep-resource": true }
                }
            }
        });
        let op = json!({
            "responses": { "200": json_body(json!({ "$ref": "#/components/schemas/Config" })) }
        });
        assert!(returns_singleton(&op, &doc));

        let op = json!({
            "responses": { "200": json_body(json!({ "$ref": "#/components/schemas/User" })) }
        });
        assert!(!returns_singleton(&op, &doc));
        assert!(!returns_singleton(&json!({}), &doc));
    }

    #[test]
    fn operations_iterates_known_methods() {
        let path_item = json!({
            "parameters": [],
            "delete": {},
            "get": {},
            "summary": "not an operation",
            "trace": {}
        });
        let methods: Vec<Method> = operations(&path_item).map(|(m, _)| m).collect();
        assert_eq!(methods, vec![Method::Get, Method::Delete]);
    }
}
