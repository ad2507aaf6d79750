//! AEP Resource Resolver
//!
//! Decides whether an OpenAPI operation acts on an annotated resource.
//!
//! Style rules for resource-oriented APIs only make sense for operations
//! whose payload is a resource type. A schema is a resource when it carries
//! the `x-aep-resource` extension, either as a bare marker or as a
//! structured descriptor. This library follows `$ref` pointers, array items
//! and nested properties to find that annotation, maps each HTTP method to
//! the body that represents its resource, and exposes the result as a
//! single gate, [`should_lint_operation`].
//!
//! # Example
//!
//! ```
//! use aep_resource::{should_lint_operation, Method};
//! use serde_json::json;
//!
//! let doc = json!({
//!     "components": {
//!         "schemas": {
//!             "Book": { "type": "object", "x-aep-resource": true }
//!         }
//!     },
//!     "paths": {
//!         "/books/{id}": {
//!             "get": {
//!                 "responses": {
//!                     "200": {
//!                         "content": {
//!                             "application/json": {
//!                                 "schema": { "$ref": "#/components/schemas/Book" }
//!                             }
//!                         }
//!                     }
//!                 }
//!             },
//!             "delete": {}
//!         }
//!     }
//! });
//!
//! let path_item = &doc["paths"]["/books/{id}"];
//! assert!(should_lint_operation(&path_item["get"], Method::Get, "/books/{id}", path_item, &doc));
//!
//! // Deletes have no body; they borrow the schema of the sibling get
//! assert!(should_lint_operation(&path_item["delete"], Method::Delete, "/books/{id}", path_item, &doc));
//! ```
//!
//! # Method Mapping
//!
//! | Method | Resource schema |
//! |--------|-----------------|
//! | `post`, `put`, `patch` | JSON request body |
//! | `get` | JSON body of the `200` response |
//! | `delete` | sibling `get`, else first of `post`, `put`, `patch` |
//! | custom method (`/x/{id}:archive`) | base path (`/x/{id}`), when the operation has none |
//!
//! # Annotation Format
//!
//! Legacy marker:
//! ```json
//! { "x-aep-resource": true }
//! ```
//!
//! Descriptor:
//! ```json
//! {
//!   "x-aep-resource": {
//!     "singular": "config",
//!     "plural": "configs",
//!     "singleton": true,
//!     "patterns": ["publishers/{publisher_id}/config"]
//!   }
//! }
//! ```

mod error;
mod linter;
mod loader;
mod operation;
mod resolver;
mod rules;
mod singleton;
mod types;

pub use error::{LoadError, PatternError};
pub use linter::{
    lint, lint_document, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity,
};
pub use loader::{is_url, load_document, load_document_auto, load_document_str};
pub use operation::{
    custom_method_base, find_resource_schema, find_resource_schema_for_custom_method,
    operation_of, operations, returns_singleton, should_lint_operation,
};
pub use resolver::{deref, is_resource, resolve_ref, resource_annotation};
pub use rules::{escape_segment, is_collection_path, PathTarget, Rule};
pub use singleton::{
    compile_pattern, list_pattern, normalize_path, path_matches_singleton_list_pattern,
    path_matches_singleton_pattern, singleton_patterns,
};
pub use types::{
    LintOptions, Method, ResourceAnnotation, ResourceDescriptor, JSON_CONTENT_TYPE,
    RESOURCE_ANNOTATION, SINGLETON_LIST_SUFFIX, SUCCESS_STATUS,
};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
