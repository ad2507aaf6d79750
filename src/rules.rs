//! Built-in style rules.
//!
//! Every rule is gated on [`should_lint_operation`]: operations that do not
//! operate on an annotated resource produce no diagnostics.

use serde_json::Value;

use crate::linter::{Diagnostic, Severity};
use crate::operation::{
    custom_method_base, operation_of, operations, returns_singleton, should_lint_operation,
};
use crate::resolver::deref;
use crate::singleton::path_matches_singleton_pattern;
use crate::types::Method;

/// Query parameter that bounds the page size of list operations.
const MAX_PAGE_SIZE_PARAM: &str = "max_page_size";

/// A style rule applied to each path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    ParameterNamesUnique,
    GetNoRequestBody,
    DeleteNoRequestBody,
    DeleteResponse204,
    RequestBodyRequired,
    ListMaxPageSize,
}

impl Rule {
    /// All rules in the order they run.
    pub const ALL: [Rule; 6] = [
        Rule::ParameterNamesUnique,
        Rule::GetNoRequestBody,
        Rule::DeleteNoRequestBody,
        Rule::DeleteResponse204,
        Rule::RequestBodyRequired,
        Rule::ListMaxPageSize,
    ];

    /// Kebab-case name, as accepted by `--disable` and [`Rule::parse`].
    pub fn name(&self) -> &'static str {
        match self {
            Rule::ParameterNamesUnique => "parameter-names-unique",
            Rule::GetNoRequestBody => "get-no-request-body",
            Rule::DeleteNoRequestBody => "delete-no-request-body",
            Rule::DeleteResponse204 => "delete-response-204",
            Rule::RequestBodyRequired => "request-body-required",
            Rule::ListMaxPageSize => "list-max-page-size",
        }
    }

    /// Stable diagnostic code (`R001`..`R006`).
    pub fn code(&self) -> &'static str {
        match self {
            Rule::ParameterNamesUnique => "R001",
            Rule::GetNoRequestBody => "R002",
            Rule::DeleteNoRequestBody => "R003",
            Rule::DeleteResponse204 => "R004",
            Rule::RequestBodyRequired => "R005",
            Rule::ListMaxPageSize => "R006",
        }
    }

    /// Severity of every diagnostic this rule reports. Only the delete
    /// response rule is a warning.
    pub fn severity(&self) -> Severity {
        match self {
            Rule::DeleteResponse204 => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Look up a rule by name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.name() == name)
    }

    /// Run this rule against one path item.
    pub fn check(&self, target: &PathTarget<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        match self {
            Rule::ParameterNamesUnique => self.check_parameter_names(target, &mut out),
            Rule::GetNoRequestBody => self.check_no_request_body(target, Method::Get, &mut out),
            Rule::DeleteNoRequestBody => {
                self.check_no_request_body(target, Method::Delete, &mut out)
            }
            Rule::DeleteResponse204 => self.check_delete_response(target, &mut out),
            Rule::RequestBodyRequired => self.check_request_body_required(target, &mut out),
            Rule::ListMaxPageSize => self.check_max_page_size(target, &mut out),
        }
        out
    }

    fn diagnostic(&self, location: String, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: self.severity(),
            code: self.code().to_string(),
            rule: self.name().to_string(),
            path: location,
            message: message.into(),
        }
    }

    fn check_parameter_names(&self, target: &PathTarget<'_>, out: &mut Vec<Diagnostic>) {
        let lintable: Vec<(Method, &Value)> = target.lintable_operations().collect();
        if lintable.is_empty() {
            return;
        }

        let path_params = parameter_names(target.path_item.get("parameters"), target.document);
        for (i, name) in path_params.iter().enumerate() {
            if let Some(dup) = duplicate_of(name, &path_params[..i]) {
                let index = i.to_string();
                out.push(self.diagnostic(
                    target.pointer(&["parameters", index.as_str(), "name"]),
                    format!("Duplicate parameter name (ignoring case): {}.", dup),
                ));
            }
        }

        for (method, operation) in lintable {
            let Some(own) = operation.get("parameters").filter(|p| p.is_array()) else {
                continue;
            };
            let own_params = parameter_names(Some(own), target.document);
            let mut all = path_params.clone();
            for (k, name) in own_params.into_iter().enumerate() {
                if let Some(dup) = duplicate_of(&name, &all) {
                    let index = k.to_string();
                    out.push(self.diagnostic(
                        target.pointer(&[method.as_str(), "parameters", index.as_str(), "name"]),
                        format!("Duplicate parameter name (ignoring case): {}.", dup),
                    ));
                }
                all.push(name);
            }
        }
    }

    fn check_no_request_body(
        &self,
        target: &PathTarget<'_>,
        method: Method,
        out: &mut Vec<Diagnostic>,
    ) {
        let Some(operation) = target.lintable(method) else {
            return;
        };
        if operation.get("requestBody").is_some_and(|b| !b.is_null()) {
            out.push(self.diagnostic(
                target.pointer(&[method.as_str(), "requestBody"]),
                format!("A {} operation must not accept a request body.", method),
            ));
        }
    }

    fn check_delete_response(&self, target: &PathTarget<'_>, out: &mut Vec<Diagnostic>) {
        let Some(operation) = target.lintable(Method::Delete) else {
            return;
        };
        let Some(responses) = operation.get("responses").and_then(|r| r.as_object()) else {
            return;
        };
        if !responses.contains_key("204") && !responses.contains_key("202") {
            out.push(self.diagnostic(
                target.pointer(&["delete", "responses"]),
                "A delete operation should have a `204` response.",
            ));
        }
    }

    fn check_request_body_required(&self, target: &PathTarget<'_>, out: &mut Vec<Diagnostic>) {
        for method in Method::ALL.into_iter().filter(Method::carries_request_body) {
            let Some(operation) = target.lintable(method) else {
                continue;
            };
            let Some(body) = operation.get("requestBody") else {
                continue;
            };
            let required = deref(body, target.document)
                .and_then(|b| b.get("required"))
                .and_then(|r| r.as_bool())
                .unwrap_or(false);
            if !required {
                out.push(self.diagnostic(
                    target.pointer(&[method.as_str(), "requestBody"]),
                    "The body parameter is not marked as required.",
                ));
            }
        }
    }

    fn check_max_page_size(&self, target: &PathTarget<'_>, out: &mut Vec<Diagnostic>) {
        if !is_collection_path(target.path)
            || path_matches_singleton_pattern(target.path, target.document)
        {
            return;
        }
        let Some(operation) = target.lintable(Method::Get) else {
            return;
        };
        if returns_singleton(operation, target.document) {
            return;
        }

        let declared = [target.path_item.get("parameters"), operation.get("parameters")]
            .into_iter()
            .flatten()
            .filter_map(|params| params.as_array())
            .flatten()
            .filter_map(|param| deref(param, target.document))
            .any(|param| {
                param.get("name").and_then(|n| n.as_str()) == Some(MAX_PAGE_SIZE_PARAM)
                    && param
                        .get("schema")
                        .and_then(|s| deref(s, target.document))
                        .and_then(|s| s.get("type"))
                        .and_then(|t| t.as_str())
                        == Some("integer")
            });

        if !declared {
            let location = if operation.get("parameters").is_some() {
                target.pointer(&["get", "parameters"])
            } else {
                target.pointer(&["get"])
            };
            out.push(self.diagnostic(
                location,
                "Operations that return collections should define an integer max_page_size parameter.",
            ));
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A path item under inspection, with the document it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct PathTarget<'a> {
    /// Key of the path item in the paths table.
    pub path: &'a str,
    pub path_item: &'a Value,
    pub document: &'a Value,
}

impl<'a> PathTarget<'a> {
    pub fn new(path: &'a str, path_item: &'a Value, document: &'a Value) -> Self {
        Self {
            path,
            path_item,
            document,
        }
    }

    /// Returns the operation for `method` if style rules apply to it.
    pub fn lintable(&self, method: Method) -> Option<&'a Value> {
        operation_of(self.path_item, method).filter(|operation| {
            should_lint_operation(operation, method, self.path, self.path_item, self.document)
        })
    }

    /// Iterate over the operations style rules apply to.
    pub fn lintable_operations(&self) -> impl Iterator<Item = (Method, &'a Value)> + '_ {
        operations(self.path_item).filter(move |(method, operation)| {
            should_lint_operation(operation, *method, self.path, self.path_item, self.document)
        })
    }

    /// JSON Pointer to a location under this path item.
    pub fn pointer(&self, segments: &[&str]) -> String {
        let mut pointer = format!("/paths/{}", escape_segment(self.path));
        for segment in segments {
            pointer.push('/');
            pointer.push_str(&escape_segment(segment));
        }
        pointer
    }
}

/// Escape a JSON Pointer segment (RFC 6901).
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Whether a path addresses a collection: not a custom method, and its
/// last segment is not a `{param}` placeholder.
pub fn is_collection_path(path: &str) -> bool {
    if custom_method_base(path).is_some() {
        return false;
    }
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    !last.is_empty() && !(last.starts_with('{') && last.ends_with('}'))
}

fn parameter_names(params: Option<&Value>, document: &Value) -> Vec<Option<String>> {
    params
        .and_then(|p| p.as_array())
        .map(|arr| {
            arr.iter()
                .map(|param| {
                    deref(param, document)
                        .and_then(|p| p.get("name"))
                        .and_then(|n| n.as_str())
                        .map(str::to_lowercase)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the canonical name when `name` already occurs in `earlier`.
fn duplicate_of<'n>(name: &'n Option<String>, earlier: &[Option<String>]) -> Option<&'n str> {
    let name = name.as_ref()?;
    earlier
        .iter()
        .any(|other| other.as_ref() == Some(name))
        .then_some(name.as_str())
}
