//! Core types for resource annotation resolution.

use serde::Serialize;
use serde_json::Value;

/// Extension key carrying the resource annotation on a schema.
pub const RESOURCE_ANNOTATION: &str = "x-aep-resource";

/// Content type whose body schema represents the resource payload.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Response status inspected for `get` operations.
pub const SUCCESS_STATUS: &str = "200";

/// Suffix substituted for the last segment of a singleton pattern to form its list variant.
pub const SINGLETON_LIST_SUFFIX: &str = "/-/configs";

/// HTTP method of an operation within a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Method {
    /// All methods in the order path items are scanned.
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
        Method::Head,
    ];

    /// Parse a method name as it appears as a path item key.
    ///
    /// Matching is case-sensitive: only lowercase names are operation keys.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "get" => Some(Method::Get),
            "post" => Some(Method::Post),
            "put" => Some(Method::Put),
            "patch" => Some(Method::Patch),
            "delete" => Some(Method::Delete),
            "options" => Some(Method::Options),
            "head" => Some(Method::Head),
            _ => None,
        }
    }

    /// Returns the path item key for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
        }
    }

    /// Whether the resource payload of this method travels in the request body.
    pub fn carries_request_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured form of the resource annotation.
///
/// Built by [`ResourceAnnotation::from_schema`], which reads every field
/// leniently; the structured form alone marks the owning schema as a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub singular: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    /// Canonical type identifier (e.g. `library.example.com/book`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    pub singleton: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

/// The resource annotation in either of its accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAnnotation {
    /// `true` or a bare type-name string. Carries no further data.
    LegacyMarker,
    /// Structured record.
    Descriptor(ResourceDescriptor),
}

impl ResourceAnnotation {
    /// Read the annotation carried directly by `schema`, if any.
    ///
    /// Only `true`, a non-empty string or an object count. `false`, `null`,
    /// numbers, arrays and empty strings are treated as absent, including
    /// values such as `1` or `["x"]` that a truthiness check would accept.
    /// An object whose fields have unexpected types still counts as a
    /// descriptor, with the malformed fields left at their defaults.
    pub fn from_schema(schema: &Value) -> Option<Self> {
        match schema.get(RESOURCE_ANNOTATION)? {
            Value::Bool(true) => Some(Self::LegacyMarker),
            Value::String(s) if !s.is_empty() => Some(Self::LegacyMarker),
            Value::Object(map) => Some(Self::Descriptor(lenient_descriptor(map))),
            _ => None,
        }
    }

    /// Returns the descriptor when the annotation is structured.
    pub fn descriptor(&self) -> Option<&ResourceDescriptor> {
        match self {
            Self::Descriptor(d) => Some(d),
            Self::LegacyMarker => None,
        }
    }

    /// Whether this annotation declares a singleton. Legacy markers never do.
    pub fn is_singleton(&self) -> bool {
        self.descriptor().is_some_and(|d| d.singleton)
    }
}

fn lenient_descriptor(map: &serde_json::Map<String, Value>) -> ResourceDescriptor {
    let string_list = |key: &str| -> Vec<String> {
        map.get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    };
    let string = |key: &str| map.get(key).and_then(|v| v.as_str()).map(String::from);

    ResourceDescriptor {
        singular: string("singular"),
        plural: string("plural"),
        resource_type: string("type"),
        parents: string_list("parents"),
        singleton: map.get("singleton") == Some(&Value::Bool(true)),
        patterns: string_list("patterns"),
    }
}

/// Options for a lint run.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// When true, warnings count as failures.
    pub strict: bool,
    /// Rule names that are skipped.
    pub disabled_rules: Vec<String>,
}

impl LintOptions {
    /// Create lint options with every rule enabled and strict mode off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Skip the named rule.
    pub fn disable(mut self, rule: impl Into<String>) -> Self {
        self.disabled_rules.push(rule.into());
        self
    }

    /// Whether the named rule runs under these options.
    pub fn is_enabled(&self, rule: &str) -> bool {
        !self.disabled_rules.iter().any(|r| r == rule)
    }
}
