//! Singleton path pattern matching.
//!
//! Singleton resources declare the paths they live at in their resource
//! descriptor (`patterns`), with `{name}` placeholders for parent ids.
//! Rules use these to exempt singletons from collection-style checks.

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::PatternError;
use crate::types::{ResourceAnnotation, SINGLETON_LIST_SUFFIX};

/// Collect the patterns of every singleton resource schema in `components/schemas`.
///
/// Only structured annotations with `singleton: true` contribute; patterns
/// are returned in schema definition order.
pub fn singleton_patterns(document: &Value) -> Vec<String> {
    let Some(schemas) = document
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.as_object())
    else {
        return Vec::new();
    };

    schemas
        .values()
        .filter_map(ResourceAnnotation::from_schema)
        .filter_map(|annotation| match annotation {
            ResourceAnnotation::Descriptor(d) if d.singleton => Some(d.patterns),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Normalize a path or pattern.
///
/// Trims surrounding whitespace, ensures a single leading `/` and collapses
/// runs of `/`. Only an empty input stays empty; whitespace alone becomes `/`.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let trimmed = path.trim();

    let mut normalized = String::with_capacity(trimmed.len() + 1);
    normalized.push('/');
    for c in trimmed.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}

/// Compile a path pattern into an anchored regular expression.
///
/// Literal text is matched exactly; each `{name}` placeholder matches one
/// or more characters other than `/`.
///
/// # Errors
///
/// Returns `PatternError::Empty` for a blank pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex, PatternError> {
    let normalized = normalize_path(pattern);
    if normalized.is_empty() {
        return Err(PatternError::Empty);
    }

    let mut expr = String::from("^");
    let mut rest = normalized.as_str();
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        // A placeholder needs a closing brace before the next segment boundary
        let close = after
            .find(|c| c == '}' || c == '/')
            .filter(|&i| i > 0 && after[i..].starts_with('}'));
        match close {
            Some(close) => {
                expr.push_str(&regex::escape(&rest[..open]));
                expr.push_str("[^/]+");
                rest = &after[close + 1..];
            }
            None => {
                expr.push_str(&regex::escape(&rest[..=open]));
                rest = after;
            }
        }
    }
    expr.push_str(&regex::escape(rest));
    expr.push('$');

    Regex::new(&expr).map_err(|source| PatternError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Derive the list variant of a singleton pattern.
///
/// The final `/segment` is replaced by `/-/configs`. The suffix is fixed
/// regardless of the singleton's own name; patterns without a `/` are
/// returned unchanged.
pub fn list_pattern(pattern: &str) -> String {
    match pattern.rfind('/') {
        Some(idx) if idx + 1 < pattern.len() => {
            format!("{}{}", &pattern[..idx], SINGLETON_LIST_SUFFIX)
        }
        _ => pattern.to_string(),
    }
}

/// Check whether a path is addressed by any singleton pattern in the document.
pub fn path_matches_singleton_pattern(path: &str, document: &Value) -> bool {
    matches_any(path, singleton_patterns(document))
}

/// Check whether a path matches the list variant of any singleton pattern.
pub fn path_matches_singleton_list_pattern(path: &str, document: &Value) -> bool {
    let patterns = singleton_patterns(document)
        .iter()
        .map(|p| list_pattern(p))
        .collect::<Vec<_>>();
    matches_any(path, patterns)
}

fn matches_any(path: &str, patterns: Vec<String>) -> bool {
    let normalized = normalize_path(path);
    if normalized.is_empty() {
        return false;
    }

    patterns
        .iter()
        .any(|pattern| match compile_pattern(pattern) {
            Ok(regex) => regex.is_match(&normalized),
            Err(e) => {
                warn!(pattern = pattern.as_str(), error = %e, "skipping singleton pattern");
                false
            }
        })
}
