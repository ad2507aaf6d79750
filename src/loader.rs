//! Document loading from various sources.
//!
//! Handles loading OpenAPI documents in JSON or YAML from files, strings,
//! and HTTP URLs. Every document ends up as a `serde_json::Value`.

use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a document from a file path.
///
/// `.yaml` and `.yml` files are parsed as YAML; anything else is parsed as
/// JSON first and as YAML if that fails.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content is neither JSON nor YAML.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if is_yaml_path(path) {
        parse_yaml(&content)
    } else {
        load_document_str(&content)
    }
}

/// Load a document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the content looks like JSON but isn't
/// valid, or a YAML error otherwise.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        // YAML is a superset of JSON; only report JSON errors for JSON-looking input
        Err(source) if looks_like_json(content) => Err(LoadError::InvalidJson { source }),
        Err(_) => parse_yaml(content),
    }
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or a parse error
/// if the body is neither JSON nor YAML.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client.get(url).send().map_err(network_error)?;

    // Check for HTTP errors before parsing
    let body = response
        .error_for_status()
        .map_err(network_error)?
        .text()
        .map_err(network_error)?;

    load_document_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Whether a path has a YAML file extension.
pub(crate) fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

fn looks_like_json(content: &str) -> bool {
    matches!(content.trim_start().chars().next(), Some('{') | Some('['))
}

fn parse_yaml(content: &str) -> Result<Value, LoadError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })?;
    yaml_to_json(yaml, "")
}

/// Convert a YAML value to JSON.
///
/// Mapping keys are stringified so unquoted status codes (`200:`) and
/// boolean keys survive as object keys.
fn yaml_to_json(value: serde_yaml::Value, path: &str) -> Result<Value, LoadError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n, path)?,
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .enumerate()
                .map(|(i, item)| yaml_to_json(item, &format!("{}/{}", path, i)))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, item) in mapping {
                let key = yaml_key(key, path)?;
                let child = yaml_to_json(item, &format!("{}/{}", path, key))?;
                map.insert(key, child);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value, path)?,
    })
}

fn yaml_key(key: serde_yaml::Value, path: &str) -> Result<String, LoadError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value, path),
        Yaml::Sequence(_) | Yaml::Mapping(_) => Err(LoadError::UnsupportedYaml {
            path: path.to_string(),
            message: "mapping key must be a scalar".to_string(),
        }),
    }
}

fn yaml_number(n: &serde_yaml::Number, path: &str) -> Result<Value, LoadError> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Number(i.into()));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Value::Number(u.into()));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| LoadError::UnsupportedYaml {
            path: path.to_string(),
            message: format!("number {} has no JSON representation", n),
        })
}
