//! Error types for document loading and pattern compilation.
//!
//! Resolution itself never fails: absence is reported as `None`/`false`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading an OpenAPI document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported YAML value at {path}: {message}")]
    UnsupportedYaml { path: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors compiling a singleton path pattern into a matcher.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("invalid pattern \"{pattern}\": {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
