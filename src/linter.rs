//! Document linting - applies the built-in rules to OpenAPI files.
//!
//! Reports:
//! - Syntax errors (file is neither JSON nor YAML)
//! - Rule violations on operations that act on annotated resources

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::loader::{is_yaml_path, load_document};
use crate::rules::{PathTarget, Rule};
use crate::types::LintOptions;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// Name of the rule that produced this diagnostic.
    pub rule: String,
    /// JSON Pointer to the issue (e.g., "/paths/~1books/get/requestBody")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint an in-memory document.
///
/// Walks the paths table in document order and runs every enabled rule
/// against each path item.
pub fn lint_document(document: &Value, options: &LintOptions) -> Vec<Diagnostic> {
    let Some(paths) = document.get("paths").and_then(|p| p.as_object()) else {
        debug!("document has no paths table");
        return Vec::new();
    };

    let rules: Vec<Rule> = Rule::ALL
        .into_iter()
        .filter(|rule| options.is_enabled(rule.name()))
        .collect();

    let mut diagnostics = Vec::new();
    for (path, path_item) in paths {
        if !path_item.is_object() {
            continue;
        }
        let target = PathTarget::new(path, path_item, document);
        for rule in &rules {
            diagnostics.extend(rule.check(&target));
        }
    }
    diagnostics
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json, .yaml and .yml files.
/// If `options.strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, options: &LintOptions) -> LintResult {
    let files = collect_document_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path, options);
        let file_errors = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        let file_warnings = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();

        total_errors += file_errors;
        total_warnings += file_warnings;
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if options.strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path, options: &LintOptions) -> FileResult {
    // Linting a single file passes the file itself as base
    let display_path = match file.strip_prefix(base_path) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
        _ => file.to_path_buf(),
    };

    let document = match load_document(file) {
        Ok(d) => d,
        Err(e) => {
            return FileResult {
                file: display_path,
                status: FileStatus::Error,
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    code: "E001".to_string(),
                    rule: "syntax".to_string(),
                    path: "/".to_string(),
                    message: format!("syntax error: {}", e),
                }],
            };
        }
    };

    let diagnostics = lint_document(&document, options);

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display_path,
        status,
        diagnostics,
    }
}

/// Collect all document files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_document_file(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_document_file(&path) {
            files.push(path);
        }
    }
}

fn is_document_file(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false) || is_yaml_path(path)
}
