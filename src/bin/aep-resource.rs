//! AEP Resource CLI
//!
//! Command-line interface for classifying and linting OpenAPI operations
//! that act on annotated resources.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aep_resource::{
    custom_method_base, find_resource_schema, lint, list_pattern, load_document_auto,
    normalize_path, operations, path_matches_singleton_list_pattern,
    path_matches_singleton_pattern, resolve_ref, should_lint_operation, singleton_patterns,
    FileStatus, LintOptions, Method, Rule, Severity,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

#[derive(Parser)]
#[command(name = "aep-resource")]
#[command(about = "Classify and lint OpenAPI operations on AEP resources")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint OpenAPI documents with the built-in resource rules
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,

        /// Skip a rule by name (repeatable)
        #[arg(long, value_name = "RULE")]
        disable: Vec<String>,
    },

    /// Report, per operation, whether it acts on an annotated resource
    Classify {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the node a JSON Pointer reference resolves to
    Resolve {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Reference such as #/components/schemas/Book
        pointer: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check a path against the document's singleton patterns
    Singleton {
        /// Document source: file path or URL (http:// or https://)
        document: String,

        /// Request path such as /publishers/123/config
        path: String,
    },
}

/// One row of `classify` output.
#[derive(Serialize)]
struct Classification<'a> {
    path: &'a str,
    method: Method,
    schema_found: bool,
    lintable: bool,
    custom_method: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
            disable,
        } => run_lint(&path, &format, strict, quiet, disable),
        Commands::Classify { document, pretty } => run_classify(&document, pretty),
        Commands::Resolve {
            document,
            pointer,
            pretty,
        } => run_resolve(&document, &pointer, pretty),
        Commands::Singleton { document, path } => run_singleton(&document, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Install a stderr subscriber.
///
/// `-v` selects debug and `-vv` trace; otherwise `AEP_RESOURCE_LOG` is read,
/// defaulting to `warn`. `AEP_RESOURCE_LOG_FORMAT=json` emits JSON lines.
fn init_tracing(verbosity: u8) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => std::env::var("AEP_RESOURCE_LOG").unwrap_or_else(|_| "warn".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let env_filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_format = std::env::var("AEP_RESOURCE_LOG_FORMAT")
        .map_or_else(|_| "text".to_string(), |s| s.to_lowercase());

    if log_format == "json" {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

fn load(source: &str) -> Result<Value, u8> {
    load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, u8> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })
}

fn run_classify(source: &str, pretty: bool) -> Result<(), u8> {
    let document = load(source)?;

    let mut rows = Vec::new();
    if let Some(paths) = document.get("paths").and_then(|p| p.as_object()) {
        for (path, path_item) in paths {
            for (method, operation) in operations(path_item) {
                rows.push(Classification {
                    path,
                    method,
                    schema_found: find_resource_schema(operation, method, path_item, &document)
                        .is_some(),
                    lintable: should_lint_operation(operation, method, path, path_item, &document),
                    custom_method: custom_method_base(path).is_some(),
                });
            }
        }
    } else {
        debug!(source, "document has no paths table");
    }

    println!("{}", to_json(&rows, pretty)?);
    Ok(())
}

fn run_resolve(source: &str, pointer: &str, pretty: bool) -> Result<(), u8> {
    let document = load(source)?;

    match resolve_ref(pointer, &document) {
        Some(node) => {
            println!("{}", to_json(node, pretty)?);
            Ok(())
        }
        None => {
            eprintln!("Error: reference not found: {}", pointer);
            Err(1)
        }
    }
}

fn run_singleton(source: &str, path: &str) -> Result<(), u8> {
    let document = load(source)?;
    let patterns = singleton_patterns(&document);

    let output = serde_json::json!({
        "path": normalize_path(path),
        "singleton": path_matches_singleton_pattern(path, &document),
        "singleton_list": path_matches_singleton_list_pattern(path, &document),
        "patterns": patterns,
        "list_patterns": patterns.iter().map(|p| list_pattern(p)).collect::<Vec<_>>(),
    });
    println!("{}", to_json(&output, true)?);
    Ok(())
}

fn run_lint(
    path: &Path,
    format: &str,
    strict: bool,
    quiet: bool,
    disable: Vec<String>,
) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let mut options = LintOptions::new().strict(strict);
    for name in disable {
        if Rule::parse(&name).is_none() {
            let known: Vec<&str> = Rule::ALL.iter().map(|r| r.name()).collect();
            eprintln!(
                "Error: unknown rule '{}' (known rules: {})",
                name,
                known.join(", ")
            );
            return Err(2);
        }
        options = options.disable(name);
    }

    let result = lint(path, &options);

    if format == "json" {
        println!("{}", to_json(&result, true)?);
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m {}: {} - {}",
                        color, label, diag.code, diag.rule, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
