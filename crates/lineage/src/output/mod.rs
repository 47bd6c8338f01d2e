//! Output formatting for CLI commands.
//!
//! Trees, diagnostics, and load warnings are printed either as text for a
//! terminal or as JSON for programmatic use.
//!
//! Submodules:
//! - [`tree`]: Ancestor tree rendering with ASCII/Unicode connectors

pub mod tree;

use crate::display::DisplayTree;
use crate::gateway::jsonl::LoadWarning;
use crate::mutation::MutationOutcome;
use crate::traversal::Diagnostic;
use colored::Colorize;
use std::env;
use std::io::{self, Write};

pub use tree::{life_span, print_tree_text};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only connectors instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with explicit values.
    pub fn new(use_ascii: bool, use_colors: bool) -> Self {
        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `LINEAGE_ASCII`: Set to "1" or "true" for ASCII-only connectors (default: false)
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `LINEAGE_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let use_ascii = match env::var("LINEAGE_ASCII") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Ok(v) => {
                tracing::warn!(
                    env_var = "LINEAGE_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            Err(_) => false,
        };

        // Respect NO_COLOR (https://no-color.org/), then LINEAGE_COLOR
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("LINEAGE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self {
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply dimmed style to text.
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Print a built tree to stdout in the specified format.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn print_tree(tree: &DisplayTree, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => {
            print_tree_text(&mut handle, &tree.root, &config)?;
            print_diagnostics(&mut handle, &tree.diagnostics, &config)
        }
        OutputMode::Json => {
            let output = serde_json::to_string_pretty(tree).map_err(io::Error::other)?;
            writeln!(handle, "{}", output)
        }
    }
}

/// Print build diagnostics as a trailing notes section.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn print_diagnostics<W: Write>(
    w: &mut W,
    diagnostics: &[Diagnostic],
    config: &OutputConfig,
) -> io::Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    writeln!(w, "{}", warning("Notes:", config))?;
    for diagnostic in diagnostics {
        let line = match diagnostic {
            Diagnostic::CycleSuppressed { child, ancestor } => format!(
                "skipped parent {} of {}: already a descendant on this branch",
                ancestor, child
            ),
            Diagnostic::BranchUnresolved {
                child,
                parent,
                reason,
            } => format!("skipped parent {} of {}: {}", parent, child, reason),
        };
        writeln!(w, "  {}", dimmed(&line, config))?;
    }
    Ok(())
}

/// Print record file warnings.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn print_load_warnings<W: Write>(
    w: &mut W,
    warnings: &[LoadWarning],
    config: &OutputConfig,
) -> io::Result<()> {
    for load_warning in warnings {
        let line = match load_warning {
            LoadWarning::MalformedJson { line_number, error } => {
                format!("line {}: malformed record skipped ({})", line_number, error)
            }
            LoadWarning::InvalidRecord { line_number, error } => {
                format!("line {}: invalid record skipped ({})", line_number, error)
            }
            LoadWarning::DuplicateRecord { id, line_number } => {
                format!("line {}: record {} replaces an earlier one", line_number, id)
            }
            LoadWarning::MissingParent { person, parent } => {
                format!("record {} lists unknown parent {}", person, parent)
            }
        };
        writeln!(w, "{} {}", warning("warning:", config), line)?;
    }
    Ok(())
}

/// Print the result of an accepted parent edit, followed by the rebuilt
/// tree when there is one.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn print_mutation(
    outcome: &MutationOutcome,
    tree: Option<&DisplayTree>,
    mode: OutputMode,
) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => {
            let icon = if config.use_ascii { "+" } else { "✓" };
            writeln!(
                handle,
                "{} Added {} as a parent of {}",
                success(icon, &config),
                outcome.parent,
                outcome.child
            )?;
            if let Some(tree) = tree {
                writeln!(handle)?;
                print_tree_text(&mut handle, &tree.root, &config)?;
                print_diagnostics(&mut handle, &tree.diagnostics, &config)?;
            }
            Ok(())
        }
        OutputMode::Json => {
            let output = serde_json::json!({
                "child": outcome.child,
                "parent": outcome.parent,
                "rebuild": outcome.rebuild,
                "tree": tree,
            });
            let output = serde_json::to_string_pretty(&output).map_err(io::Error::other)?;
            writeln!(handle, "{}", output)
        }
    }
}
