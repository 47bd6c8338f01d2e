//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `tree`: Print the ancestor tree of a person
//! - `add-parent`: Link a parent to a person and print the rebuilt tree
//!
//! # Global Flags
//!
//! - `--records`: JSONL records file (default `people.jsonl`)
//! - `--config`: YAML configuration file
//! - `--json`: Output in JSON format
//!
//! # Example
//!
//! ```bash
//! lineage --records family.jsonl tree 7 --depth 3
//! lineage add-parent 7 99 --save
//! ```

mod args;
mod execute;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{AddParentArgs, TreeArgs, validate_depth, validate_person_id};
pub use execute::Workspace;

/// Default records file name
pub const DEFAULT_RECORDS_FILE: &str = "people.jsonl";

/// Lineage - ancestor trees over genealogy records
///
/// Builds pedigree trees from a JSON Lines file of person records, one
/// record per line.
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Person records file (JSON Lines)
    #[arg(short, long, global = true, default_value = DEFAULT_RECORDS_FILE)]
    pub records: PathBuf,

    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the ancestor tree of a person
    ///
    /// Parents are nested under each person, up to the requested number of
    /// generations. Cyclic or unresolvable parent links are skipped and
    /// listed as notes.
    Tree(TreeArgs),

    /// Link a parent to a person
    ///
    /// Applies the edit, then rebuilds and prints the child's tree.
    AddParent(AddParentArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns a clap error for invalid or missing arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be opened or the command fails.
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let workspace = Workspace::open(&self.records, self.config.as_deref()).await?;

        match &self.command {
            Commands::Tree(args) => execute::execute_tree(&workspace, args, output_mode).await,
            Commands::AddParent(args) => {
                execute::execute_add_parent(&workspace, args, &self.records, output_mode).await
            }
        }
    }
}
