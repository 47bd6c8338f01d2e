//! Command implementations.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::args::{AddParentArgs, TreeArgs};
use crate::config::LineageConfig;
use crate::controller::AncestryController;
use crate::domain::PersonId;
use crate::gateway::{InMemoryGateway, jsonl};
use crate::output::{self, OutputConfig, OutputMode};

/// Records file and configuration shared by every command.
pub struct Workspace {
    /// Loaded configuration
    pub config: LineageConfig,
    /// Gateway over the loaded records
    pub gateway: InMemoryGateway,
}

impl Workspace {
    /// Load `config_path` (defaults when absent) and the records file.
    ///
    /// Load warnings are printed to stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if the config or records file cannot be read.
    pub async fn open(records_path: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => LineageConfig::load(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => LineageConfig::default(),
        };

        let (records, warnings) = jsonl::load_records(records_path)
            .await
            .with_context(|| format!("Failed to read records {}", records_path.display()))?;

        if !warnings.is_empty() {
            let stderr = io::stderr();
            output::print_load_warnings(&mut stderr.lock(), &warnings, &OutputConfig::from_env())?;
        }
        tracing::debug!(records = records.len(), "Opened records file");

        let gateway = InMemoryGateway::with_records(records, config.gateway.clone());
        Ok(Self { config, gateway })
    }

    fn controller(&self) -> AncestryController {
        AncestryController::new(Arc::new(self.gateway.clone()), self.config.traversal.clone())
    }
}

/// Execute the `tree` command
///
/// # Errors
///
/// Returns an error if the build fails or output cannot be written.
pub async fn execute_tree(workspace: &Workspace, args: &TreeArgs, mode: OutputMode) -> Result<()> {
    let controller = workspace.controller();
    let tree = controller
        .build_tree(PersonId::new(args.root.as_str()), args.depth)
        .await?;

    output::print_tree(&tree, mode)?;
    Ok(())
}

/// Execute the `add-parent` command
///
/// # Errors
///
/// Returns an error if the edit is rejected or the rebuild fails. Saving
/// the records can fail too.
pub async fn execute_add_parent(
    workspace: &Workspace,
    args: &AddParentArgs,
    records_path: &Path,
    mode: OutputMode,
) -> Result<()> {
    let controller = workspace.controller();
    let child = PersonId::new(args.child.as_str());
    let parent = PersonId::new(args.parent.as_str());

    controller.build_tree(child.clone(), args.depth).await?;
    let outcome = controller.request_add_parent(&child, &parent).await?;

    let tree = match outcome.rebuild {
        Some(generation) => Some(controller.session().wait_for_tree(generation).await?),
        None => None,
    };

    if args.save {
        jsonl::save_records(&workspace.gateway.records().await, records_path).await?;
        tracing::info!(path = %records_path.display(), "Saved records");
    }

    output::print_mutation(&outcome, tree.as_deref(), mode)?;
    Ok(())
}
