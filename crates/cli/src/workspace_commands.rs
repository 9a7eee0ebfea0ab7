//! CLI commands for the project inventory and workspace links.

use std::{path::PathBuf, sync::Arc};

use {
    aios_config::AiosConfig,
    aios_projects::{FsWorkspaceLinks, Inventory, Orchestrator},
    clap::Subcommand,
    tokio_util::sync::CancellationToken,
};

use crate::print_json;

#[derive(Subcommand)]
pub enum WorkspaceAction {
    /// Add a project directory to the inventory.
    Track { path: PathBuf },
    /// Remove a project by id or path.
    Untrack { selector: String },
    /// List tracked projects.
    List,
    /// Show one project's link status, by id or path.
    Inspect { selector: String },
    /// Report the status of every workspace link. Fails when unhealthy.
    Validate,
    /// Show what `repair` would do.
    Plan,
    /// Create missing links and retarget broken ones. Conflicts are kept.
    Repair,
}

pub async fn handle_workspace(
    action: WorkspaceAction,
    config: &AiosConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let inventory = Arc::new(Inventory::new(&config.workspace_dir));
    let orchestrator = Orchestrator::new(
        &config.workspace_dir,
        inventory.clone(),
        Arc::new(FsWorkspaceLinks),
    );

    match action {
        WorkspaceAction::Track { path } => print_json(&inventory.track(&path, cancel).await?)?,
        WorkspaceAction::Untrack { selector } => {
            print_json(&inventory.untrack(&selector, cancel).await?)?
        },
        WorkspaceAction::List => print_json(&inventory.list(cancel).await?)?,
        WorkspaceAction::Inspect { selector } => {
            print_json(&orchestrator.inspect_project(&selector, cancel).await?)?
        },
        WorkspaceAction::Validate => {
            let report = orchestrator.validate(cancel).await?;
            print_json(&report)?;
            if !report.healthy {
                anyhow::bail!("workspace links are unhealthy");
            }
        },
        WorkspaceAction::Plan => print_json(&orchestrator.plan(cancel).await?)?,
        WorkspaceAction::Repair => print_json(&orchestrator.repair(cancel).await?)?,
    }

    Ok(())
}
