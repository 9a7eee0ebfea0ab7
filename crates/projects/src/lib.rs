//! Tracked projects and the workspace links that point at them.
//!
//! The inventory lives at `<workspace>/projects/inventory.json`. Every
//! tracked project gets a symlink at `<workspace>/projects/links/<id>`;
//! [`links::Orchestrator`] reports, plans and repairs those links.

pub mod error;
pub mod inventory;
pub mod links;

pub use {
    error::{Error, Result},
    inventory::{Inventory, Project, ProjectSource},
    links::{FsWorkspaceLinks, LinkReport, LinkStatus, Orchestrator, PlanAction, WorkspaceLinks},
};
