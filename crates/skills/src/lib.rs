//! Skills: validated declarative artifacts distributed to AI coding agents.
//!
//! A skill directory holds a `skill.yaml` spec, a `prompt.md`, an input and
//! an output JSON Schema, and paired fixtures under `tests/`. Installing a
//! skill writes one canonical copy under `<project>/.agents/skills/<id>` and
//! publishes a relative symlink to it in every non-universal agent's skills
//! directory.

pub mod error;
pub mod fixtures;
pub mod install;
pub mod lint;
pub mod prompt;
pub mod spec;
pub mod sync;
pub mod types;

pub use {
    error::{Error, Result},
    install::{FsSkillInstaller, SkillInstaller},
    types::{InstallResult, SkillArtifact, SkillSpec, SyncPlan, UninstallResult},
};
