//! Agent registry: the catalog of AI coding assistants that consume skills
//! and the project-relative directory each one reads them from.
//!
//! The catalog is embedded at build time, validated on first use, and never
//! mutated afterwards.

pub mod error;
pub mod registry;

pub use {
    error::{Error, Result},
    registry::{
        AgentDefinition, CANONICAL_SKILLS_DIR, detect_in_folder, filter_non_universal,
        filter_universal, find, global_skills_path, load_all, parse_catalog, registry,
        resolve_targets,
    },
};
