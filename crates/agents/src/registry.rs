use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use {
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Shared project-relative directory read by universal agents and holding
/// the canonical copy of every installed skill.
pub const CANONICAL_SKILLS_DIR: &str = ".agents/skills";

const EMBEDDED_CATALOG: &str = include_str!("agents.yaml");

/// A target agent and its skill-directory conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Machine identifier, unique across the catalog.
    pub name: String,
    pub display_name: String,
    /// Project-relative directory the agent reads skills from.
    pub skills_dir: String,
    /// Secondary project-relative read locations.
    #[serde(default)]
    pub alt_skills_dirs: Vec<String>,
    /// User-scope skills directory; may contain `~` / `$VAR` placeholders.
    #[serde(default)]
    pub global_skills_dir: Option<String>,
    /// Existence probes used for detection.
    #[serde(default)]
    pub detect_paths: Vec<String>,
    /// Reads skills straight from [`CANONICAL_SKILLS_DIR`].
    #[serde(default)]
    pub universal: bool,
}

impl AgentDefinition {
    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidAgent {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.display_name.trim().is_empty() {
            return Err(invalid("display_name must not be empty"));
        }
        if self.skills_dir.trim().is_empty() {
            return Err(invalid("skills_dir must not be empty"));
        }
        if Path::new(&self.skills_dir).is_absolute() {
            return Err(invalid("skills_dir must be project-relative"));
        }
        if Path::new(&self.skills_dir)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(invalid("skills_dir must stay inside the project"));
        }
        match (self.universal, self.skills_dir == CANONICAL_SKILLS_DIR) {
            (true, false) => Err(invalid("universal agents must use .agents/skills")),
            (false, true) => Err(invalid("non-universal agents must not use .agents/skills")),
            _ => Ok(()),
        }
    }

    /// `<project_dir>/<skills_dir>`.
    #[must_use]
    pub fn project_skills_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.skills_dir)
    }
}

#[derive(Deserialize)]
struct Catalog {
    agents: Vec<AgentDefinition>,
}

/// Parse and validate a YAML catalog.
pub fn parse_catalog(raw: &str) -> Result<Vec<AgentDefinition>> {
    let catalog: Catalog =
        serde_yaml::from_str(raw).map_err(|e| Error::Catalog(e.to_string()))?;

    let mut seen = HashSet::new();
    for agent in &catalog.agents {
        agent.validate()?;
        if !seen.insert(agent.name.as_str()) {
            return Err(Error::Duplicate(agent.name.clone()));
        }
    }
    Ok(catalog.agents)
}

/// Parse the embedded catalog. Prefer [`registry`] outside of tests.
pub fn load_all() -> Result<Vec<AgentDefinition>> {
    parse_catalog(EMBEDDED_CATALOG)
}

static REGISTRY: LazyLock<Result<Vec<AgentDefinition>>> = LazyLock::new(load_all);

/// Process-wide registry, loaded once.
pub fn registry() -> Result<&'static [AgentDefinition]> {
    REGISTRY.as_deref().map_err(Clone::clone)
}

pub fn filter_universal(agents: &[AgentDefinition]) -> Vec<&AgentDefinition> {
    agents.iter().filter(|a| a.universal).collect()
}

pub fn filter_non_universal(agents: &[AgentDefinition]) -> Vec<&AgentDefinition> {
    agents.iter().filter(|a| !a.universal).collect()
}

pub fn find<'a>(agents: &'a [AgentDefinition], name: &str) -> Option<&'a AgentDefinition> {
    agents.iter().find(|a| a.name == name)
}

/// Map agent names to definitions, keeping registry order and dropping
/// duplicates. An empty selection means every agent.
pub fn resolve_targets(
    agents: &[AgentDefinition],
    names: &[String],
) -> Result<Vec<AgentDefinition>> {
    if names.is_empty() {
        return Ok(agents.to_vec());
    }
    for name in names {
        if find(agents, name).is_none() {
            return Err(Error::UnknownAgent(name.clone()));
        }
    }
    Ok(agents
        .iter()
        .filter(|a| names.iter().any(|n| n == &a.name))
        .cloned()
        .collect())
}

/// Expanded user-scope skills directory, if the agent declares one.
pub fn global_skills_path(agent: &AgentDefinition) -> Option<PathBuf> {
    agent
        .global_skills_dir
        .as_deref()
        .map(aios_config::expand_path)
}

/// Agents with a footprint in `folder`.
///
/// An agent is detected when its `skills_dir` or any `alt_skills_dirs` entry
/// exists as a directory under `folder`, or when any of its expanded
/// `detect_paths` is an existing directory.
pub fn detect_in_folder(agents: &[AgentDefinition], folder: &Path) -> Vec<AgentDefinition> {
    agents
        .iter()
        .filter(|agent| {
            let in_project = std::iter::once(&agent.skills_dir)
                .chain(agent.alt_skills_dirs.iter())
                .any(|dir| folder.join(dir).is_dir());
            let probed = agent
                .detect_paths
                .iter()
                .any(|p| aios_config::expand_path(p).is_dir());
            if in_project || probed {
                debug!(agent = %agent.name, in_project, probed, "detected agent");
            }
            in_project || probed
        })
        .cloned()
        .collect()
}
