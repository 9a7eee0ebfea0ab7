use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::prompt::PromptDocument;

// ── Skill spec ───────────────────────────────────────────────────────────────

/// Identity and schema references parsed from `skill.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSpec {
    /// Sanitized identifier: lowercase `[a-z0-9-]`, 1-255 bytes.
    pub id: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Strict semver.
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Input schema path, relative to the skill directory.
    pub input_schema_rel: String,
    /// Output schema path, relative to the skill directory.
    pub output_schema_rel: String,
}

impl SkillSpec {
    /// Name shown to agents: the display name when present, else the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// A `fixture_<k>.json` / `expected_<k>.json` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixturePair {
    /// The `<k>` suffix shared by both files.
    pub name: String,
    pub fixture: PathBuf,
    pub expected: PathBuf,
}

/// A validated skill directory and its on-disk companions.
#[derive(Debug, Clone)]
pub struct SkillArtifact {
    pub root: PathBuf,
    pub spec: SkillSpec,
    pub prompt: PromptDocument,
    pub input_schema: serde_json::Value,
    pub output_schema: serde_json::Value,
    pub fixtures: Vec<FixturePair>,
}

// ── Installer results ────────────────────────────────────────────────────────

/// Outcome of installing a skill into a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    pub skill_id: String,
    pub canonical_path: PathBuf,
    /// Names of the agents the skill is now visible to, in registry order.
    pub agents: Vec<String>,
}

/// Outcome of removing a skill from a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UninstallResult {
    pub skill_id: String,
    pub removed: Vec<PathBuf>,
    /// Entries left in place because the installer did not create them.
    pub skipped_foreign: Vec<PathBuf>,
}

/// Dry-run write targets for a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub skill_id: String,
    /// Canonical directory first, then one entry per non-universal agent.
    pub writes: Vec<PathBuf>,
}
