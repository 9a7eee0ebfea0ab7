//! Sync a skill directory into a project, or preview the sync.

use std::path::Path;

use {aios_agents::AgentDefinition, tokio_util::sync::CancellationToken, tracing::info};

use crate::{
    error::{Error, Result},
    install::SkillInstaller,
    prompt::PROMPT_FILENAME,
    spec,
    types::{InstallResult, SkillSpec, SyncPlan, UninstallResult},
};

fn load_validated(skill_dir: &Path) -> Result<SkillSpec> {
    let spec_path = spec::resolve_spec_path(skill_dir)?;
    let skill = spec::load_spec(&spec_path)?;
    spec::validate_spec(skill_dir, &skill)?;
    Ok(skill)
}

/// Paths a sync would write, without touching the filesystem.
pub fn build_sync_plan(
    installer: &dyn SkillInstaller,
    skill_dir: &Path,
    project_dir: &Path,
) -> Result<SyncPlan> {
    let skill = load_validated(skill_dir)?;
    let writes = installer.plan_write_targets(&skill.id, project_dir);
    Ok(SyncPlan {
        skill_id: skill.id,
        writes,
    })
}

/// Validate the skill, compose `SKILL.md` from the spec and `prompt.md`, and
/// install it into `project_dir`.
pub async fn sync_skill(
    installer: &dyn SkillInstaller,
    skill_dir: &Path,
    project_dir: &Path,
    targets: Option<&[AgentDefinition]>,
    cancel: &CancellationToken,
) -> Result<InstallResult> {
    aios_common::ensure_active(cancel)?;
    let skill = load_validated(skill_dir)?;

    let prompt_path = skill_dir.join(PROMPT_FILENAME);
    if !prompt_path.is_file() {
        return Err(Error::Invalid(format!(
            "missing {PROMPT_FILENAME} in {}",
            skill_dir.display()
        )));
    }
    let body = tokio::fs::read_to_string(&prompt_path)
        .await
        .map_err(Error::io("read", &prompt_path))?;
    let content = spec::build_skill_md(&skill, &body);

    aios_common::ensure_active(cancel)?;
    let result = installer
        .install(&skill.id, project_dir, Some(&content), targets, cancel)
        .await?;
    info!(skill_id = %result.skill_id, version = %skill.version, "synced skill");
    Ok(result)
}

pub async fn uninstall(
    installer: &dyn SkillInstaller,
    id: &str,
    project_dir: &Path,
    cancel: &CancellationToken,
) -> Result<UninstallResult> {
    installer.uninstall(id, project_dir, cancel).await
}
