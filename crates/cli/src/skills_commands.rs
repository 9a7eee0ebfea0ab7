//! CLI commands for skill authoring and distribution.

use std::path::PathBuf;

use {
    aios_config::AiosConfig,
    aios_skills::{
        FsSkillInstaller, SkillInstaller,
        fixtures::{ExecutionReportStore, FileExecutionReportStore, StubExecutor, run_fixtures},
        lint::lint_dir,
        sync::{build_sync_plan, sync_skill, uninstall},
    },
    clap::Subcommand,
    serde_json::json,
    tokio_util::sync::CancellationToken,
};

use crate::print_json;

#[derive(Subcommand)]
pub enum SkillAction {
    /// Check a skill directory for spec, prompt, fixture and credential problems.
    Lint {
        /// Skill directory containing skill.yaml.
        dir: PathBuf,
    },
    /// Show the paths a sync would write, without writing anything.
    Plan { dir: PathBuf },
    /// Build SKILL.md and install it for every (or the selected) agent.
    Sync {
        dir: PathBuf,
        /// Limit installation to these agents (repeatable).
        #[arg(long = "agent")]
        agents: Vec<String>,
    },
    /// Remove an installed skill from the project.
    Uninstall { id: String },
    /// List skills installed in the project.
    List,
    /// Run the skill's fixtures through the stub executor.
    Test {
        dir: PathBuf,
        /// Persist the run report under the workspace.
        #[arg(long)]
        save: bool,
    },
    /// List known agents and whether each is detected in the project.
    Agents,
}

pub async fn handle_skills(
    action: SkillAction,
    config: &AiosConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let installer = FsSkillInstaller::from_registry()?;
    let project_dir = config.project_dir.as_path();

    match action {
        SkillAction::Lint { dir } => {
            let report = lint_dir(&dir, cancel)?;
            print_json(&report)?;
            if !report.valid {
                anyhow::bail!("{} lint issue(s) in {}", report.issues.len(), dir.display());
            }
        },
        SkillAction::Plan { dir } => {
            print_json(&build_sync_plan(&installer, &dir, project_dir)?)?;
        },
        SkillAction::Sync { dir, agents } => {
            let targets = aios_agents::resolve_targets(installer.agents(), &agents)?;
            let targets = (!agents.is_empty()).then_some(targets.as_slice());
            let result = sync_skill(&installer, &dir, project_dir, targets, cancel).await?;
            print_json(&result)?;
        },
        SkillAction::Uninstall { id } => {
            print_json(&uninstall(&installer, &id, project_dir, cancel).await?)?;
        },
        SkillAction::List => {
            let skills = installer.collect_installed_skills(project_dir, cancel).await?;
            print_json(&skills)?;
        },
        SkillAction::Test { dir, save } => {
            let report = run_fixtures(&dir, &StubExecutor, cancel).await?;
            if save {
                let store = FileExecutionReportStore::new(&config.workspace_dir);
                let path = store.save(&report).await?;
                tracing::info!(path = %path.display(), "saved fixture report");
            }
            print_json(&report)?;
            if !report.passed() {
                anyhow::bail!("{} fixture(s) failed for {}", report.failed, report.skill_id);
            }
        },
        SkillAction::Agents => {
            let detected = aios_agents::detect_in_folder(installer.agents(), project_dir);
            let rows: Vec<_> = installer
                .agents()
                .iter()
                .map(|agent| {
                    json!({
                        "name": agent.name,
                        "display_name": agent.display_name,
                        "skills_dir": agent.skills_dir,
                        "universal": agent.universal,
                        "detected": detected.iter().any(|d| d.name == agent.name),
                    })
                })
                .collect();
            print_json(&rows)?;
        },
    }

    Ok(())
}
