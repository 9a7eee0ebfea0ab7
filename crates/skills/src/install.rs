//! Skill installer: one canonical copy per project, linked into every
//! non-universal agent's skills directory.

use std::{
    collections::BTreeSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use {
    aios_agents::{AgentDefinition, CANONICAL_SKILLS_DIR},
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    walkdir::WalkDir,
};

use crate::{
    error::{Context, Error, Result},
    spec::sanitize,
    types::{InstallResult, UninstallResult},
};

pub const SKILL_MD: &str = "SKILL.md";

/// Materializes skills into a project and removes them again.
#[async_trait]
pub trait SkillInstaller: Send + Sync {
    /// Install `id` into `project_dir`.
    ///
    /// `skill_content` overwrites `SKILL.md` when non-empty; otherwise a stub
    /// is written only if no `SKILL.md` exists. `targets` defaults to every
    /// registered agent.
    async fn install(
        &self,
        id: &str,
        project_dir: &Path,
        skill_content: Option<&str>,
        targets: Option<&[AgentDefinition]>,
        cancel: &CancellationToken,
    ) -> Result<InstallResult>;

    /// Remove the published entries and the canonical directory. Missing
    /// paths are not an error.
    async fn uninstall(
        &self,
        id: &str,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<UninstallResult>;

    /// Canonical directory first, then one entry per non-universal agent in
    /// registry order. Never touches the filesystem.
    fn plan_write_targets(&self, id: &str, project_dir: &Path) -> Vec<PathBuf>;

    /// Sorted, deduplicated ids visible in the canonical directory and in
    /// every non-universal agent directory.
    async fn collect_installed_skills(
        &self,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>>;
}

/// `<project_dir>/.agents/skills/<sanitized id>`.
#[must_use]
pub fn canonical_path(id: &str, project_dir: &Path) -> PathBuf {
    project_dir.join(CANONICAL_SKILLS_DIR).join(sanitize(id))
}

/// `<project_dir>/<agent.skills_dir>/<sanitized id>`.
#[must_use]
pub fn agent_entry_path(agent: &AgentDefinition, id: &str, project_dir: &Path) -> PathBuf {
    agent.project_skills_dir(project_dir).join(sanitize(id))
}

/// Filesystem-backed installer over a fixed agent list.
#[derive(Debug, Clone)]
pub struct FsSkillInstaller {
    agents: Vec<AgentDefinition>,
}

impl FsSkillInstaller {
    pub fn new(agents: Vec<AgentDefinition>) -> Self {
        Self { agents }
    }

    /// Installer over the embedded agent registry.
    pub fn from_registry() -> Result<Self> {
        Ok(Self::new(aios_agents::registry()?.to_vec()))
    }

    pub fn agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    fn non_universal(&self) -> impl Iterator<Item = &AgentDefinition> {
        self.agents.iter().filter(|a| !a.universal)
    }
}

#[async_trait]
impl SkillInstaller for FsSkillInstaller {
    async fn install(
        &self,
        id: &str,
        project_dir: &Path,
        skill_content: Option<&str>,
        targets: Option<&[AgentDefinition]>,
        cancel: &CancellationToken,
    ) -> Result<InstallResult> {
        aios_common::ensure_active(cancel)?;
        let skill_id = sanitize(id);
        let canonical = canonical_path(&skill_id, project_dir);
        tokio::fs::create_dir_all(&canonical)
            .await
            .map_err(Error::io("create", &canonical))?;

        let skill_md = canonical.join(SKILL_MD);
        match skill_content.filter(|c| !c.trim().is_empty()) {
            Some(content) => {
                tokio::fs::write(&skill_md, content)
                    .await
                    .map_err(Error::io("write", &skill_md))?;
            },
            None if !path_exists(&skill_md).await => {
                tokio::fs::write(&skill_md, stub_skill_md(&skill_id))
                    .await
                    .map_err(Error::io("write", &skill_md))?;
            },
            None => debug!(path = %skill_md.display(), "keeping existing SKILL.md"),
        }

        let targets = targets.unwrap_or(self.agents.as_slice());
        let mut agents = Vec::with_capacity(targets.len());
        for agent in targets {
            aios_common::ensure_active(cancel)?;
            if !agent.universal {
                publish_entry(agent, &skill_id, project_dir, &canonical).await?;
            }
            agents.push(agent.name.clone());
        }

        info!(skill_id = %skill_id, agents = agents.len(), "installed skill");
        Ok(InstallResult {
            skill_id,
            canonical_path: canonical,
            agents,
        })
    }

    async fn uninstall(
        &self,
        id: &str,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<UninstallResult> {
        aios_common::ensure_active(cancel)?;
        let skill_id = sanitize(id);
        let canonical = canonical_path(&skill_id, project_dir);
        let mut result = UninstallResult {
            skill_id: skill_id.clone(),
            ..UninstallResult::default()
        };

        for agent in self.non_universal() {
            aios_common::ensure_active(cancel)?;
            let entry = agent_entry_path(agent, &skill_id, project_dir);
            match remove_owned_entry(&entry, &canonical).await? {
                Removal::Removed => result.removed.push(entry),
                Removal::Foreign => {
                    warn!(path = %entry.display(), "leaving foreign entry in place");
                    result.skipped_foreign.push(entry);
                },
                Removal::Absent => {},
            }
        }

        aios_common::ensure_active(cancel)?;
        match tokio::fs::remove_dir_all(&canonical).await {
            Ok(()) => result.removed.push(canonical),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => return Err(Error::io("remove", &canonical)(e)),
        }

        info!(skill_id = %skill_id, removed = result.removed.len(), "uninstalled skill");
        Ok(result)
    }

    fn plan_write_targets(&self, id: &str, project_dir: &Path) -> Vec<PathBuf> {
        std::iter::once(canonical_path(id, project_dir))
            .chain(
                self.non_universal()
                    .map(|agent| agent_entry_path(agent, id, project_dir)),
            )
            .collect()
    }

    async fn collect_installed_skills(
        &self,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        aios_common::ensure_active(cancel)?;
        let mut ids = BTreeSet::new();
        list_entries(&project_dir.join(CANONICAL_SKILLS_DIR), true, &mut ids).await?;
        for agent in self.non_universal() {
            aios_common::ensure_active(cancel)?;
            list_entries(&agent.project_skills_dir(project_dir), false, &mut ids).await?;
        }
        Ok(ids.into_iter().collect())
    }
}

fn stub_skill_md(skill_id: &str) -> String {
    format!("---\nname: {skill_id}\ndescription: {skill_id}\n---\n")
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

/// Replace whatever sits at the agent entry with a relative symlink to the
/// canonical directory, or a dot-free copy when symlinks are unavailable.
async fn publish_entry(
    agent: &AgentDefinition,
    skill_id: &str,
    project_dir: &Path,
    canonical: &Path,
) -> Result<()> {
    let agent_dir = agent.project_skills_dir(project_dir);
    tokio::fs::create_dir_all(&agent_dir)
        .await
        .map_err(Error::io("create", &agent_dir))?;
    let entry = agent_dir.join(skill_id);
    remove_any(&entry).await?;

    let target = aios_common::path::relative(&agent_dir, canonical);
    match create_dir_symlink(&target, &entry).await {
        Ok(()) => {
            debug!(
                agent = %agent.name,
                link = %entry.display(),
                target = %target.display(),
                "linked skill"
            );
        },
        Err(e) => {
            warn!(agent = %agent.name, error = %e, "symlink failed, copying skill instead");
            copy_visible_tree(canonical, &entry).await?;
        },
    }
    Ok(())
}

#[cfg(unix)]
async fn create_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn create_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_dir(target, link).await
}

async fn remove_any(path: &Path) -> Result<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io("inspect", path)(e)),
    };
    let removed = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        remove_link_or_file(path).await
    };
    removed.map_err(Error::io("remove", path))
}

async fn remove_link_or_file(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        // Directory symlinks on Windows need remove_dir.
        Err(e) if cfg!(windows) && e.kind() != ErrorKind::NotFound => {
            tokio::fs::remove_dir(path).await
        },
        other => other,
    }
}

/// Recursively copy `src` to `dst`, skipping any entry whose name starts
/// with `.`.
async fn copy_visible_tree(src: &Path, dst: &Path) -> Result<()> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let walker = WalkDir::new(&src)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.with_context(|| format!("walk {}", src.display()))?;
            let rel = entry.path().strip_prefix(&src).unwrap_or(entry.path());
            let out = dst.join(rel);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&out).map_err(Error::io("create", &out))?;
            } else if entry.file_type().is_file() {
                std::fs::copy(entry.path(), &out).map_err(Error::io("copy", &out))?;
            }
        }
        Ok(())
    })
    .await
    .context("copy task failed")?
}

enum Removal {
    Removed,
    Foreign,
    Absent,
}

/// Remove an agent entry only when the installer could have created it: a
/// symlink resolving to `canonical`, or a copied directory with `SKILL.md`.
async fn remove_owned_entry(entry: &Path, canonical: &Path) -> Result<Removal> {
    let meta = match tokio::fs::symlink_metadata(entry).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(e) => return Err(Error::io("inspect", entry)(e)),
    };

    if meta.file_type().is_symlink() {
        let target = tokio::fs::read_link(entry)
            .await
            .map_err(Error::io("read link", entry))?;
        let parent = entry.parent().unwrap_or(Path::new("."));
        let resolved = aios_common::path::clean(&parent.join(target));
        if resolved != aios_common::path::clean(canonical) {
            return Ok(Removal::Foreign);
        }
        remove_link_or_file(entry)
            .await
            .map_err(Error::io("remove", entry))?;
        return Ok(Removal::Removed);
    }

    if meta.is_dir() && path_exists(&entry.join(SKILL_MD)).await {
        tokio::fs::remove_dir_all(entry)
            .await
            .map_err(Error::io("remove", entry))?;
        return Ok(Removal::Removed);
    }
    Ok(Removal::Foreign)
}

/// Add entry names under `dir` to `ids`. A missing directory adds nothing.
async fn list_entries(dir: &Path, dirs_only: bool, ids: &mut BTreeSet<String>) -> Result<()> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io("read", dir)(e)),
    };
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(Error::io("read", dir))?
    {
        if dirs_only {
            let file_type = entry.file_type().await.map_err(Error::io("inspect", dir))?;
            if !file_type.is_dir() {
                continue;
            }
        }
        ids.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(())
}
