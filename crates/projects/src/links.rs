//! Workspace links: `<workspace>/projects/links/<project id>` symlinks that
//! point at each tracked project.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    inventory::{Project, ProjectSource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Ok,
    Missing,
    Broken,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub project_id: String,
    pub project_path: PathBuf,
    pub link_path: PathBuf,
    pub status: LinkStatus,
    /// Current symlink target, when the entry is a symlink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub healthy: bool,
    pub reports: Vec<LinkReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Repair,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanAction {
    pub project_id: String,
    pub link_path: PathBuf,
    pub target: PathBuf,
    pub action: ActionKind,
    pub reason: String,
}

impl PlanAction {
    fn from_report(report: &LinkReport) -> Self {
        let (action, reason) = match report.status {
            LinkStatus::Ok => (ActionKind::Skip, "already healthy"),
            LinkStatus::Missing => (ActionKind::Create, "link missing"),
            LinkStatus::Broken => (ActionKind::Repair, "link target mismatch"),
            LinkStatus::Conflict => (ActionKind::Skip, "non-symlink conflict at link path"),
        };
        Self {
            project_id: report.project_id.clone(),
            link_path: report.link_path.clone(),
            target: report.project_path.clone(),
            action,
            reason: reason.to_string(),
        }
    }
}

/// Result of executing one [`PlanAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    #[serde(flatten)]
    pub action: PlanAction,
    pub applied: bool,
}

/// Filesystem operations on a single link path.
#[async_trait]
pub trait WorkspaceLinks: Send + Sync {
    /// Classify the entry at `link_path` against the expected target.
    async fn inspect(
        &self,
        link_path: &Path,
        expected: &Path,
    ) -> Result<(LinkStatus, Option<PathBuf>)>;

    /// Create or replace a symlink at `link_path` pointing to `target`.
    /// Never removes anything that is not a symlink.
    async fn link(&self, link_path: &Path, target: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsWorkspaceLinks;

#[async_trait]
impl WorkspaceLinks for FsWorkspaceLinks {
    async fn inspect(
        &self,
        link_path: &Path,
        expected: &Path,
    ) -> Result<(LinkStatus, Option<PathBuf>)> {
        let meta = match tokio::fs::symlink_metadata(link_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((LinkStatus::Missing, None)),
            Err(e) => return Err(Error::io("inspect", link_path)(e)),
        };
        if !meta.file_type().is_symlink() {
            return Ok((LinkStatus::Conflict, None));
        }
        let target = tokio::fs::read_link(link_path)
            .await
            .map_err(Error::io("read link", link_path))?;
        let parent = link_path.parent().unwrap_or(Path::new("."));
        let resolved = aios_common::path::clean(&parent.join(&target));
        let status = if resolved == aios_common::path::clean(expected) {
            LinkStatus::Ok
        } else {
            LinkStatus::Broken
        };
        Ok((status, Some(target)))
    }

    async fn link(&self, link_path: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = link_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::io("create", parent))?;
        }
        match tokio::fs::symlink_metadata(link_path).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                tokio::fs::remove_file(link_path)
                    .await
                    .map_err(Error::io("remove", link_path))?;
            },
            Ok(_) => {
                return Err(Error::Conflict {
                    path: link_path.to_path_buf(),
                });
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => return Err(Error::io("inspect", link_path)(e)),
        }
        create_dir_symlink(target, link_path)
            .await
            .map_err(Error::io("symlink", link_path))
    }
}

#[cfg(unix)]
async fn create_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn create_dir_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_dir(target, link).await
}

/// Validates, plans and repairs the link of every tracked project.
pub struct Orchestrator {
    source: Arc<dyn ProjectSource>,
    links: Arc<dyn WorkspaceLinks>,
    links_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        workspace_dir: &Path,
        source: Arc<dyn ProjectSource>,
        links: Arc<dyn WorkspaceLinks>,
    ) -> Self {
        Self {
            source,
            links,
            links_dir: workspace_dir.join("projects").join("links"),
        }
    }

    pub fn link_path(&self, project: &Project) -> PathBuf {
        self.links_dir.join(&project.id)
    }

    async fn report(&self, project: &Project) -> Result<LinkReport> {
        let link_path = self.link_path(project);
        let (status, target) = self.links.inspect(&link_path, &project.path).await?;
        Ok(LinkReport {
            project_id: project.id.clone(),
            project_path: project.path.clone(),
            link_path,
            status,
            target,
        })
    }

    pub async fn validate(&self, cancel: &CancellationToken) -> Result<ValidationReport> {
        aios_common::ensure_active(cancel)?;
        let projects = self.source.projects(cancel).await?;
        let mut reports = Vec::with_capacity(projects.len());
        for project in &projects {
            aios_common::ensure_active(cancel)?;
            reports.push(self.report(project).await?);
        }
        let healthy = reports.iter().all(|r| r.status == LinkStatus::Ok);
        debug!(projects = reports.len(), healthy, "validated workspace links");
        Ok(ValidationReport { healthy, reports })
    }

    pub async fn plan(&self, cancel: &CancellationToken) -> Result<Vec<PlanAction>> {
        let validation = self.validate(cancel).await?;
        Ok(validation.reports.iter().map(PlanAction::from_report).collect())
    }

    /// Apply every create/repair action. Conflicts are reported, never
    /// deleted.
    pub async fn repair(&self, cancel: &CancellationToken) -> Result<Vec<RepairOutcome>> {
        let actions = self.plan(cancel).await?;
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            aios_common::ensure_active(cancel)?;
            let applied = match action.action {
                ActionKind::Create | ActionKind::Repair => {
                    self.links.link(&action.link_path, &action.target).await?;
                    info!(
                        project_id = %action.project_id,
                        reason = %action.reason,
                        "linked project"
                    );
                    true
                },
                ActionKind::Skip => {
                    if action.reason != "already healthy" {
                        warn!(link = %action.link_path.display(), "{}", action.reason);
                    }
                    false
                },
            };
            outcomes.push(RepairOutcome { action, applied });
        }
        Ok(outcomes)
    }

    /// Link report for the project matching `selector` (id or path).
    pub async fn inspect_project(
        &self,
        selector: &str,
        cancel: &CancellationToken,
    ) -> Result<LinkReport> {
        aios_common::ensure_active(cancel)?;
        let projects = self.source.projects(cancel).await?;
        let index = crate::inventory::match_selector(&projects, selector)
            .await
            .ok_or_else(|| Error::not_found(selector))?;
        self.report(&projects[index]).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::inventory::Inventory};

    struct Fixture {
        _tmp: tempfile::TempDir,
        ws: PathBuf,
        inventory: Arc<Inventory>,
        orchestrator: Orchestrator,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path().join("ws");
        let inventory = Arc::new(Inventory::new(&ws));
        let orchestrator = Orchestrator::new(&ws, inventory.clone(), Arc::new(FsWorkspaceLinks));
        Fixture {
            ws,
            inventory,
            orchestrator,
            _tmp: tmp,
        }
    }

    async fn track(f: &Fixture, name: &str) -> Project {
        let dir = f.ws.parent().unwrap().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        f.inventory
            .track(&dir, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_inventory_is_healthy() {
        let f = fixture();
        let report = f.orchestrator.validate(&CancellationToken::new()).await.unwrap();
        assert!(report.healthy);
        assert!(report.reports.is_empty());
    }

    #[tokio::test]
    async fn statuses_and_plan_reasons() {
        let f = fixture();
        let cancel = CancellationToken::new();
        let ok = track(&f, "ok").await;
        let missing = track(&f, "missing").await;
        let broken = track(&f, "broken").await;
        let conflict = track(&f, "conflict").await;

        FsWorkspaceLinks
            .link(&f.orchestrator.link_path(&ok), &ok.path)
            .await
            .unwrap();
        FsWorkspaceLinks
            .link(&f.orchestrator.link_path(&broken), &ok.path)
            .await
            .unwrap();
        std::fs::write(f.orchestrator.link_path(&conflict), "user file").unwrap();

        let validation = f.orchestrator.validate(&cancel).await.unwrap();
        assert!(!validation.healthy);
        let status_of = |p: &Project| {
            validation
                .reports
                .iter()
                .find(|r| r.project_id == p.id)
                .unwrap()
                .status
        };
        assert_eq!(status_of(&ok), LinkStatus::Ok);
        assert_eq!(status_of(&missing), LinkStatus::Missing);
        assert_eq!(status_of(&broken), LinkStatus::Broken);
        assert_eq!(status_of(&conflict), LinkStatus::Conflict);

        let plan = f.orchestrator.plan(&cancel).await.unwrap();
        let reason_of = |p: &Project| {
            let a = plan.iter().find(|a| a.project_id == p.id).unwrap();
            (a.action, a.reason.as_str())
        };
        assert_eq!(reason_of(&ok), (ActionKind::Skip, "already healthy"));
        assert_eq!(reason_of(&missing), (ActionKind::Create, "link missing"));
        assert_eq!(reason_of(&broken), (ActionKind::Repair, "link target mismatch"));
        assert_eq!(
            reason_of(&conflict),
            (ActionKind::Skip, "non-symlink conflict at link path")
        );
    }

    #[tokio::test]
    async fn repair_fixes_links_but_keeps_conflicts() {
        let f = fixture();
        let cancel = CancellationToken::new();
        let a = track(&f, "a").await;
        let b = track(&f, "b").await;
        let c = track(&f, "c").await;
        FsWorkspaceLinks
            .link(&f.orchestrator.link_path(&b), &a.path)
            .await
            .unwrap();
        std::fs::write(f.orchestrator.link_path(&c), "keep me").unwrap();

        let outcomes = f.orchestrator.repair(&cancel).await.unwrap();
        assert_eq!(outcomes.iter().filter(|o| o.applied).count(), 2);

        for project in [&a, &b, &c] {
            let report = f
                .orchestrator
                .inspect_project(&project.id, &cancel)
                .await
                .unwrap();
            assert!(matches!(report.status, LinkStatus::Ok | LinkStatus::Conflict));
        }
        assert_eq!(
            std::fs::read_to_string(f.orchestrator.link_path(&c)).unwrap(),
            "keep me"
        );

        let again = f.orchestrator.repair(&cancel).await.unwrap();
        assert!(again.iter().all(|o| !o.applied));
    }

    #[tokio::test]
    async fn inspect_project_by_path_and_unknown() {
        let f = fixture();
        let cancel = CancellationToken::new();
        let p = track(&f, "proj").await;
        let report = f
            .orchestrator
            .inspect_project(p.path.to_str().unwrap(), &cancel)
            .await
            .unwrap();
        assert_eq!(report.status, LinkStatus::Missing);
        assert_eq!(report.link_path, f.ws.join("projects/links").join(&p.id));

        let err = f
            .orchestrator
            .inspect_project("missing", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.class(), aios_common::FailureClass::NotFound);
    }

    #[tokio::test]
    async fn link_refuses_to_replace_non_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let link = tmp.path().join("entry");
        std::fs::create_dir_all(&link).unwrap();
        let err = FsWorkspaceLinks
            .link(&link, tmp.path())
            .await
            .unwrap_err();
        assert_eq!(err.class(), aios_common::FailureClass::Conflict);
        assert!(link.is_dir());
    }
}
