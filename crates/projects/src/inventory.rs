use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::error::{Context, Error, Result};

const INVENTORY_VERSION: u32 = 1;

/// A tracked project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Hex SHA-256 of the canonical path.
    pub id: String,
    pub path: PathBuf,
    /// RFC 3339, set when first tracked.
    pub added_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct InventoryFile {
    version: u32,
    updated_at: String,
    #[serde(default)]
    projects: Vec<Project>,
}

impl Default for InventoryFile {
    fn default() -> Self {
        Self {
            version: INVENTORY_VERSION,
            updated_at: String::new(),
            projects: Vec::new(),
        }
    }
}

/// Anything that can enumerate tracked projects.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// All projects, sorted by path.
    async fn projects(&self, cancel: &CancellationToken) -> Result<Vec<Project>>;
}

/// JSON-file project inventory under `<workspace>/projects/`.
#[derive(Debug, Clone)]
pub struct Inventory {
    path: PathBuf,
}

impl Inventory {
    pub fn new(workspace_dir: &Path) -> Self {
        Self {
            path: workspace_dir.join("projects").join("inventory.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a project. Tracking an already tracked path returns the stored
    /// entry unchanged.
    pub async fn track(&self, path: &Path, cancel: &CancellationToken) -> Result<Project> {
        aios_common::ensure_active(cancel)?;
        let canonical = canonicalize(path).await?;
        let id = project_id(&canonical);

        let mut file = self.read().await?;
        if let Some(existing) = file
            .projects
            .iter()
            .find(|p| p.id == id || p.path == canonical)
        {
            debug!(id = %existing.id, "project already tracked");
            return Ok(existing.clone());
        }

        let project = Project {
            id,
            path: canonical,
            added_at: aios_common::time::now_rfc3339(),
        };
        file.projects.push(project.clone());
        aios_common::ensure_active(cancel)?;
        self.write(file).await?;
        info!(id = %project.id, path = %project.path.display(), "tracked project");
        Ok(project)
    }

    /// Remove the project matching `selector` (id or path).
    pub async fn untrack(&self, selector: &str, cancel: &CancellationToken) -> Result<Project> {
        aios_common::ensure_active(cancel)?;
        let mut file = self.read().await?;
        let index = match_selector(&file.projects, selector)
            .await
            .ok_or_else(|| Error::not_found(selector))?;
        let removed = file.projects.remove(index);
        aios_common::ensure_active(cancel)?;
        self.write(file).await?;
        info!(id = %removed.id, "untracked project");
        Ok(removed)
    }

    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Project>> {
        aios_common::ensure_active(cancel)?;
        let mut projects = self.read().await?.projects;
        projects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(projects)
    }

    pub async fn inspect(&self, selector: &str, cancel: &CancellationToken) -> Result<Project> {
        aios_common::ensure_active(cancel)?;
        let file = self.read().await?;
        let index = match_selector(&file.projects, selector)
            .await
            .ok_or_else(|| Error::not_found(selector))?;
        Ok(file.projects[index].clone())
    }

    async fn read(&self) -> Result<InventoryFile> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(InventoryFile::default()),
            Err(e) => return Err(Error::io("read", &self.path)(e)),
        };
        serde_json::from_str(&data).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Save via temp file + rename.
    async fn write(&self, mut file: InventoryFile) -> Result<()> {
        let parent = self
            .path
            .parent()
            .context("inventory path has no parent directory")?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(Error::io("create", parent))?;
        file.version = INVENTORY_VERSION;
        file.updated_at = aios_common::time::now_rfc3339();
        file.projects.sort_by(|a, b| a.path.cmp(&b.path));

        let data = serde_json::to_string_pretty(&file).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(Error::io("write", &tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(Error::io("rename", &self.path))
    }
}

#[async_trait]
impl ProjectSource for Inventory {
    async fn projects(&self, cancel: &CancellationToken) -> Result<Vec<Project>> {
        self.list(cancel).await
    }
}

/// Hex SHA-256 of the path's string form.
#[must_use]
pub fn project_id(canonical: &Path) -> String {
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    format!("{digest:x}")
}

/// Absolute, cleaned, and symlink-resolved when the path exists.
pub async fn canonicalize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::EmptyPath);
    }
    if let Ok(resolved) = tokio::fs::canonicalize(path).await {
        return Ok(resolved);
    }
    let absolute = std::path::absolute(path).map_err(Error::io("resolve", path))?;
    Ok(aios_common::path::clean(&absolute))
}

/// Index of the project whose id equals `selector` or whose path equals the
/// canonical form of `selector`.
pub(crate) async fn match_selector(projects: &[Project], selector: &str) -> Option<usize> {
    if selector.is_empty() {
        return None;
    }
    if let Some(index) = projects.iter().position(|p| p.id == selector) {
        return Some(index);
    }
    let canonical = canonicalize(Path::new(selector)).await.ok()?;
    projects.iter().position(|p| p.path == canonical)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn track_list_untrack() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path().join("ws");
        let b = tmp.path().join("b-proj");
        let a = tmp.path().join("a-proj");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        let inventory = Inventory::new(&ws);
        let cancel = CancellationToken::new();

        assert!(inventory.list(&cancel).await.unwrap().is_empty());

        let pb = inventory.track(&b, &cancel).await.unwrap();
        let pa = inventory.track(&a, &cancel).await.unwrap();
        assert_eq!(pa.id.len(), 64);
        assert_eq!(pa.path, std::fs::canonicalize(&a).unwrap());

        let listed = inventory.list(&cancel).await.unwrap();
        assert_eq!(listed, vec![pa.clone(), pb.clone()]);

        let removed = inventory.untrack(&pb.id, &cancel).await.unwrap();
        assert_eq!(removed, pb);
        let removed = inventory
            .untrack(a.to_str().unwrap(), &cancel)
            .await
            .unwrap();
        assert_eq!(removed, pa);
        assert!(inventory.list(&cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn track_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let proj = tmp.path().join("proj");
        std::fs::create_dir_all(proj.join("sub")).unwrap();
        let inventory = Inventory::new(tmp.path());
        let cancel = CancellationToken::new();

        let first = inventory.track(&proj, &cancel).await.unwrap();
        let second = inventory
            .track(&proj.join("sub").join(".."), &cancel)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(inventory.list(&cancel).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn document_shape_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let proj = tmp.path().join("proj");
        std::fs::create_dir_all(&proj).unwrap();
        let inventory = Inventory::new(tmp.path());
        inventory
            .track(&proj, &CancellationToken::new())
            .await
            .unwrap();

        let raw = std::fs::read_to_string(inventory.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["version"], 1);
        assert!(doc["updated_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(doc["projects"].as_array().unwrap().len(), 1);
        assert!(!inventory.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn unknown_selector_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let inventory = Inventory::new(tmp.path());
        let cancel = CancellationToken::new();
        let err = inventory.untrack("nope", &cancel).await.unwrap_err();
        assert_eq!(err.class(), aios_common::FailureClass::NotFound);
        let err = inventory.inspect("", &cancel).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let inventory = Inventory::new(tmp.path());
        let err = inventory
            .track(Path::new(""), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyPath));
    }

    #[tokio::test]
    async fn malformed_inventory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let inventory = Inventory::new(tmp.path());
        std::fs::create_dir_all(inventory.path().parent().unwrap()).unwrap();
        std::fs::write(inventory.path(), "{not json").unwrap();
        let err = inventory
            .list(&CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.class(), aios_common::FailureClass::Validation);
    }
}
