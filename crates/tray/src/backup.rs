//! Workspace backups under `<workspace>/backups/<YYYYMMDDTHHMMSSZ>/`.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use {
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
    walkdir::WalkDir,
};

use crate::error::{Error, Result};

/// Workspace subdirectories included in a backup.
pub const BACKED_UP_DIRS: &[&str] = &["projects", "tray", "state", "audit"];

const BACKUPS_DIR: &str = "backups";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    /// Which of [`BACKED_UP_DIRS`] existed and were copied.
    pub copied: Vec<String>,
}

fn backups_root(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join(BACKUPS_DIR)
}

pub async fn create_backup(
    workspace_dir: &Path,
    cancel: &CancellationToken,
) -> Result<BackupInfo> {
    aios_common::ensure_active(cancel)?;
    let root = backups_root(workspace_dir);
    tokio::fs::create_dir_all(&root)
        .await
        .map_err(Error::io("create", &root))?;

    let stamp = aios_common::time::compact_timestamp();
    let mut name = stamp.clone();
    let mut suffix = 1;
    while tokio::fs::symlink_metadata(root.join(&name)).await.is_ok() {
        name = format!("{stamp}-{suffix}");
        suffix += 1;
    }
    let dest = root.join(&name);
    tokio::fs::create_dir(&dest)
        .await
        .map_err(Error::io("create", &dest))?;

    let mut copied = Vec::new();
    for dir in BACKED_UP_DIRS {
        aios_common::ensure_active(cancel)?;
        let src = workspace_dir.join(dir);
        if !src.is_dir() {
            continue;
        }
        copy_tree(&src, &dest.join(dir)).await?;
        copied.push((*dir).to_string());
    }
    info!(backup = %name, dirs = ?copied, "created workspace backup");
    Ok(BackupInfo {
        name,
        path: dest,
        copied,
    })
}

/// Backup names, oldest first.
pub async fn list_backups(
    workspace_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    aios_common::ensure_active(cancel)?;
    let root = backups_root(workspace_dir);
    let mut entries = match tokio::fs::read_dir(&root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io("read", &root)(e)),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(Error::io("read", &root))? {
        if entry
            .file_type()
            .await
            .map_err(Error::io("inspect", &root))?
            .is_dir()
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Replace the backed-up workspace directories with the copies in `name`.
/// Directories absent from the backup are left untouched.
pub async fn restore_backup(
    workspace_dir: &Path,
    name: &str,
    cancel: &CancellationToken,
) -> Result<BackupInfo> {
    aios_common::ensure_active(cancel)?;
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::InvalidBackupName(name.to_string()));
    }
    let src_root = backups_root(workspace_dir).join(name);
    if !src_root.is_dir() {
        return Err(Error::BackupNotFound(name.to_string()));
    }

    let mut restored = Vec::new();
    for dir in BACKED_UP_DIRS {
        aios_common::ensure_active(cancel)?;
        let src = src_root.join(dir);
        if !src.is_dir() {
            continue;
        }
        let dest = workspace_dir.join(dir);
        match tokio::fs::remove_dir_all(&dest).await {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => return Err(Error::io("remove", &dest)(e)),
        }
        copy_tree(&src, &dest).await?;
        restored.push((*dir).to_string());
    }
    info!(backup = %name, dirs = ?restored, "restored workspace backup");
    Ok(BackupInfo {
        name: name.to_string(),
        path: src_root,
        copied: restored,
    })
}

/// Recursive copy that recreates symlinks instead of following them, so
/// workspace links survive a round trip.
async fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        for entry in WalkDir::new(&src).follow_links(false) {
            let entry = entry.map_err(|e| Error::Task(format!("walk {}: {e}", src.display())))?;
            let rel = entry.path().strip_prefix(&src).unwrap_or(entry.path());
            let out = dst.join(rel);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                std::fs::create_dir_all(&out).map_err(Error::io("create", &out))?;
            } else if file_type.is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .map_err(Error::io("read link", entry.path()))?;
                copy_symlink(&target, &out)?;
            } else {
                std::fs::copy(entry.path(), &out).map_err(Error::io("copy", &out))?;
            }
        }
        debug!(from = %src.display(), to = %dst.display(), "copied tree");
        Ok(())
    })
    .await
    .map_err(|e| Error::Task(format!("copy task failed: {e}")))?
}

#[cfg(unix)]
fn copy_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(Error::io("symlink", link))
}

#[cfg(windows)]
fn copy_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_dir(target, link).map_err(Error::io("symlink", link))
}
