use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    aios_config::AiosConfig,
    aios_skills::SkillInstaller,
    serde::{Deserialize, Serialize},
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{error::Result, storage};

/// Connector flags. `google_drive` is always present; other keys written by
/// newer hosts are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub google_drive: bool,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrayState {
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub connections: Connections,
}

#[must_use]
pub fn state_path(workspace_dir: &Path) -> PathBuf {
    workspace_dir.join("tray").join("state.json")
}

/// Stored state, or an empty one when none has been written yet.
pub async fn load_state(workspace_dir: &Path) -> Result<TrayState> {
    Ok(storage::read_json(&state_path(workspace_dir))
        .await?
        .unwrap_or_default())
}

/// Recompute installed skills for the configured project, optionally set
/// the Google Drive flag, and persist.
pub async fn refresh(
    config: &AiosConfig,
    installer: &dyn SkillInstaller,
    google_drive: Option<bool>,
    cancel: &CancellationToken,
) -> Result<TrayState> {
    aios_common::ensure_active(cancel)?;
    let mut state = load_state(&config.workspace_dir).await?;
    if let Some(connected) = google_drive {
        state.connections.google_drive = connected;
    }
    state.skills = installer
        .collect_installed_skills(&config.project_dir, cancel)
        .await?;
    state.updated_at = aios_common::time::now_rfc3339();

    aios_common::ensure_active(cancel)?;
    storage::write_json(&state_path(&config.workspace_dir), &state).await?;
    info!(
        skills = state.skills.len(),
        google_drive = state.connections.google_drive,
        "refreshed tray state"
    );
    Ok(state)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, aios_skills::FsSkillInstaller};

    fn setup() -> (tempfile::TempDir, AiosConfig, FsSkillInstaller) {
        let tmp = tempfile::tempdir().unwrap();
        let config = AiosConfig::with_dirs(tmp.path().join("ws"), tmp.path().join("proj"));
        let installer = FsSkillInstaller::from_registry().unwrap();
        (tmp, config, installer)
    }

    #[tokio::test]
    async fn missing_state_is_empty() {
        let (_tmp, config, _) = setup();
        let state = load_state(&config.workspace_dir).await.unwrap();
        assert_eq!(state, TrayState::default());
        assert!(!state.connections.google_drive);
    }

    #[tokio::test]
    async fn refresh_collects_skills_and_keeps_flag() {
        let (_tmp, config, installer) = setup();
        let cancel = CancellationToken::new();
        installer
            .install("beta", &config.project_dir, None, None, &cancel)
            .await
            .unwrap();
        installer
            .install("alpha", &config.project_dir, None, None, &cancel)
            .await
            .unwrap();

        let state = refresh(&config, &installer, Some(true), &cancel).await.unwrap();
        assert_eq!(state.skills, vec!["alpha", "beta"]);
        assert!(state.connections.google_drive);
        assert!(state.updated_at.ends_with('Z'));

        let again = refresh(&config, &installer, None, &cancel).await.unwrap();
        assert!(again.connections.google_drive);
        assert_eq!(load_state(&config.workspace_dir).await.unwrap(), again);
    }

    #[tokio::test]
    async fn backfills_google_drive_and_preserves_unknown_keys() {
        let (_tmp, config, installer) = setup();
        let path = state_path(&config.workspace_dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"updated_at":"x","skills":[],"connections":{"dropbox":true}}"#,
        )
        .unwrap();

        let state = refresh(&config, &installer, None, &CancellationToken::new())
            .await
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!state.connections.google_drive);
        assert_eq!(raw["connections"]["google_drive"], false);
        assert_eq!(raw["connections"]["dropbox"], true);
    }

    #[tokio::test]
    async fn malformed_state_is_fatal() {
        let (_tmp, config, installer) = setup();
        let path = state_path(&config.workspace_dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2").unwrap();
        let err = refresh(&config, &installer, Some(true), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.class(), aios_common::FailureClass::Validation);
    }
}
