use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Default wait for the OAuth loopback callback.
pub const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 120;

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiosConfig {
    /// Root of the workspace: inventory, links, tray state, analytics, audit.
    pub workspace_dir: PathBuf,
    /// Project that skills are installed into.
    pub project_dir: PathBuf,
    pub log_level: String,
    /// Keychain service name. `None` keeps tokens in memory only.
    pub token_service: Option<String>,
    pub oauth: OAuthSettings,
}

impl Default for AiosConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from(".aios"),
            project_dir: PathBuf::from("."),
            log_level: "info".into(),
            token_service: None,
            oauth: OAuthSettings::default(),
        }
    }
}

impl AiosConfig {
    /// Configuration rooted at explicit directories; handy for tests and
    /// embedders that bypass env discovery.
    #[must_use]
    pub fn with_dirs(workspace_dir: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            project_dir: project_dir.into(),
            ..Self::default()
        }
    }

    /// `"keychain"` when a token service is configured, `"memory"` otherwise.
    #[must_use]
    pub fn token_store_kind(&self) -> &'static str {
        match self.token_service.as_deref() {
            Some(s) if !s.is_empty() => "keychain",
            _ => "memory",
        }
    }
}

/// OAuth onboarding knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub timeout_secs: u64,
    /// Expected `state` for the loopback callback. Generated when absent.
    pub state: Option<String>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_OAUTH_TIMEOUT_SECS,
            state: None,
        }
    }
}

impl OAuthSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
