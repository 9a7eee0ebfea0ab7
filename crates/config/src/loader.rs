use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env_with,
    error::{Error, Result},
    paths::{expand_with, home_with_lookup},
    schema::AiosConfig,
};

/// Config file names looked up inside the workspace, checked in order.
const CONFIG_FILENAMES: &[&str] = &["aios.toml", "aios.yaml", "aios.yml", "aios.json"];

/// Resolve configuration from defaults, the workspace config file, and the
/// process environment.
pub fn load() -> Result<AiosConfig> {
    load_with(|name| std::env::var(name).ok())
}

/// Same as [`load`] with a caller-supplied environment lookup.
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<AiosConfig> {
    let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let workspace_dir = match env("AIOS_WORKSPACE_DIR") {
        Some(dir) => PathBuf::from(expand_with(&dir, &lookup)),
        None => home_with_lookup(&lookup).ok_or(Error::NoHome)?.join(".aios"),
    };

    let mut cfg = match find_config_file(&workspace_dir) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            parse_config(&path, &lookup)?
        },
        None => {
            debug!(workspace = %workspace_dir.display(), "no config file found, using defaults");
            AiosConfig {
                project_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
                ..AiosConfig::default()
            }
        },
    };
    cfg.workspace_dir = workspace_dir;

    if let Some(dir) = env("AIOS_PROJECT_DIR") {
        cfg.project_dir = PathBuf::from(expand_with(&dir, &lookup));
    }
    if let Some(level) = env("AIOS_LOG_LEVEL") {
        cfg.log_level = level;
    }
    if let Some(service) = env("AIOS_TOKEN_SERVICE") {
        cfg.token_service = Some(service);
    }
    if let Some(state) = env("AIOS_OAUTH_STATE") {
        cfg.oauth.state = Some(state);
    }
    if let Some(raw) = env("AIOS_OAUTH_TIMEOUT_SEC") {
        cfg.oauth.timeout_secs = match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return Err(Error::InvalidValue {
                    key: "AIOS_OAUTH_TIMEOUT_SEC",
                    value: raw,
                });
            },
        };
    }

    Ok(cfg)
}

fn find_config_file(workspace_dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| workspace_dir.join(name))
        .find(|p| p.is_file())
}

fn parse_config(path: &Path, lookup: &dyn Fn(&str) -> Option<String>) -> Result<AiosConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env_with(&raw, lookup);
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let mut cfg: AiosConfig = match ext {
        "toml" => toml::from_str(&raw).map_err(|e| parse_err(e.to_string()))?,
        "yaml" | "yml" => serde_yaml::from_str(&raw).map_err(|e| parse_err(e.to_string()))?,
        "json" => serde_json::from_str(&raw).map_err(|e| parse_err(e.to_string()))?,
        other => return Err(parse_err(format!("unsupported config format: .{other}"))),
    };
    let project = cfg.project_dir.to_string_lossy().into_owned();
    cfg.project_dir = PathBuf::from(expand_with(&project, lookup));
    Ok(cfg)
}
