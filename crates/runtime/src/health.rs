use {aios_config::AiosConfig, serde::Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    /// False when no workspace directory is configured.
    pub ready: bool,
    pub checked_at: String,
    pub token_store: &'static str,
    pub workspace: String,
}

#[must_use]
pub fn health(config: &AiosConfig) -> Health {
    let workspace = config.workspace_dir.display().to_string();
    Health {
        status: "ok",
        ready: !workspace.is_empty(),
        checked_at: aios_common::time::now_rfc3339(),
        token_store: config.token_store_kind(),
        workspace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_store_and_readiness() {
        let report = health(&AiosConfig::with_dirs("/tmp/ws", "/tmp/proj"));
        assert_eq!(report.status, "ok");
        assert!(report.ready);
        assert_eq!(report.token_store, "memory");
        assert_eq!(report.workspace, "/tmp/ws");
        assert!(report.checked_at.ends_with('Z'));

        let empty = health(&AiosConfig::with_dirs("", "/tmp/proj"));
        assert!(!empty.ready);
    }
}
