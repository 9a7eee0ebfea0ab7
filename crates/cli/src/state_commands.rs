//! CLI commands for tray state, analytics, audit bundles and backups.

use std::path::PathBuf;

use {
    aios_config::AiosConfig,
    aios_projects::Inventory,
    aios_skills::FsSkillInstaller,
    aios_tray::{
        AnalyticsSnapshot, AuditBundleStore, AuditRecord, FileAuditBundleStore, FileSnapshotStore,
        SnapshotStore, TrayState, build_bundle, build_trend, verify_bundle,
    },
    clap::Subcommand,
    serde_json::json,
    tokio_util::sync::CancellationToken,
};

use crate::print_json;

#[derive(Subcommand)]
pub enum StateAction {
    /// Recompute installed skills and write tray state.
    Refresh {
        /// Override the Google Drive connection flag.
        #[arg(long)]
        google_drive: Option<bool>,
    },
    /// Print the current tray state.
    Show,
    /// Append an analytics snapshot built from tray state and the inventory.
    Snapshot,
    /// Per-metric change across the snapshot history.
    Trend,
    /// Signed audit bundles.
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
    /// Workspace backups.
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
pub enum AuditAction {
    /// Sign and store a bundle. Without --records, one record is derived per
    /// installed skill and connection.
    Build {
        /// JSON array of audit records.
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Check a stored bundle's signature, by file name or path.
    Verify { name: String },
}

#[derive(Subcommand)]
pub enum BackupAction {
    Create,
    List,
    Restore { name: String },
}

/// Audit trail of what tray state currently shows.
fn records_from_state(state: &TrayState) -> Vec<AuditRecord> {
    let skills = state.skills.iter().map(|skill| {
        AuditRecord::new("skill", "installed", "aios").with_metadata("skill", skill.as_str())
    });
    let drive = std::iter::once(
        AuditRecord::new("connection", "google_drive", "aios")
            .with_metadata("connected", state.connections.google_drive),
    );
    skills.chain(drive).collect()
}

pub async fn handle_state(
    action: StateAction,
    config: &AiosConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let workspace = config.workspace_dir.as_path();

    match action {
        StateAction::Refresh { google_drive } => {
            let installer = FsSkillInstaller::from_registry()?;
            print_json(&aios_tray::refresh(config, &installer, google_drive, cancel).await?)?;
        },
        StateAction::Show => print_json(&aios_tray::load_state(workspace).await?)?,
        StateAction::Snapshot => {
            let state = aios_tray::load_state(workspace).await?;
            let projects = Inventory::new(workspace).list(cancel).await?.len();
            let snapshot = AnalyticsSnapshot::from_state(&state, projects);
            FileSnapshotStore::new(workspace)
                .append(snapshot.clone(), cancel)
                .await?;
            print_json(&snapshot)?;
        },
        StateAction::Trend => {
            let history = FileSnapshotStore::new(workspace).history(cancel).await?;
            print_json(&build_trend(&history))?;
        },
        StateAction::Audit { action } => {
            let store = FileAuditBundleStore::new(workspace);
            match action {
                AuditAction::Build { records } => {
                    let records = match records {
                        Some(path) => {
                            serde_json::from_str(&tokio::fs::read_to_string(&path).await?)?
                        },
                        None => records_from_state(&aios_tray::load_state(workspace).await?),
                    };
                    let bundle = build_bundle(records);
                    let path = store.write(&bundle, cancel).await?;
                    print_json(&json!({
                        "path": path,
                        "signature": bundle.signature,
                        "records": bundle.records.len(),
                    }))?;
                },
                AuditAction::Verify { name } => {
                    let bundle = store.load(&name, cancel).await?;
                    verify_bundle(&bundle)?;
                    print_json(&json!({ "valid": true, "signature": bundle.signature }))?;
                },
            }
        },
        StateAction::Backup { action } => match action {
            BackupAction::Create => {
                print_json(&aios_tray::create_backup(workspace, cancel).await?)?
            },
            BackupAction::List => print_json(&aios_tray::list_backups(workspace, cancel).await?)?,
            BackupAction::Restore { name } => {
                print_json(&aios_tray::restore_backup(workspace, &name, cancel).await?)?
            },
        },
    }

    Ok(())
}
