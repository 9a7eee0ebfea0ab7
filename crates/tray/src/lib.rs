//! Workspace state projected for the host tray: installed skills,
//! connector flags, analytics history, signed audit bundles and backups.

pub mod analytics;
pub mod audit;
pub mod backup;
pub mod error;
pub mod state;
mod storage;

pub use {
    analytics::{AnalyticsSnapshot, FileSnapshotStore, SnapshotStore, Trend, build_trend},
    audit::{
        AuditBundle, AuditBundleStore, AuditRecord, FileAuditBundleStore, build_bundle,
        verify_bundle,
    },
    backup::{BackupInfo, create_backup, list_backups, restore_backup},
    error::{Error, Result},
    state::{Connections, TrayState, load_state, refresh},
};
