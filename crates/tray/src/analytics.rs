//! Append-only analytics history and trend summaries.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize, Serializer, ser::SerializeMap},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{error::Result, state::TrayState, storage};

pub const SKILLS_INSTALLED: &str = "skills_installed";
pub const PROJECTS_TRACKED: &str = "projects_tracked";
pub const CONNECTIONS_ACTIVE: &str = "connections_active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub recorded_at: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl AnalyticsSnapshot {
    pub fn new(metrics: BTreeMap<String, f64>) -> Self {
        Self {
            recorded_at: aios_common::time::now_rfc3339(),
            metrics,
        }
    }

    /// Snapshot of the counts visible in tray state plus the project count.
    pub fn from_state(state: &TrayState, projects_tracked: usize) -> Self {
        let mut active = usize::from(state.connections.google_drive);
        active += state
            .connections
            .other
            .values()
            .filter(|v| v.as_bool() == Some(true))
            .count();
        Self::new(BTreeMap::from([
            (SKILLS_INSTALLED.to_string(), state.skills.len() as f64),
            (PROJECTS_TRACKED.to_string(), projects_tracked as f64),
            (CONNECTIONS_ACTIVE.to_string(), active as f64),
        ]))
    }
}

/// Serializes flat as `{"points": n, "delta_<metric>": …}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trend {
    pub points: usize,
    /// `last - first` per metric; a metric absent from a snapshot counts
    /// as zero there.
    pub deltas: BTreeMap<String, f64>,
}

impl Serialize for Trend {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.deltas.len() + 1))?;
        map.serialize_entry("points", &self.points)?;
        for (metric, delta) in &self.deltas {
            map.serialize_entry(&format!("delta_{metric}"), delta)?;
        }
        map.end()
    }
}

#[must_use]
pub fn build_trend(history: &[AnalyticsSnapshot]) -> Trend {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return Trend::default();
    };
    let keys: BTreeSet<&String> = first.metrics.keys().chain(last.metrics.keys()).collect();
    let deltas = keys
        .into_iter()
        .map(|k| {
            let start = first.metrics.get(k).copied().unwrap_or(0.0);
            let end = last.metrics.get(k).copied().unwrap_or(0.0);
            (k.clone(), end - start)
        })
        .collect();
    Trend {
        points: history.len(),
        deltas,
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, snapshot: AnalyticsSnapshot, cancel: &CancellationToken) -> Result<()>;
    async fn history(&self, cancel: &CancellationToken) -> Result<Vec<AnalyticsSnapshot>>;
}

/// `<workspace>/state/analytics-history.json`, rewritten on every append.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(workspace_dir: &Path) -> Self {
        Self {
            path: workspace_dir.join("state").join("analytics-history.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn append(&self, snapshot: AnalyticsSnapshot, cancel: &CancellationToken) -> Result<()> {
        let mut history = self.history(cancel).await?;
        history.push(snapshot);
        aios_common::ensure_active(cancel)?;
        storage::write_json(&self.path, &history).await?;
        debug!(points = history.len(), "appended analytics snapshot");
        Ok(())
    }

    async fn history(&self, cancel: &CancellationToken) -> Result<Vec<AnalyticsSnapshot>> {
        aios_common::ensure_active(cancel)?;
        Ok(storage::read_json(&self.path).await?.unwrap_or_default())
    }
}
