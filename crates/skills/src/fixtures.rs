//! Fixture discovery and the fixture runner.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    spec,
    types::FixturePair,
};

pub const TESTS_DIR: &str = "tests";
const FIXTURE_PREFIX: &str = "fixture_";
const EXPECTED_PREFIX: &str = "expected_";

// ── Discovery ────────────────────────────────────────────────────────────────

/// Fixture files found under `tests/`, paired by suffix.
#[derive(Debug, Clone, Default)]
pub struct FixtureScan {
    pub pairs: Vec<FixturePair>,
    pub orphan_fixtures: Vec<PathBuf>,
    pub orphan_expected: Vec<PathBuf>,
}

impl FixtureScan {
    /// Number of `fixture_*.json` files, paired or not.
    #[must_use]
    pub fn fixture_count(&self) -> usize {
        self.pairs.len() + self.orphan_fixtures.len()
    }
}

/// Pair `fixture_<k>.json` with `expected_<k>.json` in `tests_dir`.
/// Results are ordered by `<k>`.
pub fn scan_fixtures(tests_dir: &Path) -> Result<FixtureScan> {
    let mut fixtures: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut expected: BTreeMap<String, PathBuf> = BTreeMap::new();

    let entries = std::fs::read_dir(tests_dir).map_err(Error::io("read", tests_dir))?;
    for entry in entries {
        let entry = entry.map_err(Error::io("read", tests_dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix(".json") else {
            continue;
        };
        if let Some(key) = stem.strip_prefix(FIXTURE_PREFIX) {
            fixtures.insert(key.to_string(), path);
        } else if let Some(key) = stem.strip_prefix(EXPECTED_PREFIX) {
            expected.insert(key.to_string(), path);
        }
    }

    let mut scan = FixtureScan::default();
    for (key, fixture) in fixtures {
        match expected.remove(&key) {
            Some(expected) => scan.pairs.push(FixturePair {
                name: key,
                fixture,
                expected,
            }),
            None => scan.orphan_fixtures.push(fixture),
        }
    }
    scan.orphan_expected = expected.into_values().collect();
    Ok(scan)
}

// ── Executor ─────────────────────────────────────────────────────────────────

/// Runs a skill against one input. The host supplies a real model-backed
/// executor; the core ships only [`StubExecutor`].
#[async_trait]
pub trait SkillExecutor: Send + Sync {
    /// Short label recorded in run reports.
    fn name(&self) -> &str;

    async fn execute(&self, skill_id: &str, input: &Map<String, Value>) -> Result<Value>;
}

/// Placeholder executor: always answers `{"status": "ok"}` regardless of
/// input. Fixtures expecting anything else fail by construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubExecutor;

#[async_trait]
impl SkillExecutor for StubExecutor {
    fn name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, _skill_id: &str, _input: &Map<String, Value>) -> Result<Value> {
        Ok(serde_json::json!({ "status": "ok" }))
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRunReport {
    pub skill_id: String,
    /// Which executor produced the outputs (`"stub"` for the built-in one).
    pub executor: String,
    pub results: Vec<FixtureResult>,
    pub failed: usize,
}

impl FixtureRunReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

/// Run every paired fixture in `skill_dir/tests` through `executor`.
///
/// A fixture passes when each key of the expected object maps to an equal
/// value in the output; extra output keys are ignored. A `tests/` directory
/// without any fixture file is a configuration error.
pub async fn run_fixtures(
    skill_dir: &Path,
    executor: &dyn SkillExecutor,
    cancel: &CancellationToken,
) -> Result<FixtureRunReport> {
    aios_common::ensure_active(cancel)?;
    let spec = spec::load_spec(&spec::resolve_spec_path(skill_dir)?)?;
    let tests_dir = skill_dir.join(TESTS_DIR);
    let scan = scan_fixtures(&tests_dir)?;
    if scan.fixture_count() == 0 {
        return Err(Error::NoFixtures(tests_dir));
    }

    let mut results = Vec::with_capacity(scan.pairs.len());
    for pair in &scan.pairs {
        aios_common::ensure_active(cancel)?;
        let outcome = run_one(&spec.id, pair, executor).await;
        debug!(skill_id = %spec.id, fixture = %pair.name, ok = outcome.is_ok(), "fixture ran");
        results.push(match outcome {
            Ok(()) => FixtureResult {
                name: pair.name.clone(),
                passed: true,
                error: None,
            },
            Err(message) => FixtureResult {
                name: pair.name.clone(),
                passed: false,
                error: Some(message),
            },
        });
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    info!(skill_id = %spec.id, total = results.len(), failed, "fixture run complete");
    Ok(FixtureRunReport {
        skill_id: spec.id,
        executor: executor.name().to_string(),
        results,
        failed,
    })
}

async fn run_one(
    skill_id: &str,
    pair: &FixturePair,
    executor: &dyn SkillExecutor,
) -> std::result::Result<(), String> {
    let input = read_object(&pair.fixture)?;
    let expected = read_object(&pair.expected)?;
    let output = executor
        .execute(skill_id, &input)
        .await
        .map_err(|e| e.to_string())?;
    let Some(output) = output.as_object() else {
        return Err("executor output is not a JSON object".into());
    };
    compare_subset(&expected, output)
}

fn read_object(path: &Path) -> std::result::Result<Map<String, Value>, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("{} is not a JSON object", path.display())),
        Err(e) => Err(format!("invalid JSON in {}: {e}", path.display())),
    }
}

/// Every key of `expected` must be present in `output` with an equal value.
fn compare_subset(
    expected: &Map<String, Value>,
    output: &Map<String, Value>,
) -> std::result::Result<(), String> {
    let mismatches: Vec<String> = expected
        .iter()
        .filter_map(|(key, want)| match output.get(key) {
            Some(got) if got == want => None,
            Some(got) => Some(format!("{key}: expected {want}, got {got}")),
            None => Some(format!("{key}: expected {want}, got nothing")),
        })
        .collect();
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(mismatches.join("; "))
    }
}

// ── Report storage ───────────────────────────────────────────────────────────

/// Persists fixture run reports for later inspection.
#[async_trait]
pub trait ExecutionReportStore: Send + Sync {
    async fn save(&self, report: &FixtureRunReport) -> Result<PathBuf>;
    async fn load(&self, skill_id: &str) -> Result<Option<FixtureRunReport>>;
}

/// Stores one JSON report per skill under `<workspace>/state/reports/`.
pub struct FileExecutionReportStore {
    dir: PathBuf,
}

impl FileExecutionReportStore {
    pub fn new(workspace_dir: &Path) -> Self {
        Self {
            dir: workspace_dir.join("state").join("reports"),
        }
    }

    fn path_for(&self, skill_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", spec::sanitize(skill_id)))
    }
}

#[async_trait]
impl ExecutionReportStore for FileExecutionReportStore {
    async fn save(&self, report: &FixtureRunReport) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(Error::io("create", &self.dir))?;
        let path = self.path_for(&report.skill_id);
        let data = serde_json::to_string_pretty(report).map_err(|source| Error::Json {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, data)
            .await
            .map_err(Error::io("write", &path))?;
        Ok(path)
    }

    async fn load(&self, skill_id: &str) -> Result<Option<FixtureRunReport>> {
        let path = self.path_for(skill_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io("read", &path)(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::Json { path, source })
    }
}
