//! Static checks over a skill directory, including embedded-credential
//! detection.

use std::path::{Path, PathBuf};

use {
    serde::Serialize,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::{
    error::Result,
    fixtures::{self, TESTS_DIR},
    prompt::PROMPT_FILENAME,
    spec,
};

/// Root-level extensions scanned for credentials.
const SCANNED_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "md"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Spec,
    Prompt,
    Tests,
    Fixture,
    Credential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub kind: IssueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub valid: bool,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    fn push(&mut self, kind: IssueKind, path: Option<PathBuf>, message: impl Into<String>) {
        self.issues.push(LintIssue {
            kind,
            path,
            message: message.into(),
        });
    }
}

/// Lint a skill directory. Problems with the skill are reported as issues;
/// only cancellation produces an `Err`.
pub fn lint_dir(skill_dir: &Path, cancel: &CancellationToken) -> Result<LintReport> {
    aios_common::ensure_active(cancel)?;
    let mut report = LintReport {
        valid: true,
        issues: Vec::new(),
    };

    let spec_result = spec::resolve_spec_path(skill_dir)
        .and_then(|path| spec::load_spec(&path))
        .and_then(|s| spec::validate_spec(skill_dir, &s));
    if let Err(e) = spec_result {
        report.push(IssueKind::Spec, None, e.to_string());
    }

    let prompt_path = skill_dir.join(PROMPT_FILENAME);
    if !prompt_path.is_file() {
        report.push(IssueKind::Prompt, Some(prompt_path), "missing prompt.md");
    }

    aios_common::ensure_active(cancel)?;
    let tests_dir = skill_dir.join(TESTS_DIR);
    if !tests_dir.is_dir() {
        report.push(IssueKind::Tests, Some(tests_dir.clone()), "missing tests/ directory");
    } else {
        match fixtures::scan_fixtures(&tests_dir) {
            Ok(scan) => {
                for path in scan.orphan_fixtures {
                    let msg = format!("fixture {} has no matching expected file", file_name(&path));
                    report.push(IssueKind::Fixture, Some(path), msg);
                }
                for path in scan.orphan_expected {
                    let msg = format!("expected file {} has no matching fixture", file_name(&path));
                    report.push(IssueKind::Fixture, Some(path), msg);
                }
            },
            Err(e) => report.push(IssueKind::Tests, Some(tests_dir.clone()), e.to_string()),
        }
    }

    aios_common::ensure_active(cancel)?;
    for path in credential_scan_targets(skill_dir, &tests_dir) {
        let Ok(content) = std::fs::read_to_string(&path) else {
            debug!(path = %path.display(), "skipping unreadable or binary file");
            continue;
        };
        if let Some(pattern) = aios_common::secrets::find_credential(&content) {
            warn!(path = %path.display(), pattern, "embedded credential detected");
            let msg = format!("{} contains an embedded credential ({pattern})", file_name(&path));
            report.push(IssueKind::Credential, Some(path), msg);
        }
    }

    report.valid = report.issues.is_empty();
    Ok(report)
}

/// Root-level `.json|.yaml|.yml|.md` files plus every file under `tests/`,
/// each listed once.
fn credential_scan_targets(skill_dir: &Path, tests_dir: &Path) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = match std::fs::read_dir(skill_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension().and_then(|e| e.to_str()).is_some_and(|ext| {
                    SCANNED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                })
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    targets.sort();

    if tests_dir.is_dir() {
        let mut nested: Vec<PathBuf> = WalkDir::new(tests_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        nested.sort();
        targets.extend(nested);
    }
    targets
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{"type":"object","properties":{"query":{"type":"string"}}}"#;

    fn valid_skill(root: &Path) -> PathBuf {
        let dir = root.join("skill");
        std::fs::create_dir_all(dir.join("tests")).unwrap();
        std::fs::write(
            dir.join("skill.yaml"),
            "id: safe-skill\nversion: 1.0.0\ndescription: Safe\ninputs:\n  schema: schema.input.json\noutputs:\n  schema: schema.output.json\n",
        )
        .unwrap();
        std::fs::write(dir.join("schema.input.json"), SCHEMA).unwrap();
        std::fs::write(dir.join("schema.output.json"), SCHEMA).unwrap();
        std::fs::write(dir.join("prompt.md"), "Answer the query.\n").unwrap();
        std::fs::write(dir.join("tests/fixture_1.json"), r#"{"query":"hi"}"#).unwrap();
        std::fs::write(dir.join("tests/expected_1.json"), r#"{"status":"ok"}"#).unwrap();
        dir
    }

    fn kinds(report: &LintReport) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn clean_skill_is_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert!(report.valid, "{:?}", report.issues);
    }

    #[test]
    fn reports_missing_prompt_and_tests() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::remove_file(dir.join("prompt.md")).unwrap();
        std::fs::remove_dir_all(dir.join("tests")).unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert!(!report.valid);
        assert_eq!(kinds(&report), vec![IssueKind::Prompt, IssueKind::Tests]);
    }

    #[test]
    fn reports_orphans() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::write(dir.join("tests/fixture_2.json"), "{}").unwrap();
        std::fs::write(dir.join("tests/expected_3.json"), "{}").unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert_eq!(kinds(&report), vec![IssueKind::Fixture, IssueKind::Fixture]);
        assert!(report.issues[0].message.contains("fixture_2.json"));
        assert!(report.issues[1].message.contains("expected_3.json"));
    }

    #[test]
    fn reports_spec_schema_type() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::write(
            dir.join("schema.input.json"),
            r#"{"type":"array","items":{"type":"string"}}"#,
        )
        .unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert_eq!(kinds(&report), vec![IssueKind::Spec]);
        assert!(report.issues[0].message.contains("schema type"));
    }

    #[test]
    fn one_credential_issue_per_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::write(
            dir.join("prompt.md"),
            "Use api_key=abc123 and password: hunter2 with Bearer xyz\n",
        )
        .unwrap();
        std::fs::create_dir_all(dir.join("tests/data")).unwrap();
        std::fs::write(
            dir.join("tests/data/token.txt"),
            format!("ghp_{}", "a".repeat(40)),
        )
        .unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert_eq!(kinds(&report), vec![IssueKind::Credential, IssueKind::Credential]);
    }

    #[test]
    fn flags_credentials_in_json_fixtures() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::write(
            dir.join("tests/fixture_1.json"),
            r#"{"api_key": "live-abc123xyz", "password": "hunter2"}"#,
        )
        .unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert!(!report.valid);
        assert_eq!(kinds(&report), vec![IssueKind::Credential]);
        assert!(report.issues[0].message.contains("fixture_1.json"));
    }

    #[test]
    fn schema_with_password_property_is_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::write(
            dir.join("schema.input.json"),
            r#"{"type":"object","properties":{"password":{"type":"string"}}}"#,
        )
        .unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert!(report.valid, "{:?}", report.issues);
    }

    #[test]
    fn non_scanned_root_files_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = valid_skill(tmp.path());
        std::fs::write(dir.join("notes.txt"), "api_key=abc123").unwrap();
        let report = lint_dir(&dir, &CancellationToken::new()).unwrap();
        assert!(report.valid);
    }
}
