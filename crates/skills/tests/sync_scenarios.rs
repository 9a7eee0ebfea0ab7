#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};

use {
    aios_skills::{FsSkillInstaller, SkillInstaller, lint, sync},
    tokio_util::sync::CancellationToken,
};

const OBJECT_SCHEMA: &str = r#"{"type":"object","properties":{"query":{"type":"string"}}}"#;
const ARRAY_SCHEMA: &str = r#"{"type":"array","items":{"type":"string"}}"#;

fn write_skill(root: &Path, input_schema: &str) -> PathBuf {
    let dir = root.join("skill");
    std::fs::create_dir_all(dir.join("tests")).unwrap();
    std::fs::write(
        dir.join("skill.yaml"),
        "id: safe-skill\nversion: 1.0.0\ndescription: Safe skill\ninputs:\n  schema: schema.input.json\noutputs:\n  schema: schema.output.json\n",
    )
    .unwrap();
    std::fs::write(dir.join("schema.input.json"), input_schema).unwrap();
    std::fs::write(dir.join("schema.output.json"), OBJECT_SCHEMA).unwrap();
    std::fs::write(dir.join("prompt.md"), "Answer safely.\n").unwrap();
    std::fs::write(dir.join("tests/fixture_1.json"), r#"{"query":"hello"}"#).unwrap();
    std::fs::write(dir.join("tests/expected_1.json"), r#"{"status":"ok"}"#).unwrap();
    dir
}

#[test]
fn sync_plan_does_not_touch_the_project() {
    let tmp = tempfile::tempdir().unwrap();
    let skill_dir = write_skill(tmp.path(), OBJECT_SCHEMA);
    let installer = FsSkillInstaller::from_registry().unwrap();
    let non_universal = installer.agents().iter().filter(|a| !a.universal).count();

    let plan = sync::build_sync_plan(&installer, &skill_dir, tmp.path()).unwrap();

    assert_eq!(plan.skill_id, "safe-skill");
    assert_eq!(plan.writes.len(), non_universal + 1);
    assert_eq!(
        plan.writes,
        installer.plan_write_targets("safe-skill", tmp.path())
    );
    assert!(!tmp.path().join(".agents/skills").exists());
}

#[tokio::test]
async fn array_input_schema_is_rejected_everywhere() {
    let tmp = tempfile::tempdir().unwrap();
    let skill_dir = write_skill(tmp.path(), ARRAY_SCHEMA);
    let project = tmp.path().join("project");
    let installer = FsSkillInstaller::from_registry().unwrap();
    let cancel = CancellationToken::new();

    let err = sync::sync_skill(&installer, &skill_dir, &project, None, &cancel)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("schema type"), "{err}");

    let err = sync::build_sync_plan(&installer, &skill_dir, &project).unwrap_err();
    assert!(err.to_string().contains("schema type"), "{err}");

    let report = lint::lint_dir(&skill_dir, &cancel).unwrap();
    assert!(!report.valid);
    assert!(
        report
            .issues
            .iter()
            .any(|i| i.message.contains("schema type"))
    );
    assert!(!project.exists());
}

#[tokio::test]
async fn sync_then_uninstall_leaves_no_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let skill_dir = write_skill(tmp.path(), OBJECT_SCHEMA);
    let project = tmp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let installer = FsSkillInstaller::from_registry().unwrap();
    let cancel = CancellationToken::new();

    let first = sync::sync_skill(&installer, &skill_dir, &project, None, &cancel)
        .await
        .unwrap();
    let second = sync::sync_skill(&installer, &skill_dir, &project, None, &cancel)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(second.agents.len(), installer.agents().len());
    assert_eq!(
        installer
            .collect_installed_skills(&project, &cancel)
            .await
            .unwrap(),
        vec!["safe-skill"]
    );

    for agent in installer.agents().iter().filter(|a| !a.universal) {
        let entry = agent.project_skills_dir(&project).join("safe-skill");
        assert!(entry.join("SKILL.md").is_file(), "{} not published", agent.name);
    }

    sync::uninstall(&installer, "safe-skill", &project, &cancel)
        .await
        .unwrap();
    for path in installer.plan_write_targets("safe-skill", &project) {
        assert!(std::fs::symlink_metadata(&path).is_err(), "{path:?} survived");
    }
}

#[tokio::test]
async fn install_sanitizes_display_names() {
    let tmp = tempfile::tempdir().unwrap();
    let installer = FsSkillInstaller::from_registry().unwrap();
    let cancel = CancellationToken::new();

    let result = installer
        .install("My Skill", tmp.path(), None, None, &cancel)
        .await
        .unwrap();
    assert!(
        tmp.path()
            .join(".agents/skills/my-skill/SKILL.md")
            .is_file()
    );
    assert_eq!(result.skill_id, "my-skill");

    installer
        .uninstall("My Skill", tmp.path(), &cancel)
        .await
        .unwrap();
    assert!(!tmp.path().join(".agents/skills/my-skill").exists());
}
