//! Skill spec parsing, validation, and `SKILL.md` composition.

use std::path::{Component, Path, PathBuf};

use {serde::Deserialize, tracing::debug};

use crate::{
    error::{Error, Result},
    fixtures, lint, prompt,
    types::{SkillArtifact, SkillSpec},
};

/// Spec file names, checked in order.
pub const SPEC_FILENAMES: &[&str] = &["skill.yaml", "skill.yml"];

/// Fallback id when sanitization leaves nothing.
pub const UNNAMED_SKILL: &str = "unnamed-skill";

const MAX_ID_BYTES: usize = 255;

#[derive(Deserialize)]
struct RawSpec {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<serde_yaml::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    inputs: Option<SchemaRef>,
    #[serde(default)]
    outputs: Option<SchemaRef>,
}

#[derive(Deserialize)]
struct SchemaRef {
    #[serde(default)]
    schema: Option<String>,
}

/// Locate the spec file inside a skill directory.
pub fn resolve_spec_path(skill_dir: &Path) -> Result<PathBuf> {
    SPEC_FILENAMES
        .iter()
        .map(|name| skill_dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            Error::invalid_spec(skill_dir, "missing skill.yaml")
        })
}

/// Parse a spec file. Checks presence of required fields only; call
/// [`validate_spec`] for semver and schema checks.
pub fn load_spec(path: &Path) -> Result<SkillSpec> {
    let raw = std::fs::read_to_string(path).map_err(Error::io("read", path))?;
    let parsed: RawSpec = serde_yaml::from_str(&raw)
        .map_err(|e| Error::invalid_spec(path, format!("invalid YAML: {e}")))?;

    let id = parsed
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| Error::invalid_spec(path, "id is required"))?;
    let version = match parsed.version {
        Some(serde_yaml::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        _ => return Err(Error::invalid_spec(path, "version is required")),
    };
    let input_schema_rel = parsed
        .inputs
        .and_then(|r| r.schema)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::invalid_spec(path, "inputs.schema is required"))?;
    let output_schema_rel = parsed
        .outputs
        .and_then(|r| r.schema)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::invalid_spec(path, "outputs.schema is required"))?;

    Ok(SkillSpec {
        id: sanitize(&id),
        name: parsed.name.filter(|n| !n.trim().is_empty()),
        version: version.trim().to_string(),
        description: parsed.description.unwrap_or_default().trim().to_string(),
        input_schema_rel,
        output_schema_rel,
    })
}

/// Validate a parsed spec against its directory: semver and both schemas.
pub fn validate_spec(base_dir: &Path, spec: &SkillSpec) -> Result<()> {
    if !is_valid_semver(&spec.version) {
        return Err(Error::invalid_spec(
            base_dir,
            format!("version '{}' is not valid semver", spec.version),
        ));
    }
    for rel in [&spec.input_schema_rel, &spec.output_schema_rel] {
        let path = schema_path(base_dir, rel)?;
        validate_json_schema(&path)?;
    }
    debug!(skill_id = %spec.id, version = %spec.version, "skill spec valid");
    Ok(())
}

fn schema_path(base_dir: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    let escapes = rel_path.is_absolute()
        || rel_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(Error::invalid_schema(
            rel_path,
            "schema reference must stay inside the skill directory",
        ));
    }
    let path = base_dir.join(rel_path);
    if !path.is_file() {
        return Err(Error::invalid_schema(&path, "schema file does not exist"));
    }
    Ok(path)
}

/// Check that a file is a JSON Schema for an object: valid JSON,
/// `"type": "object"`, and a `properties` key.
pub fn validate_json_schema(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path).map_err(Error::io("read", path))?;
    let schema: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let Some(obj) = schema.as_object() else {
        return Err(Error::invalid_schema(path, "schema must be a JSON object"));
    };
    match obj.get("type") {
        Some(serde_json::Value::String(t)) if t == "object" => {},
        Some(other) => {
            return Err(Error::invalid_schema(
                path,
                format!("schema type must be \"object\", found {other}"),
            ));
        },
        None => {
            return Err(Error::invalid_schema(
                path,
                "schema type must be \"object\", found none",
            ));
        },
    }
    if !obj.contains_key("properties") {
        return Err(Error::invalid_schema(path, "schema must declare properties"));
    }
    Ok(schema)
}

/// Compose `SKILL.md`: frontmatter (`name`, `description`) then the body.
pub fn build_skill_md(spec: &SkillSpec, prompt_body: &str) -> String {
    let mut out = format!(
        "---\nname: {}\ndescription: {}\n---\n",
        yaml_scalar(spec.display_name()),
        yaml_scalar(&spec.description)
    );
    // Leading indentation is content (an indented code block, say).
    let body = prompt_body.trim_end().trim_start_matches(['\r', '\n']);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    out
}

/// Plain YAML scalar when safe, double-quoted otherwise.
fn yaml_scalar(value: &str) -> String {
    let plain = !value.is_empty()
        && value.trim() == value
        && !value.starts_with(|c: char| "-?:,[]{}#&*!|>'\"%@`".contains(c))
        && !value.contains(": ")
        && !value.contains(" #")
        && !value.contains('\n')
        && !matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "false" | "null" | "yes" | "no" | "~"
        )
        && value.parse::<f64>().is_err();
    if plain {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Normalize a skill name into an id: lowercase, `[a-z0-9-]` only, no
/// leading/trailing `-` or `.`, at most 255 bytes, never empty.
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let mut id = replaced
        .trim_matches(|c| c == '-' || c == '.')
        .to_string();
    id.truncate(MAX_ID_BYTES);
    if id.is_empty() {
        return UNNAMED_SKILL.to_string();
    }
    id
}

/// Strict semver 2.0.0: `MAJOR.MINOR.PATCH[-prerelease][+build]`, no leading
/// zeros in numeric core or prerelease identifiers.
pub fn is_valid_semver(version: &str) -> bool {
    let (rest, build) = match version.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (version, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 || !parts.iter().all(|p| is_numeric_identifier(p)) {
        return false;
    }
    if let Some(pre) = pre
        && !pre.split('.').all(|id| {
            is_identifier(id)
                && (!id.bytes().all(|b| b.is_ascii_digit()) || is_numeric_identifier(id))
        })
    {
        return false;
    }
    if let Some(build) = build
        && !build.split('.').all(is_identifier)
    {
        return false;
    }
    true
}

fn is_numeric_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Load a full artifact. Fails with every lint issue when the directory
/// does not pass [`lint::lint_dir`].
pub fn load_artifact(skill_dir: &Path) -> Result<SkillArtifact> {
    let report = lint::lint_dir(skill_dir, &tokio_util::sync::CancellationToken::new())?;
    if !report.valid {
        let summary = report
            .issues
            .iter()
            .map(|i| i.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::Invalid(summary));
    }

    let spec_path = resolve_spec_path(skill_dir)?;
    let spec = load_spec(&spec_path)?;
    let input_schema = validate_json_schema(&skill_dir.join(&spec.input_schema_rel))?;
    let output_schema = validate_json_schema(&skill_dir.join(&spec.output_schema_rel))?;
    let prompt_path = skill_dir.join(prompt::PROMPT_FILENAME);
    let prompt_raw =
        std::fs::read_to_string(&prompt_path).map_err(Error::io("read", &prompt_path))?;
    let scan = fixtures::scan_fixtures(&skill_dir.join(fixtures::TESTS_DIR))?;

    Ok(SkillArtifact {
        root: skill_dir.to_path_buf(),
        spec,
        prompt: prompt::parse_prompt(&prompt_raw),
        input_schema,
        output_schema,
        fixtures: scan.pairs,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{"type":"object","properties":{"query":{"type":"string"}}}"#;

    fn write_skill(dir: &Path, yaml: &str) {
        std::fs::write(dir.join("skill.yaml"), yaml).unwrap();
        std::fs::write(dir.join("schema.input.json"), SCHEMA).unwrap();
        std::fs::write(dir.join("schema.output.json"), SCHEMA).unwrap();
    }

    const VALID_YAML: &str = "id: Safe Skill\nname: Safe Skill\nversion: 1.2.3\ndescription: Does safe things\ninputs:\n  schema: schema.input.json\noutputs:\n  schema: schema.output.json\n";

    #[test]
    fn sanitize_rules() {
        assert_eq!(sanitize("My Skill"), "my-skill");
        assert_eq!(sanitize("--Hello.World--"), "hello-world");
        assert_eq!(sanitize("..."), "unnamed-skill");
        assert_eq!(sanitize(""), "unnamed-skill");
        assert_eq!(sanitize("a_b/c"), "a-b-c");
        assert_eq!(sanitize(&"x".repeat(300)).len(), 255);
    }

    #[test]
    fn semver_accepts_strict_versions() {
        for v in [
            "0.0.0",
            "1.2.3",
            "10.20.30",
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-0.3.7",
            "1.0.0+build.5",
            "1.0.0-rc.1+exp.sha.5114f85",
            "1.0.0-x-y-z.--",
        ] {
            assert!(is_valid_semver(v), "{v} should be valid");
        }
    }

    #[test]
    fn semver_rejects_loose_versions() {
        for v in [
            "1",
            "1.2",
            "1.2.3.4",
            "01.2.3",
            "1.02.3",
            "1.2.03",
            "1.2.3-",
            "1.2.3+",
            "1.2.3-01",
            "1.2.3-alpha..1",
            "v1.2.3",
            "1.2.3-alpha_1",
            "",
        ] {
            assert!(!is_valid_semver(v), "{v} should be invalid");
        }
    }

    #[test]
    fn load_and_validate_spec() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), VALID_YAML);
        let spec = load_spec(&resolve_spec_path(tmp.path()).unwrap()).unwrap();
        assert_eq!(spec.id, "safe-skill");
        assert_eq!(spec.version, "1.2.3");
        assert_eq!(spec.input_schema_rel, "schema.input.json");
        validate_spec(tmp.path(), &spec).unwrap();
    }

    #[test]
    fn missing_required_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skill.yaml");
        for (yaml, field) in [
            ("version: 1.0.0\ninputs: {schema: a}\noutputs: {schema: b}\n", "id"),
            ("id: x\ninputs: {schema: a}\noutputs: {schema: b}\n", "version"),
            ("id: x\nversion: 1.0.0\noutputs: {schema: b}\n", "inputs.schema"),
            ("id: x\nversion: 1.0.0\ninputs: {schema: a}\n", "outputs.schema"),
        ] {
            std::fs::write(&path, yaml).unwrap();
            let err = load_spec(&path).unwrap_err().to_string();
            assert!(err.contains(field), "{err} should mention {field}");
        }
    }

    #[test]
    fn non_semver_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), &VALID_YAML.replace("1.2.3", "1.2"));
        let spec = load_spec(&tmp.path().join("skill.yaml")).unwrap();
        let err = validate_spec(tmp.path(), &spec).unwrap_err();
        assert!(err.to_string().contains("semver"));
    }

    #[test]
    fn array_schema_rejected_with_type_message() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), VALID_YAML);
        std::fs::write(
            tmp.path().join("schema.input.json"),
            r#"{"type":"array","items":{"type":"string"}}"#,
        )
        .unwrap();
        let spec = load_spec(&tmp.path().join("skill.yaml")).unwrap();
        let err = validate_spec(tmp.path(), &spec).unwrap_err();
        assert!(err.to_string().contains("schema type"), "{err}");
    }

    #[test]
    fn schema_without_properties_or_bad_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.json");
        std::fs::write(&path, r#"{"type":"object"}"#).unwrap();
        assert!(validate_json_schema(&path).unwrap_err().to_string().contains("properties"));
        std::fs::write(&path, "{nope").unwrap();
        assert!(matches!(validate_json_schema(&path), Err(Error::Json { .. })));
    }

    #[test]
    fn schema_reference_cannot_escape() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), &VALID_YAML.replace("schema.input.json", "../schema.input.json"));
        let spec = load_spec(&tmp.path().join("skill.yaml")).unwrap();
        assert!(validate_spec(tmp.path(), &spec).is_err());
    }

    #[test]
    fn missing_schema_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), VALID_YAML);
        std::fs::remove_file(tmp.path().join("schema.output.json")).unwrap();
        let spec = load_spec(&tmp.path().join("skill.yaml")).unwrap();
        let err = validate_spec(tmp.path(), &spec).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    fn spec(name: Option<&str>, description: &str) -> SkillSpec {
        SkillSpec {
            id: "demo".into(),
            name: name.map(Into::into),
            version: "1.0.0".into(),
            description: description.into(),
            input_schema_rel: "in.json".into(),
            output_schema_rel: "out.json".into(),
        }
    }

    #[test]
    fn skill_md_prefers_display_name() {
        let md = build_skill_md(&spec(Some("Demo Skill"), "Shows things"), "# Body\n\nText");
        assert_eq!(
            md,
            "---\nname: Demo Skill\ndescription: Shows things\n---\n\n# Body\n\nText\n"
        );
    }

    #[test]
    fn skill_md_empty_body_has_no_trailing_blank_line() {
        let md = build_skill_md(&spec(None, "Shows things"), "   \n");
        assert_eq!(md, "---\nname: demo\ndescription: Shows things\n---\n");
    }

    #[test]
    fn skill_md_keeps_leading_indentation() {
        let md = build_skill_md(&spec(None, "Shows things"), "\n    let x = 1;\nDone\n\n\n");
        assert!(md.ends_with("---\n\n    let x = 1;\nDone\n"), "{md}");
    }

    #[test]
    fn skill_md_quotes_unsafe_scalars() {
        let md = build_skill_md(&spec(None, "Use it: carefully"), "");
        assert!(md.contains("description: \"Use it: carefully\"\n"));
        let md = build_skill_md(&spec(None, ""), "");
        assert!(md.contains("description: \"\"\n"));
    }
}
