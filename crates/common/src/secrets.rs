//! Embedded-credential patterns.
//!
//! Shared by the skill linter (which refuses to ship a skill containing a
//! credential) and the runtime policy hooks (which redact matching values
//! before they reach a model).

use std::sync::LazyLock;

use regex::Regex;

/// Replacement value for any redacted string.
pub const REDACTED_SECRET: &str = "[REDACTED_SECRET]";

const PATTERN_SOURCES: &[(&str, &str)] = &[
    (
        "credential assignment",
        r#"(?i)\b(?:api[_-]?key|secret[_-]?key|client[_-]?secret|access[_-]?token|private[_-]?key|password)['"]?\s*[:=]\s*['"]?[^\s'"{\[]+"#,
    ),
    ("bearer token", r"(?i)\bbearer\s+[a-z0-9\-._~+/]+=*"),
    ("openai key", r"(?i)\bsk-[a-z0-9]{20,}"),
    ("github token", r"(?i)\bghp_[a-z0-9]{36,}"),
    ("google api key", r"(?i)\baiza[a-z0-9\-_]{30,}"),
];

/// A named, compiled credential pattern.
#[derive(Debug)]
pub struct CredentialPattern {
    pub name: &'static str,
    pub regex: Regex,
}

static PATTERNS: LazyLock<Vec<CredentialPattern>> = LazyLock::new(|| {
    PATTERN_SOURCES
        .iter()
        .filter_map(|&(name, src)| {
            Regex::new(src)
                .ok()
                .map(|regex| CredentialPattern { name, regex })
        })
        .collect()
});

/// All compiled credential patterns, in declaration order.
pub fn patterns() -> &'static [CredentialPattern] {
    &PATTERNS
}

/// Name of the first pattern matching `text`, if any.
pub fn find_credential(text: &str) -> Option<&'static str> {
    patterns()
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| p.name)
}

pub fn contains_credential(text: &str) -> bool {
    find_credential(text).is_some()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        assert_eq!(patterns().len(), PATTERN_SOURCES.len());
    }

    #[test]
    fn detects_assignments() {
        assert_eq!(find_credential("api_key=foo"), Some("credential assignment"));
        assert!(contains_credential("API-KEY: abc123"));
        assert!(contains_credential("client_secret = \"xyz\""));
        assert!(contains_credential("password: hunter2"));
        assert!(contains_credential("private_key=abc"));
    }

    #[test]
    fn detects_json_keys() {
        assert_eq!(
            find_credential(r#"{"api_key": "live-abc123xyz"}"#),
            Some("credential assignment")
        );
        assert!(contains_credential(r#"{"password":"hunter2"}"#));
        assert!(contains_credential("access_token: 'tok-1'"));
        assert!(!contains_credential(r#"{"password": ""}"#));
    }

    #[test]
    fn detects_vendor_tokens() {
        assert_eq!(
            find_credential("Authorization: Bearer abc.def-ghi"),
            Some("bearer token")
        );
        assert_eq!(
            find_credential("key sk-abcdefghijklmnopqrstuvwx"),
            Some("openai key")
        );
        let gh = format!("ghp_{}", "a".repeat(36));
        assert_eq!(find_credential(&gh), Some("github token"));
        let google = format!("AIza{}", "B".repeat(33));
        assert_eq!(find_credential(&google), Some("google api key"));
    }

    #[test]
    fn ignores_benign_text() {
        assert!(!contains_credential("Summarize the diff for the reviewer."));
        assert!(!contains_credential(r#"{"api_key": {"type": "string"}}"#));
        assert!(!contains_credential("sk-short"));
        assert!(!contains_credential("the password field is optional"));
    }
}
