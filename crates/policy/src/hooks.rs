use {
    aios_common::secrets::{self, REDACTED_SECRET},
    serde::Serialize,
    serde_json::{Map, Value},
    tracing::warn,
};

/// Violation recorded when an input tries to override the system prompt.
pub const INJECTION_VIOLATION: &str = "injection";

/// Matched after lowercasing and collapsing whitespace.
const INJECTION_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "ignore prior instructions",
    "disregard previous instructions",
    "forget previous instructions",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Telemetry {
    pub redactions: usize,
    pub violations: Vec<String>,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookOutcome {
    pub sanitized: Map<String, Value>,
    pub telemetry: Telemetry,
}

/// Scan every string value of `input`, recursing into objects and arrays.
/// Credential-bearing strings are replaced whole; an injection phrase marks
/// the input as blocked.
#[must_use]
pub fn apply_runtime_hooks(input: &Map<String, Value>) -> HookOutcome {
    let mut telemetry = Telemetry::default();
    let sanitized = input
        .iter()
        .map(|(k, v)| (k.clone(), sanitize_value(v, &mut telemetry)))
        .collect();
    if telemetry.blocked {
        warn!(violations = ?telemetry.violations, "runtime policy blocked input");
    }
    HookOutcome {
        sanitized,
        telemetry,
    }
}

fn sanitize_value(value: &Value, telemetry: &mut Telemetry) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_string(s, telemetry)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| sanitize_value(v, telemetry))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_value(v, telemetry)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sanitize_string(s: &str, telemetry: &mut Telemetry) -> String {
    if is_injection(s) {
        telemetry.blocked = true;
        if !telemetry.violations.iter().any(|v| v == INJECTION_VIOLATION) {
            telemetry.violations.push(INJECTION_VIOLATION.to_string());
        }
    }
    if secrets::contains_credential(s) {
        telemetry.redactions += 1;
        return REDACTED_SECRET.to_string();
    }
    s.to_string()
}

fn is_injection(s: &str) -> bool {
    let normalized = s
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    INJECTION_PHRASES
        .iter()
        .any(|phrase| normalized.contains(phrase))
}
