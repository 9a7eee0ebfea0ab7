use chrono::{SecondsFormat, Utc};

/// Current UTC time as RFC 3339 with a trailing `Z`.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compact UTC timestamp used for backup directory names (`20260101T120000Z`).
#[must_use]
pub fn compact_timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}
