use std::fmt;

use serde::Serialize;

// ── Failure classes ─────────────────────────────────────────────────────────

/// Coarse classification shared by every crate error so the host can decide
/// how to surface a failure without matching on crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Bad identifiers, versions, schemas, fixtures, or embedded credentials.
    Validation,
    /// A selector or backup did not match anything.
    NotFound,
    /// Something other than a symlink sits at a managed link path.
    Conflict,
    /// Keychain or connector write failed; retried before surfacing.
    TransientConnector,
    /// A runtime policy hook refused the input.
    PolicyBlocked,
    /// Audit signature mismatch.
    IntegrityFailure,
    /// The caller's cancellation token fired.
    Cancelled,
    /// I/O or serialization failure with no more specific class.
    Internal,
}

impl FailureClass {
    /// Only connector failures are worth retrying.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientConnector)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::TransientConnector => "transient_connector",
            Self::PolicyBlocked => "policy_blocked",
            Self::IntegrityFailure => "integrity_failure",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ── Shared context trait ────────────────────────────────────────────────────

/// Trait for error types that can be constructed from a plain message string.
///
/// Implement this for your crate's error type, then invoke [`impl_context!`]
/// in your error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// aios_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
