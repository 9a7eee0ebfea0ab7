use std::path::{Path, PathBuf};

use aios_common::{Cancelled, FailureClass, FromMessage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),
    #[error("invalid skill spec {path}: {message}")]
    InvalidSpec { path: PathBuf, message: String },
    #[error("invalid schema {path}: {message}")]
    InvalidSchema { path: PathBuf, message: String },
    #[error("invalid skill: {0}")]
    Invalid(String),
    #[error("no fixture files found in {0}")]
    NoFixtures(PathBuf),
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("executor failed: {0}")]
    Executor(String),
    #[error(transparent)]
    Agents(#[from] aios_agents::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    #[must_use]
    pub fn invalid_spec(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_schema(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Adapter for `map_err` on filesystem calls.
    pub fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidSpec { .. }
            | Self::InvalidSchema { .. }
            | Self::Invalid(_)
            | Self::NoFixtures(_)
            | Self::Json { .. } => FailureClass::Validation,
            Self::Agents(e) => e.class(),
            Self::Cancelled(_) => FailureClass::Cancelled,
            Self::Message(_) | Self::Io { .. } | Self::Executor(_) => FailureClass::Internal,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

aios_common::impl_context!();

pub type Result<T> = std::result::Result<T, Error>;
