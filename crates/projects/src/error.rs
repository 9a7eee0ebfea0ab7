use std::path::{Path, PathBuf};

use aios_common::{Cancelled, FailureClass, FromMessage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),
    #[error("project path must not be empty")]
    EmptyPath,
    #[error("project not found: {selector}")]
    NotFound { selector: String },
    #[error("non-symlink conflict at {path}")]
    Conflict { path: PathBuf },
    #[error("invalid inventory {path}: {source}")]
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
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    #[must_use]
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::NotFound {
            selector: selector.into(),
        }
    }

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
            Self::EmptyPath | Self::Json { .. } => FailureClass::Validation,
            Self::NotFound { .. } => FailureClass::NotFound,
            Self::Conflict { .. } => FailureClass::Conflict,
            Self::Cancelled(_) => FailureClass::Cancelled,
            Self::Message(_) | Self::Io { .. } => FailureClass::Internal,
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
