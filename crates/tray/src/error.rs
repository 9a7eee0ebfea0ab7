use std::path::{Path, PathBuf};

use aios_common::{Cancelled, FailureClass};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed {path}: {source}")]
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
    #[error("audit signature mismatch: stored {stored}, computed {computed}")]
    Integrity { stored: String, computed: String },
    #[error("backup not found: {0}")]
    BackupNotFound(String),
    #[error("invalid backup name: {0}")]
    InvalidBackupName(String),
    #[error("{0}")]
    Task(String),
    #[error(transparent)]
    Skills(#[from] aios_skills::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    pub fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    pub fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Json { path, source }
    }

    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Json { .. } | Self::InvalidBackupName(_) => FailureClass::Validation,
            Self::Integrity { .. } => FailureClass::IntegrityFailure,
            Self::BackupNotFound(_) => FailureClass::NotFound,
            Self::Skills(e) => e.class(),
            Self::Cancelled(_) => FailureClass::Cancelled,
            Self::Io { .. } | Self::Task(_) => FailureClass::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
