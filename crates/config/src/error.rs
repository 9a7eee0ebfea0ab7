use std::path::PathBuf;

use aios_common::FailureClass;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("cannot determine home directory")]
    NoHome,
}

impl Error {
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Read { .. } => FailureClass::Internal,
            Self::Parse { .. } | Self::InvalidValue { .. } | Self::NoHome => {
                FailureClass::Validation
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
