use std::time::Duration;

use aios_common::{Cancelled, FailureClass};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid state")]
    InvalidState,
    #[error("authorization failed: {0}")]
    Provider(String),
    #[error("missing code")]
    MissingCode,
    #[error("OAuth callback timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("callback server exited unexpectedly")]
    ServerExited,
    #[error("failed to bind callback listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InvalidState | Self::Provider(_) | Self::MissingCode => FailureClass::Validation,
            Self::Timeout(_) => FailureClass::TransientConnector,
            Self::Cancelled(_) => FailureClass::Cancelled,
            Self::ServerExited | Self::Bind(_) => FailureClass::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
